use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use mindful_social::commands::run::build_tracker;
use mindful_social::config::Config;
use mindful_social::host::{BrowserHost, FakeHost, HostEvent};
use mindful_social::storage::{SessionStore, TabId};
use mindful_social::tracker::{ManualClock, SessionTracker};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config file pointing the store into `dir` and generation at `endpoint`
#[allow(dead_code)]
pub fn config_yaml(dir: &TempDir, endpoint: &str) -> String {
    format!(
        r#"
generation:
  type: proxy
  endpoint: {endpoint}
  timeout_seconds: 2
links:
  resolver: search
storage:
  path: {store}
logging:
  level: warn
"#,
        endpoint = endpoint,
        store = dir.path().join("store").display()
    )
}

#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap()
}

/// Proxy endpoint answering every chat completion with `content`
#[allow(dead_code)]
pub async fn generation_server(content: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/huggingface-proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })))
        .mount(&server)
        .await;
    server
}

#[allow(dead_code)]
pub fn proxy_endpoint(server: &MockServer) -> String {
    format!("{}/api/huggingface-proxy", server.uri())
}

/// A tracker wired to a fake browser, a manual clock, and a sled store
#[allow(dead_code)]
pub struct Harness {
    pub tracker: SessionTracker,
    pub host: Arc<FakeHost>,
    pub store: Arc<SessionStore>,
    pub clock: Arc<ManualClock>,
    pub config: Config,
    pub dir: TempDir,
}

#[allow(dead_code)]
impl Harness {
    /// Build a tracker with consent granted
    pub fn new(endpoint: &str) -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        let store = Arc::new(SessionStore::open(dir.path().join("store")).expect("open store"));
        store.set_consent(true).expect("grant consent");
        Self::with_store(dir, store, endpoint)
    }

    pub fn with_store(dir: TempDir, store: Arc<SessionStore>, endpoint: &str) -> Self {
        let mut config = Config::default();
        config.generation.endpoint = endpoint.to_string();
        config.generation.timeout_seconds = 2;
        config.links.resolver = "search".to_string();
        config.tracker.injection_settle_millis = 1;
        config.storage.path = Some(dir.path().join("store"));

        let host = Arc::new(FakeHost::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let tracker = build_tracker(
            &config,
            Arc::clone(&store),
            Arc::clone(&host) as Arc<dyn BrowserHost>,
            clock.clone(),
        )
        .expect("build tracker");

        Self {
            tracker,
            host,
            store,
            clock,
            config,
            dir,
        }
    }

    /// Tear the tracker down and build a new one over the same store,
    /// keeping the fake browser's tabs and the clock
    pub fn restart(self) -> Self {
        let tracker = build_tracker(
            &self.config,
            Arc::clone(&self.store),
            Arc::clone(&self.host) as Arc<dyn BrowserHost>,
            self.clock.clone(),
        )
        .expect("rebuild tracker");
        Self { tracker, ..self }
    }

    /// Open a focused tab and report its navigation
    pub async fn visit(&mut self, tab: i64, url: &str) {
        self.host.open_tab(TabId(tab), url);
        self.host.set_active(TabId(tab));
        self.tracker
            .handle_host_event(HostEvent::TabUpdated {
                tab_id: TabId(tab),
                url: Some(url.to_string()),
                status: Some("complete".to_string()),
                active: true,
            })
            .await;
    }

    /// Advance the clock by one tick period, save, and fire a due reminder
    pub async fn tick(&mut self, seconds: i64) -> bool {
        self.clock.advance(chrono::Duration::seconds(seconds));
        self.tracker.tick().await;
        self.tracker.fire_due_reminder().await
    }
}
