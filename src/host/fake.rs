//! In-process fake browser host for tests
//!
//! [`FakeHost`] keeps a small table of tabs and records every page delivery
//! and notification so tests can drive the tracker and orchestrator without
//! a browser.
//!
//! ```
//! use mindful_social::host::{BrowserHost, FakeHost};
//! use mindful_social::storage::TabId;
//!
//! # tokio_test::block_on(async {
//! let host = FakeHost::new();
//! host.open_tab(TabId(1), "https://www.instagram.com/x");
//! host.set_active(TabId(1));
//!
//! let tab = host.active_tab().await.unwrap().unwrap();
//! assert_eq!(tab.id, TabId(1));
//! # });
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BrowserHost, CheckinPayload, TabInfo};
use crate::error::{MindfulError, Result};
use crate::storage::TabId;

#[derive(Debug, Default)]
struct FakeState {
    tabs: HashMap<TabId, String>,
    active: Option<TabId>,
    listening: HashSet<TabId>,
    inject_revives: bool,
    fail_show: bool,
    fail_notify: bool,
    delivered: Vec<(TabId, CheckinPayload)>,
    notifications: Vec<(String, String)>,
    calls: Vec<String>,
}

/// Scriptable in-memory [`BrowserHost`]
#[derive(Debug)]
pub struct FakeHost {
    state: Mutex<FakeState>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    /// An empty host whose injection revives page listeners
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                inject_revives: true,
                ..FakeState::default()
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Open (or navigate) a tab; the page listener starts alive
    pub fn open_tab(&self, tab_id: TabId, url: &str) {
        self.with_state(|s| {
            s.tabs.insert(tab_id, url.to_string());
            s.listening.insert(tab_id);
        });
    }

    /// Navigate an existing tab
    pub fn navigate(&self, tab_id: TabId, url: &str) {
        self.with_state(|s| {
            s.tabs.insert(tab_id, url.to_string());
        });
    }

    pub fn close_tab(&self, tab_id: TabId) {
        self.with_state(|s| {
            s.tabs.remove(&tab_id);
            s.listening.remove(&tab_id);
            if s.active == Some(tab_id) {
                s.active = None;
            }
        });
    }

    pub fn set_active(&self, tab_id: TabId) {
        self.with_state(|s| s.active = Some(tab_id));
    }

    /// Whether the page-side listener answers probes
    pub fn set_listening(&self, tab_id: TabId, listening: bool) {
        self.with_state(|s| {
            if listening {
                s.listening.insert(tab_id);
            } else {
                s.listening.remove(&tab_id);
            }
        });
    }

    /// Whether injecting the listener makes the page answer probes
    pub fn set_inject_revives(&self, revives: bool) {
        self.with_state(|s| s.inject_revives = revives);
    }

    pub fn fail_show_checkin(&self, fail: bool) {
        self.with_state(|s| s.fail_show = fail);
    }

    pub fn fail_notify(&self, fail: bool) {
        self.with_state(|s| s.fail_notify = fail);
    }

    /// Check-ins shown in pages so far
    pub fn delivered(&self) -> Vec<(TabId, CheckinPayload)> {
        self.with_state(|s| s.delivered.clone())
    }

    /// Notifications shown so far as (title, message)
    pub fn notifications(&self) -> Vec<(String, String)> {
        self.with_state(|s| s.notifications.clone())
    }

    /// Method names called, in order
    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }

    fn record(&self, call: &str) {
        self.with_state(|s| s.calls.push(call.to_string()));
    }
}

#[async_trait]
impl BrowserHost for FakeHost {
    async fn tab(&self, tab_id: TabId) -> Result<Option<TabInfo>> {
        self.record("get_tab");
        Ok(self.with_state(|s| {
            s.tabs.get(&tab_id).map(|url| TabInfo {
                id: tab_id,
                url: Some(url.clone()),
                active: s.active == Some(tab_id),
            })
        }))
    }

    async fn active_tab(&self) -> Result<Option<TabInfo>> {
        self.record("active_tab");
        Ok(self.with_state(|s| {
            s.active.and_then(|id| {
                s.tabs.get(&id).map(|url| TabInfo {
                    id,
                    url: Some(url.clone()),
                    active: true,
                })
            })
        }))
    }

    async fn probe(&self, tab_id: TabId) -> Result<bool> {
        self.record("ping");
        Ok(self.with_state(|s| s.tabs.contains_key(&tab_id) && s.listening.contains(&tab_id)))
    }

    async fn inject_listener(&self, tab_id: TabId) -> Result<()> {
        self.record("inject");
        self.with_state(|s| {
            if !s.tabs.contains_key(&tab_id) {
                return Err(MindfulError::Host(format!("No tab with id {}", tab_id)).into());
            }
            if s.inject_revives {
                s.listening.insert(tab_id);
            }
            Ok(())
        })
    }

    async fn show_checkin(&self, tab_id: TabId, payload: &CheckinPayload) -> Result<()> {
        self.record("show_checkin");
        self.with_state(|s| {
            if s.fail_show || !s.listening.contains(&tab_id) {
                return Err(
                    MindfulError::Host("Receiving end does not exist".to_string()).into(),
                );
            }
            s.delivered.push((tab_id, payload.clone()));
            Ok(())
        })
    }

    async fn notify(&self, title: &str, message: &str) -> Result<()> {
        self.record("notify");
        self.with_state(|s| {
            if s.fail_notify {
                return Err(MindfulError::Host("Notifications unavailable".to_string()).into());
            }
            s.notifications
                .push((title.to_string(), message.to_string()));
            Ok(())
        })
    }
}
