//! End-to-end tracker scenarios
//!
//! Each test drives a real tracker over a sled store, with the browser
//! replaced by `FakeHost`, time by `ManualClock`, and the generation proxy
//! by a wiremock server.

use mindful_social::host::HostEvent;
use mindful_social::storage::{DeliveryOutcome, LinkSource, TabId};

mod common;

use common::{generation_server, proxy_endpoint, t0, Harness};

const REELS: &str = "https://www.instagram.com/reels/abc";
const REPLY: &str = r#"Close the app and stretch. [{"label":"Read the Rust book","searchQuery":"rust book"}]"#;

fn total_minutes(h: &Harness, domain: &str) -> f64 {
    h.store
        .usage()
        .unwrap()
        .iter()
        .filter(|e| e.domain == domain)
        .map(|e| e.duration_minutes)
        .sum()
}

#[tokio::test]
async fn test_long_instagram_session_gets_one_checkin() {
    let server = generation_server(REPLY).await;
    let mut h = Harness::new(&proxy_endpoint(&server));

    h.visit(1, REELS).await;
    let session = h.tracker.snapshot().session.unwrap();
    assert_eq!(session.domain, "instagram.com");
    assert_eq!(session.app_name, "Instagram");

    let mut fired = 0;
    for _ in 0..62 {
        if h.tick(30).await {
            fired += 1;
            let record = h.tracker.wait_for_checkin().await.unwrap();
            assert_eq!(record.outcome, DeliveryOutcome::Delivered);
            assert_eq!(record.at, t0() + chrono::Duration::minutes(30));
        }
    }
    assert_eq!(fired, 1);

    let delivered = h.host.delivered();
    assert_eq!(delivered.len(), 1);
    let (tab, payload) = &delivered[0];
    assert_eq!(*tab, TabId(1));
    assert_eq!(payload.coaching, REPLY);
    assert_eq!(payload.alternatives.len(), 1);
    assert_eq!(payload.alternatives[0].label, "Read the Rust book");
    assert_eq!(
        payload.alternatives[0].url,
        "https://www.google.com/search?q=rust+book"
    );
    assert_eq!(payload.alternatives[0].source, LinkSource::AutoSearched);

    let entries = h.store.usage().unwrap();
    assert_eq!(entries.len(), 1);
    assert!((entries[0].duration_minutes - 31.0).abs() < 1e-6);
    assert_eq!(entries[0].checkins_triggered, 1);
    assert_eq!(entries[0].date, t0().date_naive());

    // The guard holds until the page reports the dismissal
    assert!(h.tracker.snapshot().checkin_in_flight);
    h.tracker
        .handle_host_event(HostEvent::CheckinDismissed)
        .await;
    assert!(!h.tracker.snapshot().checkin_in_flight);
    assert!(h.store.session().unwrap().unwrap().checkin_fired);
    assert!(h.store.last_checkin().unwrap().is_some());
}

#[tokio::test]
async fn test_revoking_consent_mid_session() {
    let server = generation_server(REPLY).await;
    let mut h = Harness::new(&proxy_endpoint(&server));

    h.visit(1, REELS).await;
    for _ in 0..4 {
        h.tick(30).await;
    }
    h.clock.advance(chrono::Duration::seconds(15));

    h.tracker
        .handle_host_event(HostEvent::SettingsChanged {
            consent_granted: Some(false),
            checkin_interval_minutes: None,
        })
        .await;

    let snap = h.tracker.snapshot();
    assert!(snap.session.is_none());
    assert!(!snap.ticker_running);
    assert!(snap.reminder_due_at.is_none());
    assert!(h.store.session().unwrap().is_none());
    assert!(!h.store.settings().unwrap().consent_granted);
    assert!((total_minutes(&h, "instagram.com") - 2.25).abs() < 1e-6);

    // No new session while consent is withheld
    h.visit(2, "https://www.reddit.com/r/rust").await;
    assert!(h.tracker.snapshot().session.is_none());
}

#[tokio::test]
async fn test_switching_sites_flushes_previous_domain() {
    let server = generation_server(REPLY).await;
    let mut h = Harness::new(&proxy_endpoint(&server));

    h.visit(1, REELS).await;
    h.clock.advance(chrono::Duration::minutes(4));
    h.visit(1, "https://x.com/home").await;

    let session = h.tracker.snapshot().session.unwrap();
    assert_eq!(session.app_name, "Twitter");
    assert!((total_minutes(&h, "instagram.com") - 4.0).abs() < 1e-6);

    h.clock.advance(chrono::Duration::minutes(2));
    h.tracker
        .handle_host_event(HostEvent::TabRemoved { tab_id: TabId(1) })
        .await;
    assert!(h.tracker.snapshot().session.is_none());
    assert!((total_minutes(&h, "x.com") - 2.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_restart_restores_live_session_with_remaining_delay() {
    let server = generation_server(REPLY).await;
    let mut h = Harness::new(&proxy_endpoint(&server));

    h.visit(1, REELS).await;
    for _ in 0..20 {
        h.tick(30).await;
    }

    let mut h = h.restart();
    assert!(h.tracker.snapshot().session.is_none());
    h.tracker.restore().await;

    let snap = h.tracker.snapshot();
    assert_eq!(snap.session.unwrap().domain, "instagram.com");
    assert!(snap.ticker_running);
    assert_eq!(
        snap.reminder_due_at,
        Some(t0() + chrono::Duration::minutes(30))
    );
}

#[tokio::test]
async fn test_restart_discards_session_whose_tab_closed() {
    let server = generation_server(REPLY).await;
    let mut h = Harness::new(&proxy_endpoint(&server));

    h.visit(1, REELS).await;
    h.tick(30).await;
    h.host.close_tab(TabId(1));

    let mut h = h.restart();
    h.tracker.restore().await;

    let snap = h.tracker.snapshot();
    assert!(snap.session.is_none());
    assert!(!snap.ticker_running);
    assert!(h.store.session().unwrap().is_none());
    // Only the saved tick counts; nothing is flushed for the stale session
    assert!((total_minutes(&h, "instagram.com") - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn test_restart_after_checkin_does_not_rearm() {
    let server = generation_server(REPLY).await;
    let mut h = Harness::new(&proxy_endpoint(&server));

    h.tracker
        .handle_host_event(HostEvent::SettingsChanged {
            consent_granted: None,
            checkin_interval_minutes: Some(1),
        })
        .await;
    h.visit(1, REELS).await;
    h.tick(30).await;
    assert!(h.tick(30).await);
    h.tracker.wait_for_checkin().await.unwrap();

    let mut h = h.restart();
    h.tracker.restore().await;
    let snap = h.tracker.snapshot();
    assert!(snap.session.unwrap().checkin_fired);
    assert!(snap.reminder_due_at.is_none());

    // An interval change no longer reschedules anything
    h.tracker
        .handle_host_event(HostEvent::SettingsChanged {
            consent_granted: None,
            checkin_interval_minutes: Some(5),
        })
        .await;
    assert!(h.tracker.snapshot().reminder_due_at.is_none());
    assert_eq!(h.store.settings().unwrap().checkin_interval_minutes, 5);
}

#[tokio::test]
async fn test_dead_page_listener_falls_back_to_notification() {
    let server = generation_server(REPLY).await;
    let mut h = Harness::new(&proxy_endpoint(&server));

    h.visit(1, REELS).await;
    h.host.set_listening(TabId(1), false);
    h.host.set_inject_revives(false);

    h.tracker
        .handle_host_event(HostEvent::CheckinRequested {
            tab_id: TabId(1),
            reason: "rapid_scrolling".to_string(),
        })
        .await;
    let record = h.tracker.wait_for_checkin().await.unwrap();

    assert_eq!(record.outcome, DeliveryOutcome::Notified);
    assert!(h.host.delivered().is_empty());
    let notifications = h.host.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].1, REPLY);
    // A notification leaves nothing on the page to dismiss
    assert!(!h.tracker.snapshot().checkin_in_flight);
}

#[tokio::test]
async fn test_unreachable_generation_uses_fallbacks() {
    let mut h = Harness::new("http://127.0.0.1:9/api/huggingface-proxy");

    h.visit(1, REELS).await;
    h.tracker
        .handle_host_event(HostEvent::CheckinRequested {
            tab_id: TabId(1),
            reason: "manual".to_string(),
        })
        .await;
    let record = h.tracker.wait_for_checkin().await.unwrap();

    assert_eq!(record.outcome, DeliveryOutcome::Delivered);
    assert_eq!(
        record.coaching,
        format!("Remember your goal: {}. You've got this! 🎯", record.goal)
    );
    let labels: Vec<_> = record.actions.iter().map(|a| a.label.as_str()).collect();
    assert_eq!(labels[0], "Take 5 deep breaths");
    assert_eq!(record.actions.len(), 3);
}
