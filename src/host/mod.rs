//! Browser host abstraction
//!
//! The tracker never talks to the browser directly. Tab lifecycle events
//! arrive as [`HostEvent`]s and queries or page deliveries go through the
//! [`BrowserHost`] trait. The shipping implementation speaks the browser's
//! native messaging protocol ([`native::NativeHost`]); tests use
//! [`fake::FakeHost`].

use crate::error::Result;
use crate::storage::{SuggestedAction, TabId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod fake;
pub mod native;

pub use fake::FakeHost;
pub use native::{connect_stdio, NativeChannel, NativeHost};

/// Snapshot of a browser tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default)]
    pub url: Option<String>,
    /// Focused tab of the focused window
    #[serde(default)]
    pub active: bool,
}

/// Events pushed by the browser side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    TabUpdated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        active: bool,
    },
    TabActivated {
        tab_id: TabId,
    },
    TabRemoved {
        tab_id: TabId,
    },
    SettingsChanged {
        #[serde(default)]
        consent_granted: Option<bool>,
        #[serde(default)]
        checkin_interval_minutes: Option<u32>,
    },
    /// The page-side detector asked for a check-in
    CheckinRequested {
        tab_id: TabId,
        #[serde(default)]
        reason: String,
    },
    CheckinDismissed,
}

impl HostEvent {
    /// URL of a `tab_updated` event that should be classified: only
    /// `loading` and `complete` updates that carry a URL qualify.
    pub fn navigation_url(&self) -> Option<&str> {
        match self {
            HostEvent::TabUpdated {
                url: Some(url),
                status: Some(status),
                ..
            } if status == "loading" || status == "complete" => Some(url.as_str()),
            _ => None,
        }
    }
}

/// Content of a check-in delivered to a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinPayload {
    pub coaching: String,
    pub alternatives: Vec<SuggestedAction>,
}

/// Title used for fallback notifications
pub const NOTIFICATION_TITLE: &str = "Mindful Check-in 🧘";

/// Browser operations the tracker and orchestrator depend on
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Look up a tab; `None` if it no longer exists
    async fn tab(&self, tab_id: TabId) -> Result<Option<TabInfo>>;

    /// The focused tab of the focused window
    async fn active_tab(&self) -> Result<Option<TabInfo>>;

    /// Liveness probe of the page-side listener
    async fn probe(&self, tab_id: TabId) -> Result<bool>;

    /// Inject the page-side listener into a tab
    async fn inject_listener(&self, tab_id: TabId) -> Result<()>;

    /// Present a check-in in the page
    async fn show_checkin(&self, tab_id: TabId, payload: &CheckinPayload) -> Result<()>;

    /// Show a host-level notification
    async fn notify(&self, title: &str, message: &str) -> Result<()>;
}

/// Whether a URL belongs to a browser-internal page that cannot be injected
pub fn is_internal_page(url: &str) -> bool {
    ["chrome://", "chrome-extension://", "about:", "edge://"]
        .iter()
        .any(|prefix| url.starts_with(prefix))
}
