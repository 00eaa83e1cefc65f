/*!
Command handlers for the CLI

- `run`: native messaging host (session tracker)
- `report`: status, stats, and mood insights
- `settings`: consent and check-in interval
- `goals`: goal list management
- `actions`: preferred alternative actions
- `data`: mood entry, export, and erase
- `preview`: one-off check-in generation without a browser
*/

use crate::config::Config;
use crate::error::{MindfulError, Result};
use crate::storage::SessionStore;

pub mod actions;
pub mod data;
pub mod goals;
pub mod preview;
pub mod report;
pub mod run;
pub mod settings;

/// Open the store named by the configuration
///
/// # Errors
///
/// Returns error if the path cannot be determined or the database is
/// locked by a running host
pub fn open_store(config: &Config) -> Result<SessionStore> {
    let path = config.storage_path()?;
    tracing::debug!("Opening store at {}", path.display());
    SessionStore::open(&path).map_err(|e| {
        MindfulError::Storage(format!(
            "Could not open store at {} (is `mindful-social run` active?): {}",
            path.display(),
            e
        ))
        .into()
    })
}

/// Shorten text for table cells
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer label", 10), "a much ...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_open_store_at_configured_path() {
        let dir = crate::test_utils::temp_dir();
        let store = open_store(&crate::test_utils::test_config(&dir)).unwrap();
        assert!(store.settings().is_ok());
        assert!(dir.path().join("store").exists());
    }
}
