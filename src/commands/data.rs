//! Mood entry, export, and erase

use crate::error::{MindfulError, Result};
use crate::storage::{Mood, SessionStore};
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::Path;

/// Record a mood for today
pub fn record_mood(store: &SessionStore, mood: Mood, now: DateTime<Utc>) -> Result<()> {
    let log = store.log_mood(mood, now)?;
    println!(
        "{} {} at {}",
        "Logged mood".green(),
        log.mood.to_string().bold(),
        log.timestamp.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

/// Serialize the export bundle as pretty JSON
pub fn export_json(store: &SessionStore, now: DateTime<Utc>) -> Result<String> {
    let bundle = store.export(now)?;
    serde_json::to_string_pretty(&bundle).map_err(|e| MindfulError::Serialization(e).into())
}

/// Write the export bundle to a file or stdout
pub fn export(store: &SessionStore, output: Option<&Path>, now: DateTime<Utc>) -> Result<()> {
    let json = export_json(store, now)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("{} {}", "Exported data to".green(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Delete all data except the consent flag
pub fn erase(store: &SessionStore, confirmed: bool) -> Result<()> {
    if !confirmed {
        return Err(MindfulError::Validation(
            "Refusing to erase without --yes".to_string(),
        )
        .into());
    }
    store.erase_all()?;
    println!("{}", "All usage, mood, goal, and action data erased.".green());
    Ok(())
}
