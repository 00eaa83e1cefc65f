//! Persistent session store
//!
//! All durable state lives in a whole-key JSON key-value store. The
//! production backend is an embedded `sled` database; tests use an
//! in-memory map. [`SessionStore`] is the typed repository the tracker,
//! the check-in orchestrator and the CLI commands read and write through.

use crate::error::{MindfulError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use directories::ProjectDirs;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use ulid::Ulid;

pub mod types;
pub use types::*;

/// Storage key of the persisted session
pub const SESSION_KEY: &str = "tracking_session";
/// Storage key of the usage entry list
pub const TRACKING_DATA_KEY: &str = "tracking_data";
pub const SETTINGS_KEY: &str = "settings";
pub const GOALS_KEY: &str = "goals";
pub const ACTIONS_KEY: &str = "actions";
pub const MOOD_LOGS_KEY: &str = "mood_logs";
pub const LAST_CHECKIN_KEY: &str = "last_checkin";

/// Primary goal used when the goal list is empty
pub const DEFAULT_PRIMARY_GOAL: &str = "Stay focused and mindful";
/// Domain of usage entries created by manual mood logging
pub const MANUAL_DOMAIN: &str = "manual";
const MANUAL_APP_NAME: &str = "Manual Check-in";
/// Version stamped on exported bundles
pub const EXPORT_VERSION: &str = "1.0.0";

/// Whole-key JSON storage backend
pub trait KeyValueStore: Send + Sync {
    /// Read a key
    fn get(&self, key: &str) -> Result<Option<Value>>;
    /// Replace a key
    fn set(&self, key: &str, value: &Value) -> Result<()>;
    /// Delete a key; missing keys are not an error
    fn remove(&self, key: &str) -> Result<()>;
    /// Delete every key
    fn clear(&self) -> Result<()>;
}

/// `sled`-backed key-value store
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create a database directory
    ///
    /// # Errors
    ///
    /// Returns `MindfulError::Storage` if the database cannot be opened,
    /// including when another process holds its lock.
    ///
    /// # Examples
    ///
    /// ```
    /// use mindful_social::storage::SledStore;
    ///
    /// # fn main() -> mindful_social::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledStore::open(dir.path().join("db"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MindfulError::Storage(format!("Failed to create data directory: {}", e))
            })?;
        }
        let db = sled::open(path)
            .map_err(|e| MindfulError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let bytes = self
            .db
            .get(key.as_bytes())
            .map_err(|e| MindfulError::Storage(format!("Failed to read '{}': {}", key, e)))?;
        match bytes {
            Some(data) => {
                let value = serde_json::from_slice(&data).map_err(|e| {
                    MindfulError::Storage(format!("Failed to deserialize '{}': {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let data = serde_json::to_vec(value)
            .map_err(|e| MindfulError::Storage(format!("Failed to serialize '{}': {}", key, e)))?;
        self.db
            .insert(key.as_bytes(), data)
            .map_err(|e| MindfulError::Storage(format!("Failed to write '{}': {}", key, e)))?;
        self.db
            .flush()
            .map_err(|e| MindfulError::Storage(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| MindfulError::Storage(format!("Failed to remove '{}': {}", key, e)))?;
        self.db
            .flush()
            .map_err(|e| MindfulError::Storage(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.db
            .clear()
            .map_err(|e| MindfulError::Storage(format!("Failed to clear database: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| MindfulError::Storage(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}

/// In-memory key-value store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.entries
            .lock()
            .map_err(|_| MindfulError::Storage("Memory store lock poisoned".to_string()).into())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}

/// Default database location in the platform data directory
pub fn default_storage_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "mindful", "mindful-social")
        .ok_or_else(|| MindfulError::Storage("Could not determine data directory".into()))?;
    Ok(dirs.data_dir().join("store"))
}

/// Typed repository over a [`KeyValueStore`]
///
/// Collections are read, modified and written back whole. Every
/// read-modify-write runs under one internal lock so the tracker ticker
/// and a concurrent check-in never lose each other's update.
pub struct SessionStore {
    kv: Box<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl SessionStore {
    /// Wrap an arbitrary backend
    pub fn new(kv: impl KeyValueStore + 'static) -> Self {
        Self {
            kv: Box::new(kv),
            write_lock: Mutex::new(()),
        }
    }

    /// Open a sled-backed store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(SledStore::open(path)?))
    }

    /// A fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv.get(key)? {
            Some(value) => {
                let typed = serde_json::from_value(value).map_err(|e| {
                    MindfulError::Storage(format!("Malformed value under '{}': {}", key, e))
                })?;
                Ok(Some(typed))
            }
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_value(value)?;
        self.kv.set(key, &json)
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(self.read(key)?.unwrap_or_default())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| MindfulError::Storage("Store write lock poisoned".to_string()).into())
    }

    // ---- session ----

    /// The persisted session, if any
    pub fn session(&self) -> Result<Option<Session>> {
        self.read(SESSION_KEY)
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        self.write(SESSION_KEY, session)
    }

    pub fn clear_session(&self) -> Result<()> {
        self.kv.remove(SESSION_KEY)
    }

    // ---- usage ----

    /// All usage entries in insertion order
    pub fn usage(&self) -> Result<Vec<UsageEntry>> {
        self.read_list(TRACKING_DATA_KEY)
    }

    /// Usage entries for a single day
    pub fn usage_for(&self, date: NaiveDate) -> Result<Vec<UsageEntry>> {
        Ok(self
            .usage()?
            .into_iter()
            .filter(|entry| entry.date == date)
            .collect())
    }

    /// Merge `delta` into the entry for its (date, domain), creating it if
    /// absent. Returns the resulting entry.
    pub fn record_usage(&self, delta: UsageDelta) -> Result<UsageEntry> {
        let _guard = self.guard()?;
        let mut entries: Vec<UsageEntry> = self.read_list(TRACKING_DATA_KEY)?;
        let merged = match entries.iter_mut().find(|entry| entry.matches(&delta)) {
            Some(entry) => {
                entry.apply(&delta);
                entry.clone()
            }
            None => {
                let entry = delta.into_entry();
                entries.push(entry.clone());
                entry
            }
        };
        self.write(TRACKING_DATA_KEY, &entries)?;
        Ok(merged)
    }

    // ---- settings ----

    pub fn settings(&self) -> Result<Settings> {
        Ok(self.read(SETTINGS_KEY)?.unwrap_or_default())
    }

    /// Validate and save settings
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        self.write(SETTINGS_KEY, settings)
    }

    /// Update the consent flag and return the new settings
    pub fn set_consent(&self, granted: bool) -> Result<Settings> {
        let _guard = self.guard()?;
        let mut settings = self.settings()?;
        settings.consent_granted = granted;
        self.save_settings(&settings)?;
        Ok(settings)
    }

    /// Update the check-in interval and return the new settings
    pub fn set_interval(&self, minutes: u32) -> Result<Settings> {
        let _guard = self.guard()?;
        let mut settings = self.settings()?;
        settings.checkin_interval_minutes = minutes;
        self.save_settings(&settings)?;
        Ok(settings)
    }

    // ---- goals ----

    /// Goals, seeding the default list on first use
    pub fn goals(&self) -> Result<Vec<Goal>> {
        if let Some(goals) = self.read(GOALS_KEY)? {
            return Ok(goals);
        }
        let defaults = default_goals();
        self.write(GOALS_KEY, &defaults)?;
        Ok(defaults)
    }

    /// Label of the first goal, or the built-in default
    pub fn primary_goal(&self) -> Result<String> {
        Ok(self
            .goals()?
            .into_iter()
            .next()
            .map(|goal| goal.label)
            .unwrap_or_else(|| DEFAULT_PRIMARY_GOAL.to_string()))
    }

    pub fn add_goal(&self, label: &str) -> Result<Goal> {
        let label = non_empty_label(label, "Goal")?;
        let _guard = self.guard()?;
        let mut goals = self.goals()?;
        let goal = Goal {
            id: new_id("g"),
            label,
        };
        goals.push(goal.clone());
        self.write(GOALS_KEY, &goals)?;
        Ok(goal)
    }

    pub fn update_goal(&self, id: &str, label: &str) -> Result<Goal> {
        let label = non_empty_label(label, "Goal")?;
        let _guard = self.guard()?;
        let mut goals = self.goals()?;
        let goal = goals
            .iter_mut()
            .find(|goal| goal.id == id)
            .ok_or_else(|| MindfulError::Validation(format!("No goal with id '{}'", id)))?;
        goal.label = label;
        let updated = goal.clone();
        self.write(GOALS_KEY, &goals)?;
        Ok(updated)
    }

    /// Remove a goal; returns whether it existed
    pub fn remove_goal(&self, id: &str) -> Result<bool> {
        let _guard = self.guard()?;
        let mut goals = self.goals()?;
        let before = goals.len();
        goals.retain(|goal| goal.id != id);
        let removed = goals.len() != before;
        if removed {
            self.write(GOALS_KEY, &goals)?;
        }
        Ok(removed)
    }

    // ---- actions ----

    pub fn actions(&self) -> Result<Vec<ActionPreference>> {
        self.read_list(ACTIONS_KEY)
    }

    /// Actions that carry a URL, as generator seeds
    pub fn seed_actions(&self) -> Result<Vec<SeedAction>> {
        Ok(self
            .actions()?
            .into_iter()
            .filter_map(|action| {
                action.url.map(|url| SeedAction {
                    label: action.label,
                    url,
                })
            })
            .collect())
    }

    pub fn add_action(
        &self,
        label: &str,
        kind: ActionKind,
        url: Option<&str>,
    ) -> Result<ActionPreference> {
        let label = non_empty_label(label, "Action")?;
        let url = validate_action_url(kind, url)?;
        let _guard = self.guard()?;
        let mut actions = self.actions()?;
        let action = ActionPreference {
            id: new_id("a"),
            label,
            kind,
            url,
        };
        actions.push(action.clone());
        self.write(ACTIONS_KEY, &actions)?;
        Ok(action)
    }

    pub fn update_action(
        &self,
        id: &str,
        label: &str,
        kind: ActionKind,
        url: Option<&str>,
    ) -> Result<ActionPreference> {
        let label = non_empty_label(label, "Action")?;
        let url = validate_action_url(kind, url)?;
        let _guard = self.guard()?;
        let mut actions = self.actions()?;
        let action = actions
            .iter_mut()
            .find(|action| action.id == id)
            .ok_or_else(|| MindfulError::Validation(format!("No action with id '{}'", id)))?;
        action.label = label;
        action.kind = kind;
        action.url = url;
        let updated = action.clone();
        self.write(ACTIONS_KEY, &actions)?;
        Ok(updated)
    }

    pub fn remove_action(&self, id: &str) -> Result<bool> {
        let _guard = self.guard()?;
        let mut actions = self.actions()?;
        let before = actions.len();
        actions.retain(|action| action.id != id);
        let removed = actions.len() != before;
        if removed {
            self.write(ACTIONS_KEY, &actions)?;
        }
        Ok(removed)
    }

    // ---- mood ----

    pub fn mood_logs(&self) -> Result<Vec<MoodLog>> {
        self.read_list(MOOD_LOGS_KEY)
    }

    /// Append a mood log and stamp the day's manual usage entry
    pub fn log_mood(&self, mood: Mood, now: DateTime<Utc>) -> Result<MoodLog> {
        let log = MoodLog {
            mood,
            timestamp: now,
        };
        {
            let _guard = self.guard()?;
            let mut logs = self.mood_logs()?;
            logs.push(log.clone());
            self.write(MOOD_LOGS_KEY, &logs)?;
        }
        self.record_usage(UsageDelta::mood(
            now.date_naive(),
            MANUAL_DOMAIN,
            MANUAL_APP_NAME,
            mood,
        ))?;
        Ok(log)
    }

    // ---- reporting ----

    /// Aggregate statistics across all tracked days
    pub fn stats(&self) -> Result<UsageStats> {
        let entries = self.usage()?;
        if entries.is_empty() {
            return Ok(UsageStats::default());
        }
        let mut days = std::collections::HashSet::new();
        let mut stats = UsageStats::default();
        for entry in &entries {
            days.insert(entry.date);
            stats.total_minutes += entry.duration_minutes;
            stats.total_checkins += entry.checkins_triggered;
        }
        stats.days_tracked = days.len();
        stats.average_minutes_per_day = stats.total_minutes / stats.days_tracked as f64;
        Ok(stats)
    }

    /// Per-day mood counts and active minutes, most recent day first
    pub fn mood_insights(&self) -> Result<Vec<DailyMoodSummary>> {
        let mut days: BTreeMap<NaiveDate, DailyMoodSummary> = BTreeMap::new();
        for log in self.mood_logs()? {
            let date = log.timestamp.date_naive();
            days.entry(date)
                .or_insert_with(|| DailyMoodSummary::empty(date))
                .count(log.mood);
        }
        for entry in self.usage()? {
            if entry.duration_minutes <= 0.0 {
                continue;
            }
            days.entry(entry.date)
                .or_insert_with(|| DailyMoodSummary::empty(entry.date))
                .minutes_active += entry.duration_minutes;
        }
        Ok(days.into_values().rev().collect())
    }

    /// Snapshot of usage and mood data for export
    pub fn export(&self, now: DateTime<Utc>) -> Result<ExportBundle> {
        Ok(ExportBundle {
            tracking_data: self.usage()?,
            mood_logs: self.mood_logs()?,
            exported_at: now,
            version: EXPORT_VERSION.to_string(),
        })
    }

    /// Delete all data, keeping only the consent flag
    pub fn erase_all(&self) -> Result<()> {
        let _guard = self.guard()?;
        let consent = self.settings()?.consent_granted;
        self.kv.clear()?;
        let settings = Settings {
            consent_granted: consent,
            ..Settings::default()
        };
        self.write(SETTINGS_KEY, &settings)
    }

    // ---- last check-in ----

    pub fn last_checkin(&self) -> Result<Option<CheckinRecord>> {
        self.read(LAST_CHECKIN_KEY)
    }

    pub fn save_last_checkin(&self, record: &CheckinRecord) -> Result<()> {
        self.write(LAST_CHECKIN_KEY, record)
    }
}

/// The goals seeded on first use
pub fn default_goals() -> Vec<Goal> {
    [
        ("g1", "Limit social media to 60 min/day"),
        ("g2", "Take 3 mindful breaks per day"),
        ("g3", "Avoid scrolling after 10pm"),
    ]
    .into_iter()
    .map(|(id, label)| Goal {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string().to_lowercase())
}

fn non_empty_label(label: &str, what: &str) -> Result<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(MindfulError::Validation(format!("{} label cannot be empty", what)).into());
    }
    Ok(trimmed.to_string())
}

/// Link actions with a URL must use http or https. Empty URLs become `None`.
fn validate_action_url(kind: ActionKind, url: Option<&str>) -> Result<Option<String>> {
    let url = url.map(str::trim).filter(|u| !u.is_empty());
    if let (ActionKind::Link, Some(candidate)) = (kind, url) {
        let scheme = Regex::new(r"(?i)^https?://")
            .map_err(|e| MindfulError::Validation(format!("Invalid URL pattern: {}", e)))?;
        if !scheme.is_match(candidate) {
            return Err(MindfulError::Validation(format!(
                "Action URL must start with http:// or https://, got '{}'",
                candidate
            ))
            .into());
        }
    }
    Ok(url.map(str::to_string))
}
