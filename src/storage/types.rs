use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MindfulError;

/// Browser tab identifier as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The record of continuous presence on one tracked domain on one tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Tab the session is bound to
    pub tab_id: TabId,
    /// Domain with `www.` stripped
    pub domain: String,
    /// Display name of the tracked site
    pub app_name: String,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// Baseline for the next incremental save
    pub last_saved_at: DateTime<Utc>,
    /// A check-in ran for this session, so the reminder stays disarmed
    #[serde(default)]
    pub checkin_fired: bool,
}

impl Session {
    /// Start a new session at `now`
    pub fn new(
        tab_id: TabId,
        domain: impl Into<String>,
        app_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            tab_id,
            domain: domain.into(),
            app_name: app_name.into(),
            started_at: now,
            last_saved_at: now,
            checkin_fired: false,
        }
    }

    /// Minutes elapsed since the last incremental save
    pub fn unsaved_minutes(&self, now: DateTime<Utc>) -> f64 {
        minutes_between(self.last_saved_at, now)
    }

    /// Minutes elapsed since the session started
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> f64 {
        minutes_between(self.started_at, now)
    }
}

/// Fractional minutes from `from` to `to`, clamped at zero
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds().max(0);
    millis as f64 / 60_000.0
}

/// Mood reported by the user after a check-in or from the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Inspired,
    Okay,
    Drained,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Inspired => "inspired",
            Mood::Okay => "okay",
            Mood::Drained => "drained",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = MindfulError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inspired" => Ok(Mood::Inspired),
            "okay" => Ok(Mood::Okay),
            "drained" => Ok(Mood::Drained),
            other => Err(MindfulError::Validation(format!(
                "Unknown mood '{}'. Expected inspired, okay or drained",
                other
            ))),
        }
    }
}

/// Durable daily aggregate keyed by (date, domain)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub date: NaiveDate,
    pub domain: String,
    pub app_name: String,
    pub duration_minutes: f64,
    #[serde(default)]
    pub scroll_rate: f64,
    #[serde(default)]
    pub checkins_triggered: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
}

/// An additive change to the usage entry for one (date, domain) key
///
/// Durations and check-ins accumulate, scroll rate is a running maximum
/// and a present mood overwrites the stored one.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageDelta {
    pub date: NaiveDate,
    pub domain: String,
    pub app_name: String,
    pub duration_minutes: f64,
    pub scroll_rate: f64,
    pub checkins: u32,
    pub mood: Option<Mood>,
}

impl UsageDelta {
    /// A duration increment (zero creates the entry for visibility)
    pub fn duration(
        date: NaiveDate,
        domain: impl Into<String>,
        app_name: impl Into<String>,
        minutes: f64,
    ) -> Self {
        Self {
            date,
            domain: domain.into(),
            app_name: app_name.into(),
            duration_minutes: minutes.max(0.0),
            scroll_rate: 0.0,
            checkins: 0,
            mood: None,
        }
    }

    /// A single check-in for the domain
    pub fn checkin(date: NaiveDate, domain: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            checkins: 1,
            ..Self::duration(date, domain, app_name, 0.0)
        }
    }

    /// A mood update for the domain
    pub fn mood(
        date: NaiveDate,
        domain: impl Into<String>,
        app_name: impl Into<String>,
        mood: Mood,
    ) -> Self {
        Self {
            mood: Some(mood),
            ..Self::duration(date, domain, app_name, 0.0)
        }
    }

    pub(crate) fn into_entry(self) -> UsageEntry {
        UsageEntry {
            date: self.date,
            domain: self.domain,
            app_name: self.app_name,
            duration_minutes: self.duration_minutes,
            scroll_rate: self.scroll_rate,
            checkins_triggered: self.checkins,
            mood: self.mood,
        }
    }
}

impl UsageEntry {
    /// Whether this entry is the one addressed by `delta`
    pub fn matches(&self, delta: &UsageDelta) -> bool {
        self.date == delta.date && self.domain == delta.domain
    }

    /// Merge a delta into this entry
    pub fn apply(&mut self, delta: &UsageDelta) {
        self.duration_minutes += delta.duration_minutes;
        self.scroll_rate = self.scroll_rate.max(delta.scroll_rate);
        self.checkins_triggered += delta.checkins;
        if let Some(mood) = delta.mood {
            self.mood = Some(mood);
        }
    }
}

/// A user goal; the first one is the primary goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub label: String,
}

/// Kind of a user-preferred alternative action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    #[default]
    Link,
    Activity,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Link => f.write_str("link"),
            ActionKind::Activity => f.write_str("activity"),
        }
    }
}

/// A user-preferred alternative action, optionally with a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPreference {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Seed action handed to the micro-action generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAction {
    pub label: String,
    pub url: String,
}

/// User settings gating tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub consent_granted: bool,
    #[serde(default = "default_checkin_interval")]
    pub checkin_interval_minutes: u32,
}

/// Smallest accepted check-in interval
pub const MIN_CHECKIN_INTERVAL: u32 = 1;
/// Largest accepted check-in interval (one day)
pub const MAX_CHECKIN_INTERVAL: u32 = 1440;

fn default_checkin_interval() -> u32 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            consent_granted: false,
            checkin_interval_minutes: default_checkin_interval(),
        }
    }
}

impl Settings {
    /// Validate the interval bounds
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(MIN_CHECKIN_INTERVAL..=MAX_CHECKIN_INTERVAL).contains(&self.checkin_interval_minutes) {
            return Err(MindfulError::Validation(format!(
                "Check-in interval must be between {} and {} minutes, got {}",
                MIN_CHECKIN_INTERVAL, MAX_CHECKIN_INTERVAL, self.checkin_interval_minutes
            ))
            .into());
        }
        Ok(())
    }
}

/// A logged mood with its timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodLog {
    pub mood: Mood,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate statistics over all usage entries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub days_tracked: usize,
    pub total_minutes: f64,
    pub total_checkins: u32,
    pub average_minutes_per_day: f64,
}

/// Mood counts and active minutes for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMoodSummary {
    pub date: NaiveDate,
    pub inspired: u32,
    pub okay: u32,
    pub drained: u32,
    pub minutes_active: f64,
}

impl DailyMoodSummary {
    pub(crate) fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            inspired: 0,
            okay: 0,
            drained: 0,
            minutes_active: 0.0,
        }
    }

    pub(crate) fn count(&mut self, mood: Mood) {
        match mood {
            Mood::Inspired => self.inspired += 1,
            Mood::Okay => self.okay += 1,
            Mood::Drained => self.drained += 1,
        }
    }
}

/// Provenance of a suggested action's URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSource {
    /// The user supplied the URL (or the generator copied a seed URL)
    UserProvided,
    /// The URL came from link resolution fallback
    AutoSearched,
}

/// One suggested micro-action delivered with a check-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    pub search_query: String,
    pub url: String,
    pub source: LinkSource,
}

/// How a check-in reached the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Shown in the page
    Delivered,
    /// Fell back to a host notification
    Notified,
    /// Neither channel worked
    Failed,
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered => f.write_str("delivered"),
            DeliveryOutcome::Notified => f.write_str("notified"),
            DeliveryOutcome::Failed => f.write_str("failed"),
        }
    }
}

/// The most recent check-in, kept for `status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinRecord {
    pub at: DateTime<Utc>,
    pub domain: String,
    /// Start of the session the check-in ran for
    #[serde(default)]
    pub session_started_at: Option<DateTime<Utc>>,
    pub goal: String,
    pub coaching: String,
    pub actions: Vec<SuggestedAction>,
    pub outcome: DeliveryOutcome,
}

/// Full data export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBundle {
    pub tracking_data: Vec<UsageEntry>,
    pub mood_logs: Vec<MoodLog>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}
