//! One-shot reminder scheduling
//!
//! The scheduler stores a single wall-clock deadline. The tracker's run
//! loop sleeps until [`ReminderScheduler::time_until_due`] elapses and then
//! calls [`ReminderScheduler::take_due`], which disarms as it fires so each
//! armed period fires at most once.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Name of the reminder in logs and status output
pub const REMINDER_NAME: &str = "check_in_reminder";

/// A single named one-shot timer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderScheduler {
    due_at: Option<DateTime<Utc>>,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any pending reminder with one due `delay` after `now`
    pub fn arm(&mut self, now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        let due = now + delay;
        tracing::debug!(reminder = REMINDER_NAME, due_at = %due, "Reminder armed");
        self.due_at = Some(due);
        due
    }

    /// Cancel the pending reminder, if any
    pub fn disarm(&mut self) {
        if self.due_at.take().is_some() {
            tracing::debug!(reminder = REMINDER_NAME, "Reminder disarmed");
        }
    }

    /// Re-arm with `delay` from `now`, only if currently armed
    ///
    /// Returns whether the reminder was re-armed.
    pub fn reconfigure(&mut self, now: DateTime<Utc>, delay: Duration) -> bool {
        if self.due_at.is_none() {
            return false;
        }
        self.arm(now, delay);
        true
    }

    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_at
    }

    /// Time left until the deadline; zero when overdue, `None` when disarmed
    pub fn time_until_due(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.due_at
            .map(|due| (due - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Fire if due: disarms and returns `true` once the deadline has passed
    pub fn take_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.due_at {
            Some(due) if due <= now => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }
}
