//! Check-in orchestration
//!
//! Counts the check-in, gathers goal and seed-action context, generates
//! content, and delivers it to the tracked tab. Delivery falls back to a
//! host notification carrying just the coaching text. A check-in never
//! fails outright; the worst case is a [`DeliveryOutcome::Failed`] record.

use crate::checkin::generator::{CheckinContent, CheckinGenerator};
use crate::error::Result;
use crate::host::{is_internal_page, BrowserHost, CheckinPayload, NOTIFICATION_TITLE};
use crate::storage::{
    CheckinRecord, DeliveryOutcome, SessionStore, Session, TabId, UsageDelta,
    DEFAULT_PRIMARY_GOAL,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Runs one check-in end to end
pub struct CheckinOrchestrator {
    store: Arc<SessionStore>,
    host: Arc<dyn BrowserHost>,
    generator: CheckinGenerator,
    settle: Duration,
}

impl CheckinOrchestrator {
    /// # Arguments
    ///
    /// * `settle` - wait after re-injecting the page listener before probing again
    pub fn new(
        store: Arc<SessionStore>,
        host: Arc<dyn BrowserHost>,
        generator: CheckinGenerator,
        settle: Duration,
    ) -> Self {
        Self {
            store,
            host,
            generator,
            settle,
        }
    }

    /// Run a check-in for the session's tab
    ///
    /// The usage counter is incremented before anything else and is never
    /// rolled back.
    pub async fn run(&self, session: &Session, now: DateTime<Utc>) -> CheckinRecord {
        tracing::info!(
            domain = %session.domain,
            tab = %session.tab_id,
            "Starting check-in"
        );

        if let Err(e) = self.store.record_usage(UsageDelta::checkin(
            now.date_naive(),
            session.domain.clone(),
            session.app_name.clone(),
        )) {
            tracing::error!("Failed to count check-in: {}", e);
        }

        let goal = self.store.primary_goal().unwrap_or_else(|e| {
            tracing::warn!("Failed to load goals, using default: {}", e);
            DEFAULT_PRIMARY_GOAL.to_string()
        });
        let seeds = self.store.seed_actions().unwrap_or_else(|e| {
            tracing::warn!("Failed to load seed actions: {}", e);
            Vec::new()
        });

        let content = self.generator.generate(&goal, &session.domain, &seeds).await;
        let outcome = self.deliver(session.tab_id, &content).await;

        tracing::info!(domain = %session.domain, outcome = %outcome, "Check-in finished");

        let record = CheckinRecord {
            at: now,
            domain: session.domain.clone(),
            session_started_at: Some(session.started_at),
            goal,
            coaching: content.coaching,
            actions: content.actions,
            outcome,
        };

        if let Err(e) = self.store.save_last_checkin(&record) {
            tracing::warn!("Failed to save last check-in: {}", e);
        }

        record
    }

    /// Deliver content to a tab, falling back to a notification
    pub async fn deliver(&self, tab_id: TabId, content: &CheckinContent) -> DeliveryOutcome {
        if !self.ensure_listener(tab_id).await {
            tracing::info!(tab = %tab_id, "Page listener unreachable, notifying instead");
            return self.notify(&content.coaching).await;
        }

        let payload = CheckinPayload {
            coaching: content.coaching.clone(),
            alternatives: content.actions.clone(),
        };

        match self.host.show_checkin(tab_id, &payload).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                tracing::warn!(tab = %tab_id, "Page delivery failed: {}", e);
                self.notify(&content.coaching).await
            }
        }
    }

    /// Probe, and on failure re-inject once and probe again
    async fn ensure_listener(&self, tab_id: TabId) -> bool {
        if matches!(self.host.probe(tab_id).await, Ok(true)) {
            return true;
        }

        match self.revive_listener(tab_id).await {
            Ok(alive) => alive,
            Err(e) => {
                tracing::warn!(tab = %tab_id, "Listener re-injection failed: {}", e);
                false
            }
        }
    }

    async fn revive_listener(&self, tab_id: TabId) -> Result<bool> {
        let Some(tab) = self.host.tab(tab_id).await? else {
            return Ok(false);
        };

        if tab.url.as_deref().map_or(true, is_internal_page) {
            tracing::debug!(tab = %tab_id, "Internal page, skipping injection");
            return Ok(false);
        }

        self.host.inject_listener(tab_id).await?;
        tokio::time::sleep(self.settle).await;
        self.host.probe(tab_id).await
    }

    async fn notify(&self, coaching: &str) -> DeliveryOutcome {
        match self.host.notify(NOTIFICATION_TITLE, coaching).await {
            Ok(()) => DeliveryOutcome::Notified,
            Err(e) => {
                tracing::error!("Notification failed: {}", e);
                DeliveryOutcome::Failed
            }
        }
    }
}
