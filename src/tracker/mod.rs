//! Session tracker runtime
//!
//! [`SessionTracker`] is the single owner of tracking state. It turns host
//! events, timer firings, and check-in completions into [`TrackerEvent`]s,
//! feeds them through the pure [`TrackerState`] machine, and executes the
//! resulting [`Effect`]s against the store, the reminder, and the ticker.
//!
//! Check-ins run on a spawned task so the tracker keeps handling events
//! (including a dismissal) while generation is outstanding.

pub mod clock;
pub mod reminder;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use reminder::{ReminderScheduler, REMINDER_NAME};
pub use state::{Context, Effect, TrackerEvent, TrackerState};

use crate::checkin::CheckinOrchestrator;
use crate::config::TrackerConfig;
use crate::host::{BrowserHost, HostEvent};
use crate::storage::{CheckinRecord, DeliveryOutcome, Session, SessionStore, Settings, TabId};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Timer cadences of the run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerOptions {
    pub tick_interval: Duration,
    pub recheck_interval: Duration,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self::from(&TrackerConfig::default())
    }
}

impl From<&TrackerConfig> for TrackerOptions {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            recheck_interval: config.recheck_interval(),
        }
    }
}

/// Point-in-time view of the tracker for status output and tests
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSnapshot {
    pub session: Option<Session>,
    pub checkin_in_flight: bool,
    pub reminder_due_at: Option<DateTime<Utc>>,
    pub ticker_running: bool,
}

/// Owner of the session state machine and its timers
pub struct SessionTracker {
    state: TrackerState,
    store: Arc<SessionStore>,
    host: Arc<dyn BrowserHost>,
    orchestrator: Arc<CheckinOrchestrator>,
    clock: Arc<dyn Clock>,
    options: TrackerOptions,
    reminder: ReminderScheduler,
    ticker_running: bool,
    ticker_restarted: bool,
    checkin_task: Option<JoinHandle<()>>,
    settled_tx: mpsc::UnboundedSender<CheckinRecord>,
    settled_rx: mpsc::UnboundedReceiver<CheckinRecord>,
}

impl SessionTracker {
    pub fn new(
        store: Arc<SessionStore>,
        host: Arc<dyn BrowserHost>,
        orchestrator: Arc<CheckinOrchestrator>,
        clock: Arc<dyn Clock>,
        options: TrackerOptions,
    ) -> Self {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        Self {
            state: TrackerState::default(),
            store,
            host,
            orchestrator,
            clock,
            options,
            reminder: ReminderScheduler::new(),
            ticker_running: false,
            ticker_restarted: false,
            checkin_task: None,
            settled_tx,
            settled_rx,
        }
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            session: self.state.session.clone(),
            checkin_in_flight: self.state.checkin_in_flight,
            reminder_due_at: self.reminder.due_at(),
            ticker_running: self.ticker_running,
        }
    }

    /// Rebuild state from the persisted session after a restart
    ///
    /// A session whose tab is gone, or no longer shows a tracked site,
    /// is discarded and the tracker stays idle.
    pub async fn restore(&mut self) {
        let session = match self.store.session() {
            Ok(Some(session)) => session,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Failed to read persisted session: {}", e);
                return;
            }
        };

        tracing::info!(domain = %session.domain, tab = %session.tab_id, "Restoring session");
        let tab_url = self.tab_url(session.tab_id).await;
        self.dispatch(TrackerEvent::Restored { session, tab_url })
            .await;

        if !self.state.is_active() {
            tracing::info!("Persisted session was stale, staying idle");
        }
    }

    /// Translate and apply one event from the browser
    pub async fn handle_host_event(&mut self, event: HostEvent) {
        tracing::debug!(?event, "Host event");
        let translated = match event {
            HostEvent::TabUpdated { tab_id, active, .. } => {
                event.navigation_url().map(|url| TrackerEvent::Navigated {
                    tab_id,
                    url: url.to_string(),
                    is_active_tab: active,
                })
            }
            HostEvent::TabActivated { tab_id } => Some(TrackerEvent::Activated {
                tab_id,
                url: self.tab_url(tab_id).await,
            }),
            HostEvent::TabRemoved { tab_id } => Some(TrackerEvent::TabClosed { tab_id }),
            HostEvent::SettingsChanged {
                consent_granted,
                checkin_interval_minutes,
            } => {
                self.apply_settings_change(consent_granted, checkin_interval_minutes)
                    .await;
                None
            }
            HostEvent::CheckinRequested { tab_id, reason } => {
                tracing::info!(tab = %tab_id, reason = %reason, "Page requested a check-in");
                Some(TrackerEvent::CheckinRequested {
                    tab_id,
                    tab_url: self.tab_url(tab_id).await,
                })
            }
            HostEvent::CheckinDismissed => Some(TrackerEvent::CheckinDismissed),
        };

        if let Some(event) = translated {
            self.dispatch(event).await;
        }
    }

    async fn apply_settings_change(&mut self, consent: Option<bool>, interval: Option<u32>) {
        if let Some(granted) = consent {
            match self.store.set_consent(granted) {
                Ok(_) => self.dispatch(TrackerEvent::ConsentChanged { granted }).await,
                Err(e) => tracing::error!("Failed to save consent: {}", e),
            }
        }

        if let Some(minutes) = interval {
            match self.store.set_interval(minutes) {
                Ok(_) => self.dispatch(TrackerEvent::IntervalChanged { minutes }).await,
                Err(e) => tracing::warn!("Rejected check-in interval {}: {}", minutes, e),
            }
        }
    }

    /// Incremental save of the active session
    pub async fn tick(&mut self) {
        self.dispatch(TrackerEvent::Tick).await;
    }

    /// Poll the focused tab; may start, switch, or retarget a session
    pub async fn recheck_active_tab(&mut self) {
        if let Some(event) = self.poll_active_tab().await {
            self.dispatch(event).await;
        }
    }

    /// Fire the reminder if its deadline has passed
    pub async fn fire_due_reminder(&mut self) -> bool {
        if !self.reminder.take_due(self.clock.now()) {
            return false;
        }
        tracing::info!(reminder = REMINDER_NAME, "Reminder fired");
        let tab_url = match &self.state.session {
            Some(session) => self.tab_url(session.tab_id).await,
            None => None,
        };
        self.dispatch(TrackerEvent::ReminderDue { tab_url }).await;
        true
    }

    /// Wait for an outstanding check-in and apply its completion
    pub async fn wait_for_checkin(&mut self) -> Option<CheckinRecord> {
        if let Some(task) = self.checkin_task.take() {
            if let Err(e) = task.await {
                tracing::error!("Check-in task failed: {}", e);
            }
        }

        let mut last = None;
        while let Ok(record) = self.settled_rx.try_recv() {
            self.settle(&record).await;
            last = Some(record);
        }
        last
    }

    async fn settle(&mut self, record: &CheckinRecord) {
        self.checkin_task = None;
        let Some(started_at) = record.session_started_at else {
            return;
        };
        self.dispatch(TrackerEvent::CheckinSettled {
            delivered: record.outcome == DeliveryOutcome::Delivered,
            domain: record.domain.clone(),
            started_at,
        })
        .await;
    }

    /// Drive the tracker until cancelled or the host disconnects
    pub async fn run(
        &mut self,
        mut events: mpsc::UnboundedReceiver<HostEvent>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut recheck = tokio::time::interval(self.options.recheck_interval);
        recheck.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            tick_secs = self.options.tick_interval.as_secs(),
            recheck_secs = self.options.recheck_interval.as_secs(),
            "Tracker running"
        );

        loop {
            if self.ticker_restarted {
                ticker.reset();
                self.ticker_restarted = false;
            }
            let reminder_wait = self.reminder.time_until_due(self.clock.now());
            let ticker_running = self.ticker_running;

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Tracker cancelled");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_host_event(event).await,
                    None => {
                        tracing::info!("Browser host disconnected");
                        break;
                    }
                },
                Some(record) = self.settled_rx.recv() => self.settle(&record).await,
                _ = ticker.tick(), if ticker_running => self.tick().await,
                _ = recheck.tick() => self.recheck_active_tab().await,
                _ = tokio::time::sleep(reminder_wait.unwrap_or(Duration::ZERO)), if reminder_wait.is_some() => {
                    self.fire_due_reminder().await;
                }
            }
        }

        // Save the partial interval; the persisted session survives for restore
        self.tick().await;
    }

    async fn tab_url(&self, tab_id: TabId) -> Option<String> {
        match self.host.tab(tab_id).await {
            Ok(tab) => tab.and_then(|tab| tab.url),
            Err(e) => {
                tracing::warn!(tab = %tab_id, "Tab lookup failed: {}", e);
                None
            }
        }
    }

    async fn poll_active_tab(&self) -> Option<TrackerEvent> {
        match self.host.active_tab().await {
            Ok(Some(tab)) => tab.url.map(|url| TrackerEvent::ActiveTabPolled {
                tab_id: tab.id,
                url,
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Active tab poll failed: {}", e);
                None
            }
        }
    }

    fn settings(&self) -> Settings {
        self.store.settings().unwrap_or_else(|e| {
            tracing::error!("Failed to read settings, treating consent as withheld: {}", e);
            Settings::default()
        })
    }

    /// Apply an event and everything it sets off
    async fn dispatch(&mut self, event: TrackerEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let ctx = Context::new(self.clock.now(), self.settings());
            let (state, effects) = std::mem::take(&mut self.state).handle(event, &ctx);
            self.state = state;

            for effect in effects {
                if effect == Effect::RecheckActiveTab {
                    if let Some(polled) = self.poll_active_tab().await {
                        queue.push_back(polled);
                    }
                } else {
                    self.execute(effect, ctx.now);
                }
            }
        }
    }

    fn execute(&mut self, effect: Effect, now: DateTime<Utc>) {
        match effect {
            Effect::PersistSession(session) => {
                if let Err(e) = self.store.save_session(&session) {
                    tracing::error!("Failed to persist session: {}", e);
                }
            }
            Effect::ClearPersistedSession => {
                if let Err(e) = self.store.clear_session() {
                    tracing::error!("Failed to clear persisted session: {}", e);
                }
            }
            Effect::RecordUsage(delta) => match self.store.record_usage(delta) {
                Ok(entry) => tracing::debug!(
                    domain = %entry.domain,
                    minutes = entry.duration_minutes,
                    "Usage recorded"
                ),
                Err(e) => tracing::error!("Failed to record usage: {}", e),
            },
            Effect::ArmReminder(delay) => {
                self.reminder.arm(now, delay);
            }
            Effect::DisarmReminder => self.reminder.disarm(),
            Effect::ReconfigureReminder(delay) => {
                if self.reminder.reconfigure(now, delay) {
                    tracing::info!(minutes = delay.as_secs() / 60, "Reminder rescheduled");
                }
            }
            Effect::StartTicker => {
                self.ticker_running = true;
                self.ticker_restarted = true;
            }
            Effect::StopTicker => self.ticker_running = false,
            Effect::BeginCheckin(session) => self.begin_checkin(session, now),
            Effect::RecheckActiveTab => {}
        }
    }

    fn begin_checkin(&mut self, session: Session, now: DateTime<Utc>) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let settled = self.settled_tx.clone();
        self.checkin_task = Some(tokio::spawn(async move {
            let record = orchestrator.run(&session, now).await;
            let _ = settled.send(record);
        }));
    }
}
