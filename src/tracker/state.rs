//! Pure session-tracking state machine
//!
//! [`TrackerState::handle`] maps an event plus the current time and
//! settings to a new state and a list of [`Effect`]s. It performs no I/O;
//! the owning [`SessionTracker`](super::SessionTracker) executes effects.

use crate::sites::{classify, Classification};
use crate::storage::{Session, Settings, TabId, UsageDelta};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Increments below this many minutes are not written
pub const MIN_SAVE_MINUTES: f64 = 0.01;

/// Floor for a restored reminder's remaining delay
pub const MIN_REMINDER_DELAY: Duration = Duration::from_secs(60);

/// Inputs that drive the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A tab started or finished loading `url`
    Navigated {
        tab_id: TabId,
        url: String,
        /// Whether the tab is the focused tab of the focused window
        is_active_tab: bool,
    },
    /// The user switched to a tab; `url` is `None` before the tab has one
    Activated { tab_id: TabId, url: Option<String> },
    /// Periodic poll of the focused tab
    ActiveTabPolled { tab_id: TabId, url: String },
    TabClosed { tab_id: TabId },
    ConsentChanged { granted: bool },
    IntervalChanged { minutes: u32 },
    /// Incremental-save ticker fired
    Tick,
    /// Reminder deadline passed; `tab_url` is the tracked tab's URL now,
    /// `None` if the tab is gone
    ReminderDue { tab_url: Option<String> },
    /// The page asked for a check-in
    CheckinRequested {
        tab_id: TabId,
        tab_url: Option<String>,
    },
    /// An orchestrated check-in finished for the session identified by
    /// `domain` and `started_at`
    CheckinSettled {
        delivered: bool,
        domain: String,
        started_at: DateTime<Utc>,
    },
    /// The user closed the presented check-in
    CheckinDismissed,
    /// A persisted session was found on startup
    Restored {
        session: Session,
        tab_url: Option<String>,
    },
}

/// Side effects requested by a transition, executed in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PersistSession(Session),
    ClearPersistedSession,
    RecordUsage(UsageDelta),
    /// Replace any armed reminder with one due after the delay
    ArmReminder(Duration),
    DisarmReminder,
    /// Re-arm with a new delay if a reminder is currently armed
    ReconfigureReminder(Duration),
    StartTicker,
    StopTicker,
    /// Run the check-in orchestrator for this session
    BeginCheckin(Session),
    /// Look at the focused tab right away
    RecheckActiveTab,
}

/// Time and settings visible to a transition
#[derive(Debug, Clone)]
pub struct Context {
    pub now: DateTime<Utc>,
    pub settings: Settings,
}

impl Context {
    pub fn new(now: DateTime<Utc>, settings: Settings) -> Self {
        Self { now, settings }
    }

    fn interval(&self) -> Duration {
        interval_duration(self.settings.checkin_interval_minutes)
    }
}

/// Convert a whole-minute interval to a duration
pub fn interval_duration(minutes: u32) -> Duration {
    Duration::from_secs(u64::from(minutes) * 60)
}

/// Tracker state: at most one session, plus the check-in guard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    pub session: Option<Session>,
    /// A check-in is being orchestrated or is still presented
    pub checkin_in_flight: bool,
}

/// How a tab observation may affect a session on another tab
#[derive(Debug, Clone, Copy)]
struct Observation {
    /// The observed tab is the one the user is looking at
    focused: bool,
    /// An untracked URL in the focused tab ends a session elsewhere
    untracked_focus_stops: bool,
    /// An untracked URL on the tracked tab ends the session
    untracked_stops: bool,
}

impl TrackerState {
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Apply one event
    pub fn handle(self, event: TrackerEvent, ctx: &Context) -> (TrackerState, Vec<Effect>) {
        let mut effects = Vec::new();
        let state = self.apply(event, ctx, &mut effects);
        (state, effects)
    }

    fn apply(self, event: TrackerEvent, ctx: &Context, fx: &mut Vec<Effect>) -> TrackerState {
        match event {
            TrackerEvent::Navigated {
                tab_id,
                url,
                is_active_tab,
            } => self.observe(
                tab_id,
                &url,
                Observation {
                    focused: is_active_tab,
                    untracked_focus_stops: false,
                    untracked_stops: true,
                },
                ctx,
                fx,
            ),
            TrackerEvent::Activated { tab_id, url } => match url {
                Some(url) => self.observe(
                    tab_id,
                    &url,
                    Observation {
                        focused: true,
                        untracked_focus_stops: true,
                        untracked_stops: true,
                    },
                    ctx,
                    fx,
                ),
                None => self,
            },
            TrackerEvent::ActiveTabPolled { tab_id, url } => self.observe(
                tab_id,
                &url,
                Observation {
                    focused: true,
                    untracked_focus_stops: false,
                    untracked_stops: false,
                },
                ctx,
                fx,
            ),
            TrackerEvent::TabClosed { tab_id } => {
                if self.tracks_tab(tab_id) {
                    self.stop(ctx, fx)
                } else {
                    self
                }
            }
            TrackerEvent::ConsentChanged { granted } => {
                if granted {
                    fx.push(Effect::RecheckActiveTab);
                    self
                } else {
                    self.stop(ctx, fx)
                }
            }
            TrackerEvent::IntervalChanged { minutes } => {
                let eligible = self
                    .session
                    .as_ref()
                    .is_some_and(|s| !s.checkin_fired)
                    && !self.checkin_in_flight;
                if eligible && minutes >= 1 {
                    fx.push(Effect::ReconfigureReminder(interval_duration(minutes)));
                }
                self
            }
            TrackerEvent::Tick => self.tick(ctx, fx),
            TrackerEvent::ReminderDue { tab_url } => {
                if self.session.as_ref().is_some_and(|s| s.checkin_fired) {
                    self
                } else {
                    self.begin_checkin(tab_url, fx)
                }
            }
            TrackerEvent::CheckinRequested { tab_id, tab_url } => {
                if self.tracks_tab(tab_id) {
                    self.begin_checkin(tab_url, fx)
                } else {
                    self
                }
            }
            TrackerEvent::CheckinSettled {
                delivered,
                domain,
                started_at,
            } => {
                // A late settle from an earlier session must not touch this one's guard
                let current = self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.domain == domain && s.started_at == started_at);
                if delivered || !current {
                    self
                } else {
                    TrackerState {
                        checkin_in_flight: false,
                        ..self
                    }
                }
            }
            TrackerEvent::CheckinDismissed => TrackerState {
                checkin_in_flight: false,
                ..self
            },
            TrackerEvent::Restored { session, tab_url } => self.restore(session, tab_url, ctx, fx),
        }
    }

    fn tracks_tab(&self, tab_id: TabId) -> bool {
        self.session.as_ref().is_some_and(|s| s.tab_id == tab_id)
    }

    fn observe(
        self,
        tab_id: TabId,
        url: &str,
        obs: Observation,
        ctx: &Context,
        fx: &mut Vec<Effect>,
    ) -> TrackerState {
        if !ctx.settings.consent_granted {
            return self.stop(ctx, fx);
        }
        let classification = classify(url);
        let Some(current) = self.session.clone() else {
            return match classification {
                Some(c) => self.start(tab_id, c, ctx, fx),
                None => self,
            };
        };
        let same_tab = current.tab_id == tab_id;

        match classification {
            Some(c) if c.domain == current.domain => {
                if !same_tab && obs.focused {
                    let mut session = current;
                    session.tab_id = tab_id;
                    fx.push(Effect::PersistSession(session.clone()));
                    TrackerState {
                        session: Some(session),
                        ..self
                    }
                } else {
                    self
                }
            }
            Some(c) => {
                if same_tab || obs.focused {
                    self.stop(ctx, fx).start(tab_id, c, ctx, fx)
                } else {
                    self
                }
            }
            None => {
                let stops = (same_tab && obs.untracked_stops)
                    || (!same_tab && obs.focused && obs.untracked_focus_stops);
                if stops {
                    self.stop(ctx, fx)
                } else {
                    self
                }
            }
        }
    }

    fn start(
        self,
        tab_id: TabId,
        c: Classification,
        ctx: &Context,
        fx: &mut Vec<Effect>,
    ) -> TrackerState {
        let app_name = c.app_name();
        let session = Session::new(tab_id, c.domain.clone(), app_name, ctx.now);
        fx.push(Effect::PersistSession(session.clone()));
        fx.push(Effect::RecordUsage(UsageDelta::duration(
            ctx.now.date_naive(),
            c.domain,
            app_name,
            0.0,
        )));
        fx.push(Effect::ArmReminder(ctx.interval()));
        fx.push(Effect::StartTicker);
        TrackerState {
            session: Some(session),
            checkin_in_flight: false,
        }
    }

    fn stop(self, ctx: &Context, fx: &mut Vec<Effect>) -> TrackerState {
        let Some(session) = self.session.clone() else {
            return self;
        };
        fx.push(Effect::StopTicker);
        fx.push(Effect::DisarmReminder);
        let unsaved = session.unsaved_minutes(ctx.now);
        if unsaved > MIN_SAVE_MINUTES {
            fx.push(Effect::RecordUsage(UsageDelta::duration(
                ctx.now.date_naive(),
                session.domain.clone(),
                session.app_name.clone(),
                unsaved,
            )));
        }
        fx.push(Effect::ClearPersistedSession);
        TrackerState::default()
    }

    fn tick(self, ctx: &Context, fx: &mut Vec<Effect>) -> TrackerState {
        let Some(mut session) = self.session.clone() else {
            return self;
        };
        let unsaved = session.unsaved_minutes(ctx.now);
        if unsaved <= MIN_SAVE_MINUTES {
            return self;
        }
        fx.push(Effect::RecordUsage(UsageDelta::duration(
            ctx.now.date_naive(),
            session.domain.clone(),
            session.app_name.clone(),
            unsaved,
        )));
        session.last_saved_at = ctx.now;
        fx.push(Effect::PersistSession(session.clone()));
        TrackerState {
            session: Some(session),
            ..self
        }
    }

    /// Start a check-in for the session; it uses up the session's reminder
    fn begin_checkin(self, tab_url: Option<String>, fx: &mut Vec<Effect>) -> TrackerState {
        if self.checkin_in_flight {
            return self;
        }
        let Some(mut session) = self.session.clone() else {
            return self;
        };
        let still_tracked = tab_url.as_deref().and_then(classify).is_some();
        if !still_tracked {
            return self;
        }
        session.checkin_fired = true;
        fx.push(Effect::DisarmReminder);
        fx.push(Effect::PersistSession(session.clone()));
        fx.push(Effect::BeginCheckin(session.clone()));
        TrackerState {
            session: Some(session),
            checkin_in_flight: true,
        }
    }

    fn restore(
        self,
        session: Session,
        tab_url: Option<String>,
        ctx: &Context,
        fx: &mut Vec<Effect>,
    ) -> TrackerState {
        let eligible =
            ctx.settings.consent_granted && tab_url.as_deref().and_then(classify).is_some();
        if !eligible {
            fx.push(Effect::ClearPersistedSession);
            return TrackerState::default();
        }
        fx.push(Effect::StartTicker);
        if !session.checkin_fired {
            let elapsed = (ctx.now - session.started_at)
                .to_std()
                .unwrap_or(Duration::ZERO);
            let remaining = ctx
                .interval()
                .saturating_sub(elapsed)
                .max(MIN_REMINDER_DELAY);
            fx.push(Effect::ArmReminder(remaining));
        }
        TrackerState {
            session: Some(session),
            checkin_in_flight: self.checkin_in_flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const IG: &str = "https://www.instagram.com/x";
    const YT: &str = "https://www.youtube.com/watch?v=1";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap()
    }

    fn ctx_at(now: DateTime<Utc>) -> Context {
        Context::new(
            now,
            Settings {
                consent_granted: true,
                checkin_interval_minutes: 30,
            },
        )
    }

    fn nav(tab: i64, url: &str, active: bool) -> TrackerEvent {
        TrackerEvent::Navigated {
            tab_id: TabId(tab),
            url: url.to_string(),
            is_active_tab: active,
        }
    }

    fn settled(delivered: bool, started_at: DateTime<Utc>) -> TrackerEvent {
        TrackerEvent::CheckinSettled {
            delivered,
            domain: "instagram.com".to_string(),
            started_at,
        }
    }

    fn started(now: DateTime<Utc>) -> TrackerState {
        TrackerState::default().handle(nav(1, IG, true), &ctx_at(now)).0
    }

    #[test]
    fn test_navigation_to_tracked_site_starts_session() {
        let (state, fx) = TrackerState::default().handle(nav(1, IG, true), &ctx_at(t0()));
        let session = state.session.clone().expect("session");
        assert_eq!(session.domain, "instagram.com");
        assert_eq!(session.started_at, t0());
        assert_eq!(fx.len(), 4);
        assert_eq!(fx[0], Effect::PersistSession(session));
        assert!(matches!(&fx[1], Effect::RecordUsage(d) if d.duration_minutes == 0.0 && d.domain == "instagram.com"));
        assert_eq!(fx[2], Effect::ArmReminder(Duration::from_secs(1800)));
        assert_eq!(fx[3], Effect::StartTicker);
    }

    #[test]
    fn test_no_session_without_consent() {
        let mut ctx = ctx_at(t0());
        ctx.settings.consent_granted = false;
        let (state, fx) = TrackerState::default().handle(nav(1, IG, true), &ctx);
        assert!(state.session.is_none());
        assert!(fx.is_empty());
    }

    #[test]
    fn test_repeated_navigation_is_idempotent() {
        let state = started(t0());
        let later = t0() + chrono::Duration::seconds(5);
        let (next, fx) = state.clone().handle(nav(1, "https://instagram.com/reels", true), &ctx_at(later));
        assert_eq!(next, state);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_same_domain_other_focused_tab_retargets() {
        let state = started(t0());
        let (next, fx) = state.handle(nav(2, IG, true), &ctx_at(t0()));
        let session = next.session.unwrap();
        assert_eq!(session.tab_id, TabId(2));
        assert_eq!(session.started_at, t0());
        assert_eq!(fx, vec![Effect::PersistSession(session)]);
    }

    #[test]
    fn test_background_tab_does_not_steal_session() {
        let state = started(t0());
        let (next, fx) = state.clone().handle(nav(2, YT, false), &ctx_at(t0()));
        assert_eq!(next, state);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_domain_switch_flushes_and_restarts() {
        let state = started(t0());
        let later = t0() + chrono::Duration::minutes(2);
        let (next, fx) = state.handle(nav(1, YT, true), &ctx_at(later));
        let session = next.session.unwrap();
        assert_eq!(session.domain, "youtube.com");
        assert_eq!(session.started_at, later);
        assert!(fx.contains(&Effect::ClearPersistedSession));
        let flushed: Vec<_> = fx
            .iter()
            .filter_map(|e| match e {
                Effect::RecordUsage(d) if d.domain == "instagram.com" => Some(d.duration_minutes),
                _ => None,
            })
            .collect();
        assert_eq!(flushed.len(), 1);
        assert!((flushed[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_leaving_on_tracked_tab_stops() {
        let state = started(t0());
        let (next, fx) = state.handle(nav(1, "https://docs.rs", true), &ctx_at(t0()));
        assert!(next.session.is_none());
        assert!(fx.contains(&Effect::StopTicker));
        assert!(fx.contains(&Effect::DisarmReminder));
        assert!(fx.contains(&Effect::ClearPersistedSession));
    }

    #[test]
    fn test_activating_untracked_tab_stops() {
        let state = started(t0());
        let (next, _) = state.handle(
            TrackerEvent::Activated {
                tab_id: TabId(9),
                url: Some("https://crates.io".into()),
            },
            &ctx_at(t0()),
        );
        assert!(next.session.is_none());
    }

    #[test]
    fn test_poll_never_stops() {
        let state = started(t0());
        let (next, fx) = state.clone().handle(
            TrackerEvent::ActiveTabPolled {
                tab_id: TabId(1),
                url: "https://crates.io".into(),
            },
            &ctx_at(t0()),
        );
        assert_eq!(next, state);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_removing_other_tab_is_noop() {
        let state = started(t0());
        let (next, fx) = state
            .clone()
            .handle(TrackerEvent::TabClosed { tab_id: TabId(5) }, &ctx_at(t0()));
        assert_eq!(next, state);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_consent_revoked_tears_down() {
        let state = started(t0());
        let mut ctx = ctx_at(t0());
        ctx.settings.consent_granted = false;
        let (next, fx) = state.handle(TrackerEvent::ConsentChanged { granted: false }, &ctx);
        assert!(next.session.is_none());
        assert!(fx.contains(&Effect::ClearPersistedSession));
    }

    #[test]
    fn test_consent_granted_requests_recheck() {
        let (_, fx) = TrackerState::default()
            .handle(TrackerEvent::ConsentChanged { granted: true }, &ctx_at(t0()));
        assert_eq!(fx, vec![Effect::RecheckActiveTab]);
    }

    #[test]
    fn test_tick_records_increment_and_advances_baseline() {
        let state = started(t0());
        let later = t0() + chrono::Duration::seconds(30);
        let (next, fx) = state.handle(TrackerEvent::Tick, &ctx_at(later));
        assert_eq!(next.session.as_ref().unwrap().last_saved_at, later);
        assert!(matches!(&fx[0], Effect::RecordUsage(d) if (d.duration_minutes - 0.5).abs() < 1e-9));
        assert!(matches!(&fx[1], Effect::PersistSession(_)));
    }

    #[test]
    fn test_tick_below_threshold_is_skipped() {
        let state = started(t0());
        let later = t0() + chrono::Duration::milliseconds(300);
        let (next, fx) = state.clone().handle(TrackerEvent::Tick, &ctx_at(later));
        assert_eq!(next, state);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_tick_when_idle_is_noop() {
        let (next, fx) = TrackerState::default().handle(TrackerEvent::Tick, &ctx_at(t0()));
        assert!(next.session.is_none());
        assert!(fx.is_empty());
    }

    #[test]
    fn test_reminder_fires_once_and_sets_guard() {
        let state = started(t0());
        let due = TrackerEvent::ReminderDue {
            tab_url: Some(IG.into()),
        };
        let (next, fx) = state.handle(due.clone(), &ctx_at(t0()));
        assert!(next.checkin_in_flight);
        assert!(next.session.as_ref().unwrap().checkin_fired);
        assert!(matches!(fx.last(), Some(Effect::BeginCheckin(_))));

        let (_, fx) = next.handle(due, &ctx_at(t0()));
        assert!(fx.is_empty());
    }

    #[test]
    fn test_reminder_suppressed_when_tab_left_tracked_site() {
        let state = started(t0());
        let (next, fx) = state.handle(
            TrackerEvent::ReminderDue {
                tab_url: Some("https://docs.rs".into()),
            },
            &ctx_at(t0()),
        );
        assert!(!next.checkin_in_flight);
        assert!(fx.is_empty());

        let (_, fx) = next.handle(TrackerEvent::ReminderDue { tab_url: None }, &ctx_at(t0()));
        assert!(fx.is_empty());
    }

    #[test]
    fn test_failed_delivery_clears_guard_and_dismiss_clears_guard() {
        let state = started(t0());
        let (fired, _) = state.handle(
            TrackerEvent::ReminderDue {
                tab_url: Some(IG.into()),
            },
            &ctx_at(t0()),
        );
        let (delivered, _) = fired.clone().handle(settled(true, t0()), &ctx_at(t0()));
        assert!(delivered.checkin_in_flight);
        let (dismissed, _) = delivered.handle(TrackerEvent::CheckinDismissed, &ctx_at(t0()));
        assert!(!dismissed.checkin_in_flight);

        let (failed, _) = fired.handle(settled(false, t0()), &ctx_at(t0()));
        assert!(!failed.checkin_in_flight);
    }

    #[test]
    fn test_interval_change_reconfigures_before_fire_only() {
        let state = started(t0());
        let (state, fx) = state.handle(TrackerEvent::IntervalChanged { minutes: 10 }, &ctx_at(t0()));
        assert_eq!(fx, vec![Effect::ReconfigureReminder(Duration::from_secs(600))]);

        let (fired, _) = state.handle(
            TrackerEvent::ReminderDue {
                tab_url: Some(IG.into()),
            },
            &ctx_at(t0()),
        );
        let (dismissed, _) = fired.handle(TrackerEvent::CheckinDismissed, &ctx_at(t0()));
        let (_, fx) = dismissed.handle(TrackerEvent::IntervalChanged { minutes: 5 }, &ctx_at(t0()));
        assert!(fx.is_empty());
    }

    #[test]
    fn test_page_requested_checkin_only_for_tracked_tab() {
        let state = started(t0());
        let (same, fx) = state.clone().handle(
            TrackerEvent::CheckinRequested {
                tab_id: TabId(2),
                tab_url: Some(IG.into()),
            },
            &ctx_at(t0()),
        );
        assert_eq!(same, state);
        assert!(fx.is_empty());

        let (next, fx) = state.handle(
            TrackerEvent::CheckinRequested {
                tab_id: TabId(1),
                tab_url: Some(IG.into()),
            },
            &ctx_at(t0()),
        );
        assert!(next.checkin_in_flight);
        assert!(matches!(fx.last(), Some(Effect::BeginCheckin(_))));
    }

    #[test]
    fn test_restore_recomputes_remaining_delay() {
        let session = Session::new(TabId(4), "reddit.com", "Reddit", t0());
        let now = t0() + chrono::Duration::minutes(12);
        let (state, fx) = TrackerState::default().handle(
            TrackerEvent::Restored {
                session: session.clone(),
                tab_url: Some("https://www.reddit.com/r/rust".into()),
            },
            &ctx_at(now),
        );
        assert_eq!(state.session, Some(session));
        assert_eq!(
            fx,
            vec![
                Effect::StartTicker,
                Effect::ArmReminder(Duration::from_secs(18 * 60))
            ]
        );
    }

    #[test]
    fn test_restore_overdue_uses_one_minute_floor() {
        let session = Session::new(TabId(4), "reddit.com", "Reddit", t0());
        let now = t0() + chrono::Duration::minutes(45);
        let (_, fx) = TrackerState::default().handle(
            TrackerEvent::Restored {
                session,
                tab_url: Some("https://reddit.com".into()),
            },
            &ctx_at(now),
        );
        assert_eq!(fx[1], Effect::ArmReminder(MIN_REMINDER_DELAY));
    }

    #[test]
    fn test_restore_after_fire_does_not_rearm() {
        let mut session = Session::new(TabId(4), "reddit.com", "Reddit", t0());
        session.checkin_fired = true;
        let (_, fx) = TrackerState::default().handle(
            TrackerEvent::Restored {
                session,
                tab_url: Some("https://reddit.com".into()),
            },
            &ctx_at(t0()),
        );
        assert_eq!(fx, vec![Effect::StartTicker]);
    }

    #[test]
    fn test_restore_stale_tab_converges_to_idle() {
        let session = Session::new(TabId(4), "reddit.com", "Reddit", t0());
        let (state, fx) = TrackerState::default().handle(
            TrackerEvent::Restored {
                session: session.clone(),
                tab_url: None,
            },
            &ctx_at(t0()),
        );
        assert!(state.session.is_none());
        assert_eq!(fx, vec![Effect::ClearPersistedSession]);

        let (state, _) = TrackerState::default().handle(
            TrackerEvent::Restored {
                session,
                tab_url: Some("https://docs.rs".into()),
            },
            &ctx_at(t0()),
        );
        assert!(state.session.is_none());
    }

    #[test]
    fn test_page_requested_checkin_uses_up_the_reminder() {
        let state = started(t0());
        let (state, fx) = state.handle(
            TrackerEvent::CheckinRequested {
                tab_id: TabId(1),
                tab_url: Some(IG.into()),
            },
            &ctx_at(t0()),
        );
        assert_eq!(fx[0], Effect::DisarmReminder);
        let session = state.session.clone().unwrap();
        assert!(session.checkin_fired);

        let (state, _) = state.handle(TrackerEvent::CheckinDismissed, &ctx_at(t0()));
        let (state, fx) = state.handle(TrackerEvent::IntervalChanged { minutes: 10 }, &ctx_at(t0()));
        assert!(fx.is_empty());

        let (state, fx) = state.handle(
            TrackerEvent::ReminderDue {
                tab_url: Some(IG.into()),
            },
            &ctx_at(t0()),
        );
        assert!(fx.is_empty());
        assert!(!state.checkin_in_flight);

        // A restored process agrees: no reminder left to arm
        let (_, fx) = TrackerState::default().handle(
            TrackerEvent::Restored {
                session,
                tab_url: Some(IG.into()),
            },
            &ctx_at(t0()),
        );
        assert_eq!(fx, vec![Effect::StartTicker]);
    }

    #[test]
    fn test_page_can_ask_again_after_dismissal() {
        let request = TrackerEvent::CheckinRequested {
            tab_id: TabId(1),
            tab_url: Some(IG.into()),
        };
        let (state, _) = started(t0()).handle(request.clone(), &ctx_at(t0()));
        let (state, _) = state.handle(TrackerEvent::CheckinDismissed, &ctx_at(t0()));
        let (state, fx) = state.handle(request, &ctx_at(t0()));
        assert!(state.checkin_in_flight);
        assert!(matches!(fx.last(), Some(Effect::BeginCheckin(_))));
    }

    #[test]
    fn test_settle_from_earlier_session_is_ignored() {
        let first = started(t0());
        let (fired, _) = first.handle(
            TrackerEvent::ReminderDue {
                tab_url: Some(IG.into()),
            },
            &ctx_at(t0()),
        );
        let (fired, _) = fired.handle(TrackerEvent::CheckinDismissed, &ctx_at(t0()));

        // Leave and come back: a new session with its own check-in in flight
        let later = t0() + chrono::Duration::minutes(1);
        let (idle, _) = fired.handle(TrackerEvent::TabClosed { tab_id: TabId(1) }, &ctx_at(later));
        let (second, _) = idle.handle(nav(1, IG, true), &ctx_at(later));
        let (second, _) = second.handle(
            TrackerEvent::CheckinRequested {
                tab_id: TabId(1),
                tab_url: Some(IG.into()),
            },
            &ctx_at(later),
        );
        assert!(second.checkin_in_flight);

        let (still, fx) = second.clone().handle(settled(false, t0()), &ctx_at(later));
        assert!(still.checkin_in_flight);
        assert!(fx.is_empty());

        let (cleared, _) = second.handle(settled(false, later), &ctx_at(later));
        assert!(!cleared.checkin_in_flight);
    }
}
