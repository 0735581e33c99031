//! Foreground/background/lock tracking.
//!
//! ## State Transitions
//!
//! ```text
//! Foregrounded --did-enter-background--> BackgroundCounting
//! BackgroundCounting --screen-locked--> BackgroundLocked
//! BackgroundLocked --screen-unlocked--> BackgroundCounting   (after did-enter-background)
//! BackgroundLocked --screen-unlocked--> Foregrounded         (otherwise)
//! (any) --did-become-active--> Foregrounded
//! ```
//!
//! The platform fires `will-resign-active` for both app switches and screen
//! locks, so only background time that is *not* covered by a lock counts as
//! suspect. Time is injected on every call; the tracker never reads a clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lifecycle::LifecycleEvent;

/// Where the app currently is, as far as suspect time is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerPhase {
    Foregrounded,
    /// Away from the app with the suspect clock running.
    BackgroundCounting,
    /// Device asleep or locked; suspect clock paused.
    BackgroundLocked,
}

/// Suspect-time budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Sessions with more suspect time than this are rejected.
    #[serde(default = "default_max_suspect_secs")]
    pub max_suspect_secs: u64,
    /// Fraction of the budget after which an advisory warning is raised.
    #[serde(default = "default_warning_ratio")]
    pub warning_ratio: f64,
}

fn default_max_suspect_secs() -> u64 {
    20
}

fn default_warning_ratio() -> f64 {
    0.5
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_suspect_secs: default_max_suspect_secs(),
            warning_ratio: default_warning_ratio(),
        }
    }
}

impl TrackerConfig {
    fn max_ms(&self) -> f64 {
        self.max_suspect_secs as f64 * 1000.0
    }

    fn warning_ms(&self) -> f64 {
        self.max_ms() * self.warning_ratio
    }
}

/// Result of a budget evaluation that the user should hear about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerNotice {
    /// Past the warning ratio; the session is still valid.
    Warning { suspect_secs: f64, limit_secs: u64 },
    /// Budget exceeded; the session will not be credited.
    Rejected { suspect_secs: f64, limit_secs: u64 },
}

impl TrackerNotice {
    pub fn is_rejection(&self) -> bool {
        matches!(self, TrackerNotice::Rejected { .. })
    }

    pub fn suspect_secs(&self) -> f64 {
        match self {
            TrackerNotice::Warning { suspect_secs, .. }
            | TrackerNotice::Rejected { suspect_secs, .. } => *suspect_secs,
        }
    }

    /// User-facing text quoting the measured suspect time.
    pub fn message(&self) -> String {
        match self {
            TrackerNotice::Warning {
                suspect_secs,
                limit_secs,
            } => format!(
                "You have been away from the app for {suspect_secs:.0}s. \
                 Sessions with more than {limit_secs}s away are not counted."
            ),
            TrackerNotice::Rejected {
                suspect_secs,
                limit_secs,
            } => format!(
                "Session not counted: you were away from the app for {suspect_secs:.0}s \
                 (limit {limit_secs}s)."
            ),
        }
    }
}

/// Per-session suspect-time state machine.
///
/// Created fresh (or [`reset_session`](Self::reset_session)) at every session
/// start. `exceeded` is sticky until the next reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTracker {
    config: TrackerConfig,
    phase: TrackerPhase,
    locked: bool,
    /// `DidEnterBackground` seen since the last `DidBecomeActive`.
    #[serde(default)]
    backgrounded: bool,
    /// Start of the running suspect count, if any.
    counting_since: Option<DateTime<Utc>>,
    suspect_ms: u64,
    exceeded: bool,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl SessionTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            phase: TrackerPhase::Foregrounded,
            locked: false,
            backgrounded: false,
            counting_since: None,
            suspect_ms: 0,
            exceeded: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn exceeded(&self) -> bool {
        self.exceeded
    }

    /// Finalized suspect time, excluding any running count.
    pub fn suspect_secs(&self) -> f64 {
        self.suspect_ms as f64 / 1000.0
    }

    /// Finalized suspect time plus the live count, for display. Does not mutate.
    pub fn current_suspect_secs(&self, now: DateTime<Utc>) -> f64 {
        let live = if self.locked {
            0
        } else {
            self.counting_since
                .map(|since| elapsed_ms(since, now))
                .unwrap_or(0)
        };
        (self.suspect_ms + live) as f64 / 1000.0
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Feed one lifecycle signal. Returns a notice when the signal finalized
    /// background time and the budget crossed a threshold.
    pub fn handle(&mut self, event: LifecycleEvent, now: DateTime<Utc>) -> Option<TrackerNotice> {
        tracing::debug!(%event, phase = ?self.phase, locked = self.locked, "lifecycle event");
        match event {
            LifecycleEvent::DidEnterBackground => {
                self.enter_background(now);
                None
            }
            LifecycleEvent::ScreenLocked => {
                self.lock(now);
                None
            }
            LifecycleEvent::ScreenUnlocked => {
                self.unlock(now);
                None
            }
            LifecycleEvent::DidBecomeActive => self.become_active(now),
            LifecycleEvent::WillResignActive | LifecycleEvent::WillEnterForeground => None,
        }
    }

    /// Flush any running count into the accumulator and evaluate the budget.
    ///
    /// Used when a session ends while the app is still in the background.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Option<TrackerNotice> {
        if self.phase == TrackerPhase::BackgroundCounting && !self.locked {
            self.flush(now);
            self.counting_since = Some(now);
        }
        self.evaluate()
    }

    /// Check the finalized suspect time against the budget.
    pub fn evaluate(&mut self) -> Option<TrackerNotice> {
        let suspect = self.suspect_ms as f64;
        if suspect > self.config.max_ms() {
            if !self.exceeded {
                tracing::warn!(
                    suspect_secs = self.suspect_secs(),
                    limit_secs = self.config.max_suspect_secs,
                    "suspect-time budget exceeded"
                );
            }
            self.exceeded = true;
            Some(TrackerNotice::Rejected {
                suspect_secs: self.suspect_secs(),
                limit_secs: self.config.max_suspect_secs,
            })
        } else if suspect > self.config.warning_ms() {
            Some(TrackerNotice::Warning {
                suspect_secs: self.suspect_secs(),
                limit_secs: self.config.max_suspect_secs,
            })
        } else {
            None
        }
    }

    /// Clear all accumulators and return to `Foregrounded`. Any unfinalized
    /// background timestamp is discarded.
    pub fn reset_session(&mut self) {
        self.phase = TrackerPhase::Foregrounded;
        self.locked = false;
        self.backgrounded = false;
        self.counting_since = None;
        self.suspect_ms = 0;
        self.exceeded = false;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter_background(&mut self, now: DateTime<Utc>) {
        self.backgrounded = true;
        if self.locked {
            self.phase = TrackerPhase::BackgroundLocked;
            return;
        }
        if self.phase == TrackerPhase::BackgroundCounting {
            // Duplicate signal; keep the original entry timestamp.
            return;
        }
        self.phase = TrackerPhase::BackgroundCounting;
        self.counting_since = Some(now);
    }

    fn lock(&mut self, now: DateTime<Utc>) {
        if self.phase == TrackerPhase::BackgroundCounting && !self.locked {
            self.flush(now);
        }
        self.counting_since = None;
        self.locked = true;
        self.phase = TrackerPhase::BackgroundLocked;
    }

    fn unlock(&mut self, now: DateTime<Utc>) {
        self.locked = false;
        if self.backgrounded {
            self.phase = TrackerPhase::BackgroundCounting;
            self.counting_since = Some(now);
        } else {
            // Locked and unlocked without leaving the app.
            self.phase = TrackerPhase::Foregrounded;
            self.counting_since = None;
        }
    }

    fn become_active(&mut self, now: DateTime<Utc>) -> Option<TrackerNotice> {
        if self.phase == TrackerPhase::BackgroundCounting && !self.locked {
            self.flush(now);
        }
        self.phase = TrackerPhase::Foregrounded;
        self.counting_since = None;
        self.locked = false;
        self.backgrounded = false;
        self.evaluate()
    }

    fn flush(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.counting_since.take() {
            self.suspect_ms = self.suspect_ms.saturating_add(elapsed_ms(since, now));
        }
    }
}

/// Milliseconds from `since` to `now`; a clock that went backwards counts as zero.
fn elapsed_ms(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - since).num_milliseconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn feed(
        tracker: &mut SessionTracker,
        events: &[LifecycleEvent],
        at: DateTime<Utc>,
    ) -> Option<TrackerNotice> {
        let mut last = None;
        for &event in events {
            last = tracker.handle(event, at);
        }
        last
    }

    #[test]
    fn app_switch_past_budget_is_rejected() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        feed(
            &mut tracker,
            &[LifecycleEvent::WillResignActive, LifecycleEvent::DidEnterBackground],
            start,
        );
        assert_eq!(tracker.phase(), TrackerPhase::BackgroundCounting);

        let notice = feed(
            &mut tracker,
            &[LifecycleEvent::DidBecomeActive],
            start + Duration::seconds(25),
        );
        assert!((tracker.suspect_secs() - 25.0).abs() < 1e-9);
        assert!(tracker.exceeded());
        assert!(notice.as_ref().is_some_and(TrackerNotice::is_rejection));
        assert!(notice.unwrap().message().contains("25s"));
        assert_eq!(tracker.phase(), TrackerPhase::Foregrounded);
    }

    #[test]
    fn locked_time_is_not_suspect() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        feed(
            &mut tracker,
            &[LifecycleEvent::WillResignActive, LifecycleEvent::ScreenLocked],
            start,
        );
        assert_eq!(tracker.phase(), TrackerPhase::BackgroundLocked);

        let later = start + Duration::seconds(25);
        let notice = feed(
            &mut tracker,
            &[LifecycleEvent::ScreenUnlocked, LifecycleEvent::DidBecomeActive],
            later,
        );
        assert_eq!(tracker.suspect_secs(), 0.0);
        assert!(!tracker.exceeded());
        assert!(notice.is_none());
    }

    #[test]
    fn unlock_without_background_does_not_count() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        feed(
            &mut tracker,
            &[LifecycleEvent::WillResignActive, LifecycleEvent::ScreenLocked],
            start,
        );
        tracker.handle(LifecycleEvent::ScreenUnlocked, start + Duration::seconds(5));
        assert_eq!(tracker.phase(), TrackerPhase::Foregrounded);
        assert_eq!(tracker.current_suspect_secs(start + Duration::seconds(60)), 0.0);

        let notice = tracker.handle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(60));
        assert!(notice.is_none());
        assert_eq!(tracker.suspect_secs(), 0.0);
        assert!(!tracker.exceeded());
    }

    #[test]
    fn unlock_after_locked_background_resumes_counting() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        feed(
            &mut tracker,
            &[LifecycleEvent::ScreenLocked, LifecycleEvent::DidEnterBackground],
            start,
        );
        tracker.handle(LifecycleEvent::ScreenUnlocked, start + Duration::seconds(300));
        assert_eq!(tracker.phase(), TrackerPhase::BackgroundCounting);

        tracker.handle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(304));
        assert!((tracker.suspect_secs() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn background_delivered_while_locked_stays_locked() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        feed(
            &mut tracker,
            &[
                LifecycleEvent::WillResignActive,
                LifecycleEvent::ScreenLocked,
                LifecycleEvent::DidEnterBackground,
            ],
            start,
        );
        assert_eq!(tracker.phase(), TrackerPhase::BackgroundLocked);
        assert_eq!(tracker.current_suspect_secs(start + Duration::seconds(60)), 0.0);
    }

    #[test]
    fn lock_keeps_time_already_accumulated() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        tracker.handle(LifecycleEvent::ScreenLocked, start + Duration::seconds(8));
        assert!((tracker.suspect_secs() - 8.0).abs() < 1e-9);

        // Ten minutes asleep do not count.
        let wake = start + Duration::seconds(608);
        tracker.handle(LifecycleEvent::ScreenUnlocked, wake);
        assert_eq!(tracker.phase(), TrackerPhase::BackgroundCounting);

        // Resumes from the existing total.
        tracker.handle(LifecycleEvent::DidBecomeActive, wake + Duration::seconds(3));
        assert!((tracker.suspect_secs() - 11.0).abs() < 1e-9);
        assert!(!tracker.exceeded());
    }

    #[test]
    fn accumulates_across_repeated_background_trips() {
        let mut tracker = SessionTracker::default();
        let mut now = t0();
        for _ in 0..3 {
            tracker.handle(LifecycleEvent::DidEnterBackground, now);
            now += Duration::seconds(8);
            tracker.handle(LifecycleEvent::DidBecomeActive, now);
            now += Duration::seconds(60);
        }
        assert!((tracker.suspect_secs() - 24.0).abs() < 1e-9);
        assert!(tracker.exceeded());
    }

    #[test]
    fn warning_between_half_and_full_budget() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        let notice = tracker.handle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(15));
        match notice {
            Some(TrackerNotice::Warning {
                suspect_secs,
                limit_secs,
            }) => {
                assert!((suspect_secs - 15.0).abs() < 1e-9);
                assert_eq!(limit_secs, 20);
            }
            other => panic!("expected warning, got {other:?}"),
        }
        assert!(!tracker.exceeded());
    }

    #[test]
    fn exactly_at_budget_is_not_rejected() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        tracker.handle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(20));
        assert!(!tracker.exceeded());
    }

    #[test]
    fn exceeded_is_sticky_until_reset() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        tracker.handle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(30));
        assert!(tracker.exceeded());

        tracker.handle(LifecycleEvent::DidEnterBackground, start + Duration::seconds(40));
        tracker.handle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(41));
        assert!(tracker.exceeded());

        tracker.reset_session();
        assert!(!tracker.exceeded());
        assert_eq!(tracker.suspect_secs(), 0.0);
        assert_eq!(tracker.phase(), TrackerPhase::Foregrounded);
    }

    #[test]
    fn current_suspect_time_includes_live_count_without_mutating() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        let live = tracker.current_suspect_secs(start + Duration::seconds(12));
        assert!((live - 12.0).abs() < 1e-9);
        assert_eq!(tracker.suspect_secs(), 0.0);
        assert_eq!(tracker.phase(), TrackerPhase::BackgroundCounting);
    }

    #[test]
    fn finalize_flushes_running_count() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        let notice = tracker.finalize(start + Duration::seconds(21));
        assert!(notice.is_some_and(|n| n.is_rejection()));
        assert!(tracker.exceeded());

        // A second finalize at the same instant adds nothing.
        tracker.finalize(start + Duration::seconds(21));
        assert!((tracker.suspect_secs() - 21.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_background_keeps_first_timestamp() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        tracker.handle(LifecycleEvent::DidEnterBackground, start + Duration::seconds(5));
        tracker.handle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(9));
        assert!((tracker.suspect_secs() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn backwards_clock_counts_as_zero() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        tracker.handle(LifecycleEvent::DidBecomeActive, start - Duration::seconds(30));
        assert_eq!(tracker.suspect_secs(), 0.0);
    }

    #[test]
    fn informational_events_do_not_change_phase() {
        let mut tracker = SessionTracker::default();
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        tracker.handle(LifecycleEvent::WillEnterForeground, start + Duration::seconds(2));
        assert_eq!(tracker.phase(), TrackerPhase::BackgroundCounting);
        tracker.handle(LifecycleEvent::WillResignActive, start + Duration::seconds(2));
        assert_eq!(tracker.phase(), TrackerPhase::BackgroundCounting);
    }

    #[test]
    fn custom_budget() {
        let mut tracker = SessionTracker::new(TrackerConfig {
            max_suspect_secs: 5,
            warning_ratio: 0.8,
        });
        let start = t0();
        tracker.handle(LifecycleEvent::DidEnterBackground, start);
        assert!(tracker
            .handle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(3))
            .is_none());
        tracker.handle(LifecycleEvent::DidEnterBackground, start + Duration::seconds(10));
        let notice = tracker.handle(LifecycleEvent::DidBecomeActive, start + Duration::seconds(13));
        assert!(notice.is_some_and(|n| n.is_rejection()));
    }
}
