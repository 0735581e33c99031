//! Study session controller.
//!
//! Owns the clock and the suspect-time tracker for one session at a time and
//! is the only place that credits experience to a [`UserProgress`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running --(stop | force_stop)--> Idle
//! ```
//!
//! `start` while running and `stop`/`force_stop` while idle are no-ops that
//! return `None`, so duplicate UI triggers are harmless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clock::SessionClock;
use crate::events::Event;
use crate::progression::{apply_experience_with, trophy_for, ProgressionConfig, UserProgress};
use crate::tracker::{LifecycleEvent, SessionTracker, TrackerConfig, TrackerNotice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
}

/// Outcome of a finished session, handed to the host and to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub experience_gained: f64,
    pub before_level: u32,
    pub after_level: u32,
    pub leveled_up: bool,
    /// Suspect-time budget was exceeded and nothing was credited.
    pub rejected: bool,
    /// Ended through `force_stop`, which credits regardless of the budget.
    pub forced: bool,
    pub suspect_secs: f64,
    /// User-facing rejection or warning text.
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopMode {
    Normal,
    Forced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActiveSession {
    id: Uuid,
    started_at: DateTime<Utc>,
}

/// Session lifecycle controller.
///
/// Serializable so a host can park a running session between process runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionController {
    #[serde(default)]
    active: Option<ActiveSession>,
    #[serde(default)]
    clock: SessionClock,
    #[serde(default)]
    tracker: SessionTracker,
    #[serde(default)]
    progression: ProgressionConfig,
    #[serde(skip)]
    outbox: Vec<Event>,
}

impl SessionController {
    pub fn new(tracker: TrackerConfig, progression: ProgressionConfig) -> Self {
        Self {
            active: None,
            clock: SessionClock::new(),
            tracker: SessionTracker::new(tracker),
            progression,
            outbox: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::Running
        } else {
            SessionState::Idle
        }
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|a| a.id)
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.clock.elapsed_secs()
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Suspect time including any live background count. Does not mutate.
    pub fn current_suspect_secs(&self, now: DateTime<Utc>) -> f64 {
        self.tracker.current_suspect_secs(now)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            state: self.state(),
            session_id: self.session_id(),
            elapsed_secs: self.clock.elapsed_secs(),
            tracker_phase: self.tracker.phase(),
            suspect_secs: self.tracker.current_suspect_secs(now),
            exceeded: self.tracker.exceeded(),
            at: now,
        }
    }

    /// Take every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.active.is_some() {
            return None;
        }
        let id = Uuid::new_v4();
        self.tracker.reset_session();
        self.clock.start(now);
        self.active = Some(ActiveSession { id, started_at: now });
        tracing::info!(session_id = %id, "study session started");

        let event = Event::SessionStarted { session_id: id, at: now };
        self.outbox.push(event.clone());
        Some(event)
    }

    /// Cooperative one-second tick.
    pub fn tick(&mut self) {
        if self.active.is_some() {
            self.clock.tick();
        }
    }

    /// Wall-clock catch-up for hosts that cannot tick every second.
    pub fn advance_to(&mut self, now: DateTime<Utc>) {
        if self.active.is_some() {
            self.clock.advance_to(now);
        }
    }

    /// Forward a lifecycle signal to the tracker. Ignored while idle.
    pub fn handle_lifecycle(
        &mut self,
        event: LifecycleEvent,
        now: DateTime<Utc>,
    ) -> Option<TrackerNotice> {
        let session_id = self.session_id()?;
        let notice = self.tracker.handle(event, now)?;
        self.outbox.push(notice_event(session_id, &notice, now));
        Some(notice)
    }

    /// Clear the tracker's accumulators without touching the clock.
    pub fn reset_session(&mut self, now: DateTime<Utc>) {
        self.tracker.reset_session();
        self.outbox.push(Event::TrackerReset { at: now });
    }

    /// End the session, crediting it only if the suspect-time budget held.
    ///
    /// Returns `None` while idle. A rejected session leaves `progress`
    /// untouched and comes back with `rejected: true`. So does a session whose
    /// duration the level curve refuses to credit; its message carries the
    /// progression error.
    pub fn stop(
        &mut self,
        progress: &mut UserProgress,
        now: DateTime<Utc>,
    ) -> Option<SessionResult> {
        self.finish(progress, now, StopMode::Normal)
    }

    /// Emergency stop (e.g. app termination) that always credits the elapsed
    /// time, even when the suspect-time budget was exceeded.
    ///
    /// This differs from [`stop`](Self::stop) on purpose; results carry
    /// `forced: true` so hosts can tell the two apart.
    pub fn force_stop(
        &mut self,
        progress: &mut UserProgress,
        now: DateTime<Utc>,
    ) -> Option<SessionResult> {
        self.finish(progress, now, StopMode::Forced)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish(
        &mut self,
        progress: &mut UserProgress,
        now: DateTime<Utc>,
        mode: StopMode,
    ) -> Option<SessionResult> {
        let active = self.active.take()?;

        let final_notice = self.tracker.finalize(now);
        let duration_secs = self.clock.stop();
        let suspect_secs = self.tracker.suspect_secs();
        let exceeded = self.tracker.exceeded();
        self.tracker.reset_session();

        let forced = mode == StopMode::Forced;
        let rejected = Rejected {
            active: &active,
            ended_at: now,
            duration_secs,
            level: progress.level,
            forced,
            suspect_secs,
        };

        if exceeded && !forced {
            let message = final_notice
                .filter(TrackerNotice::is_rejection)
                .map(|n| n.message());
            tracing::warn!(
                session_id = %active.id,
                duration_secs,
                suspect_secs,
                "study session rejected"
            );
            return Some(self.reject(rejected, message));
        }

        if exceeded {
            tracing::warn!(
                session_id = %active.id,
                suspect_secs,
                "force-stop credited a session over the suspect-time budget"
            );
        }

        let trophy_before = trophy_for(progress.level);
        let credited = apply_experience_with(progress, duration_secs as f64, &self.progression);
        let change = match credited {
            Ok(change) => change,
            Err(err) => {
                // `progress` is untouched; record the session as uncredited.
                tracing::error!(
                    session_id = %active.id,
                    duration_secs,
                    error = %err,
                    "study session could not be credited"
                );
                return Some(self.reject(rejected, Some(format!("Session not counted: {err}"))));
            }
        };

        tracing::info!(
            session_id = %active.id,
            duration_secs,
            level = change.after_level,
            forced,
            "study session completed"
        );
        self.outbox.push(Event::SessionCompleted {
            session_id: active.id,
            duration_secs,
            experience_gained: change.experience_gained,
            forced,
            at: now,
        });

        if change.leveled_up() {
            let trophy = trophy_for(change.after_level);
            tracing::info!(
                from = change.before_level,
                to = change.after_level,
                "level up"
            );
            self.outbox.push(Event::LevelUp {
                session_id: active.id,
                from_level: change.before_level,
                to_level: change.after_level,
                trophy,
                trophy_changed: trophy != trophy_before,
                at: now,
            });
        }

        let message = final_notice.map(|n| n.message());

        Some(SessionResult {
            session_id: active.id,
            started_at: active.started_at,
            ended_at: now,
            duration_secs,
            experience_gained: change.experience_gained,
            before_level: change.before_level,
            after_level: change.after_level,
            leveled_up: change.leveled_up(),
            rejected: false,
            forced,
            suspect_secs,
            message,
        })
    }

    fn reject(&mut self, session: Rejected<'_>, message: Option<String>) -> SessionResult {
        self.outbox.push(Event::SessionRejected {
            session_id: session.active.id,
            duration_secs: session.duration_secs,
            suspect_secs: session.suspect_secs,
            at: session.ended_at,
        });
        SessionResult {
            session_id: session.active.id,
            started_at: session.active.started_at,
            ended_at: session.ended_at,
            duration_secs: session.duration_secs,
            experience_gained: 0.0,
            before_level: session.level,
            after_level: session.level,
            leveled_up: false,
            rejected: true,
            forced: session.forced,
            suspect_secs: session.suspect_secs,
            message,
        }
    }
}

/// What is known about a session that ends without credit.
struct Rejected<'a> {
    active: &'a ActiveSession,
    ended_at: DateTime<Utc>,
    duration_secs: u64,
    level: u32,
    forced: bool,
    suspect_secs: f64,
}

fn notice_event(session_id: Uuid, notice: &TrackerNotice, at: DateTime<Utc>) -> Event {
    match *notice {
        TrackerNotice::Warning {
            suspect_secs,
            limit_secs,
        } => Event::SuspectWarning {
            session_id,
            suspect_secs,
            limit_secs,
            at,
        },
        TrackerNotice::Rejected {
            suspect_secs,
            limit_secs,
        } => Event::SuspectBudgetExceeded {
            session_id,
            suspect_secs,
            limit_secs,
            at,
        },
    }
}
