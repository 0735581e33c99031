use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progression::Trophy;
use crate::session::SessionState;
use crate::tracker::TrackerPhase;

/// Every observable change in a study session produces an Event.
/// Hosts pull them with `SessionController::drain_events`; nothing is pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    /// Suspect time passed the warning ratio; the session still counts.
    SuspectWarning {
        session_id: Uuid,
        suspect_secs: f64,
        limit_secs: u64,
        at: DateTime<Utc>,
    },
    /// Suspect time passed the budget; the session will not be credited by `stop`.
    SuspectBudgetExceeded {
        session_id: Uuid,
        suspect_secs: f64,
        limit_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: Uuid,
        duration_secs: u64,
        experience_gained: f64,
        forced: bool,
        at: DateTime<Utc>,
    },
    SessionRejected {
        session_id: Uuid,
        duration_secs: u64,
        suspect_secs: f64,
        at: DateTime<Utc>,
    },
    LevelUp {
        session_id: Uuid,
        from_level: u32,
        to_level: u32,
        trophy: Option<Trophy>,
        /// Set when the level-up crossed into a new tier or rank.
        trophy_changed: bool,
        at: DateTime<Utc>,
    },
    TrackerReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        session_id: Option<Uuid>,
        elapsed_secs: u64,
        tracker_phase: TrackerPhase,
        suspect_secs: f64,
        exceeded: bool,
        at: DateTime<Utc>,
    },
}
