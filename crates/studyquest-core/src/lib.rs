//! # StudyQuest Core Library
//!
//! Core logic for a gamified study-session tracker. A study session earns one
//! experience point per active second; experience feeds a steep level curve,
//! and levels unlock trophies and posting privileges. Sessions during which
//! the app spends too long in the background without the screen being locked
//! are rejected and earn nothing.
//!
//! ## Architecture
//!
//! - **Tracker**: lifecycle-signal state machine measuring suspect time
//! - **Session**: clock, controller, per-user service and a tokio driver that
//!   ticks the clock once a second
//! - **Progression**: level curve, trophies, post and like limits
//! - **Storage**: SQLite progress and session history, TOML configuration
//!
//! Time is always passed in by the caller, so every state machine here is
//! deterministic under test.
//!
//! ## Key Components
//!
//! - [`SessionController`]: one study session from start to reward
//! - [`SessionTracker`]: suspect-time accounting
//! - [`UserProgress`]: level and experience
//! - [`Database`]: progress and history persistence
//! - [`Config`]: application configuration management

pub mod consistency;
pub mod error;
pub mod events;
pub mod progression;
pub mod session;
pub mod storage;
pub mod tracker;

pub use consistency::{consistency_score, ConsistencyReport};
pub use error::{ConfigError, CoreError, DatabaseError, ProgressionError, ValidationError};
pub use events::Event;
pub use progression::{LevelChange, ProgressionConfig, Tier, Trophy, UserProgress};
pub use session::{SessionController, SessionHandle, SessionResult, SessionService, SessionState};
pub use storage::{Config, Database, ProgressStore};
pub use tracker::{LifecycleEvent, SessionTracker, TrackerConfig, TrackerNotice, TrackerPhase};
