mod lifecycle;
mod machine;

pub use lifecycle::LifecycleEvent;
pub use machine::{SessionTracker, TrackerConfig, TrackerNotice, TrackerPhase};
