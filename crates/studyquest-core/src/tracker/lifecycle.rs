use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Abstract app lifecycle signal.
///
/// Hosts adapt their platform notifications into this set at the boundary and
/// deliver them in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEvent {
    /// App is about to lose focus. Fires for app switches *and* screen locks.
    WillResignActive,
    DidBecomeActive,
    DidEnterBackground,
    WillEnterForeground,
    ScreenLocked,
    ScreenUnlocked,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 6] = [
        LifecycleEvent::WillResignActive,
        LifecycleEvent::DidBecomeActive,
        LifecycleEvent::DidEnterBackground,
        LifecycleEvent::WillEnterForeground,
        LifecycleEvent::ScreenLocked,
        LifecycleEvent::ScreenUnlocked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::WillResignActive => "will-resign-active",
            LifecycleEvent::DidBecomeActive => "did-become-active",
            LifecycleEvent::DidEnterBackground => "did-enter-background",
            LifecycleEvent::WillEnterForeground => "will-enter-foreground",
            LifecycleEvent::ScreenLocked => "screen-locked",
            LifecycleEvent::ScreenUnlocked => "screen-unlocked",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEvent {
    type Err = ValidationError;

    /// Accepts kebab-case, snake_case or camelCase spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        LifecycleEvent::ALL
            .into_iter()
            .find(|event| event.as_str().replace('-', "") == key)
            .ok_or_else(|| ValidationError::UnknownEvent(s.to_string()))
    }
}
