//! Progression model.
//!
//! Pure functions that turn validated study time into experience, levels,
//! trophies and per-level limits. Nothing in here touches storage or time.

mod curve;
mod limits;
mod trophy;

use serde::{Deserialize, Serialize};

pub use curve::{
    apply_experience, apply_experience_with, experience_required, total_experience_for_level,
    LevelChange, ProgressionConfig, BASE_EXPERIENCE_PER_LEVEL, CURVE_EXPONENT, CURVE_SCALE,
    MAX_LEVEL_STEPS,
};
pub use limits::{daily_like_limit, post_character_limit, MAX_DAILY_LIKES, MAX_POST_CHARACTERS};
pub use trophy::{next_trophy_milestone, trophy_for, Rank, Tier, Trophy, MILESTONE_STEP};

/// A user's level and the experience earned inside that level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub level: u32,
    pub experience: f64,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0.0,
        }
    }
}

impl UserProgress {
    pub fn new(level: u32, experience: f64) -> Self {
        Self { level, experience }
    }

    /// Experience needed to clear the current level.
    pub fn required(&self) -> f64 {
        experience_required(self.level)
    }

    /// 0.0 .. 1.0 progress within the current level.
    pub fn progress_fraction(&self) -> f64 {
        let required = self.required();
        if required <= 0.0 {
            return 0.0;
        }
        (self.experience / required).clamp(0.0, 1.0)
    }

    /// Experience still missing before the next level-up.
    pub fn remaining(&self) -> f64 {
        (self.required() - self.experience).max(0.0)
    }

    /// All experience ever earned, including cleared levels.
    pub fn lifetime_experience(&self) -> f64 {
        total_experience_for_level(self.level) + self.experience
    }

    pub fn trophy(&self) -> Option<Trophy> {
        trophy_for(self.level)
    }

    pub fn next_trophy_milestone(&self) -> u32 {
        next_trophy_milestone(self.level)
    }

    pub fn post_character_limit(&self) -> usize {
        post_character_limit(self.level)
    }

    pub fn daily_like_limit(&self) -> u32 {
        daily_like_limit(self.level)
    }

    /// Whether the normalization invariant holds.
    pub fn is_normalized(&self) -> bool {
        self.level >= 1 && self.experience >= 0.0 && self.experience < self.required()
    }
}
