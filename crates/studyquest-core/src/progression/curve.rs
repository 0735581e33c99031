//! Experience curve and level normalization.
//!
//! One second of validated study is worth one unit of experience. The
//! experience needed to clear a level grows super-linearly:
//!
//! ```text
//! required(L) = 50·L + 10·L^1.8
//! ```
//!
//! `UserProgress::experience` holds only what was earned inside the current
//! level, so `experience < required(level)` after every [`apply_experience`].

use serde::{Deserialize, Serialize};

use super::UserProgress;
use crate::error::{ProgressionError, Result, ValidationError};

/// Linear term of the curve.
pub const BASE_EXPERIENCE_PER_LEVEL: f64 = 50.0;
/// Exponent of the super-linear term.
pub const CURVE_EXPONENT: f64 = 1.8;
/// Scale of the super-linear term.
pub const CURVE_SCALE: f64 = 10.0;
/// Upper bound on level-ups granted by a single delta.
pub const MAX_LEVEL_STEPS: u32 = 100_000;

/// Tunables for level normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Refuse deltas that would need more level-ups than this.
    #[serde(default = "default_max_level_steps")]
    pub max_level_steps: u32,
}

fn default_max_level_steps() -> u32 {
    MAX_LEVEL_STEPS
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            max_level_steps: MAX_LEVEL_STEPS,
        }
    }
}

/// Outcome of crediting experience to a [`UserProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelChange {
    pub before_level: u32,
    pub after_level: u32,
    pub experience_gained: f64,
}

impl LevelChange {
    pub fn leveled_up(&self) -> bool {
        self.after_level > self.before_level
    }

    pub fn levels_gained(&self) -> u32 {
        self.after_level.saturating_sub(self.before_level)
    }
}

/// Experience needed to advance from `level` to `level + 1`.
pub fn experience_required(level: u32) -> f64 {
    let l = level as f64;
    l * BASE_EXPERIENCE_PER_LEVEL + l.powf(CURVE_EXPONENT) * CURVE_SCALE
}

/// Cumulative experience spent to reach `level` from level 1.
///
/// `total_experience_for_level(1) == 0`.
pub fn total_experience_for_level(level: u32) -> f64 {
    (1..level).map(experience_required).sum()
}

/// Credit `delta_secs` of study to `progress` with the default step cap.
///
/// # Errors
/// Returns a validation error for negative or non-finite deltas and a
/// progression error if the delta would need more than [`MAX_LEVEL_STEPS`]
/// level-ups. On error `progress` is left untouched.
pub fn apply_experience(progress: &mut UserProgress, delta_secs: f64) -> Result<LevelChange> {
    apply_experience_with(progress, delta_secs, &ProgressionConfig::default())
}

/// Credit `delta_secs` of study to `progress`, normalizing the level.
///
/// The loop runs on local copies and commits to `progress` only when it
/// terminates within `config.max_level_steps`.
pub fn apply_experience_with(
    progress: &mut UserProgress,
    delta_secs: f64,
    config: &ProgressionConfig,
) -> Result<LevelChange> {
    if !delta_secs.is_finite() || delta_secs < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "delta_secs".into(),
            message: format!("expected a finite, non-negative number of seconds, got {delta_secs}"),
        }
        .into());
    }

    let before_level = progress.level.max(1);
    let mut level = before_level;
    // f64::max drops NaN, so a corrupted stored value restarts at zero.
    let mut experience = progress.experience.max(0.0) + delta_secs;
    let mut steps: u32 = 0;

    loop {
        let required = experience_required(level);
        if experience < required {
            break;
        }
        if steps >= config.max_level_steps {
            return Err(ProgressionError::RunawayLevelGrowth {
                level: before_level,
                delta: delta_secs,
                max_steps: config.max_level_steps,
            }
            .into());
        }
        experience -= required;
        level = level
            .checked_add(1)
            .ok_or(ProgressionError::LevelOverflow(level))?;
        steps += 1;
    }

    progress.level = level;
    progress.experience = experience;

    Ok(LevelChange {
        before_level,
        after_level: level,
        experience_gained: delta_secs,
    })
}
