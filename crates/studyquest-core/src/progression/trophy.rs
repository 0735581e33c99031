//! Trophy classification.
//!
//! Ten tiers over contiguous, non-overlapping level ranges. Each tier is split
//! into three ranks by two interior thresholds: rank I is the entry band and
//! rank III the top band of the tier.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
    Grandmaster,
    Legend,
    Mythic,
    Eternal,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
            Tier::Diamond => "Diamond",
            Tier::Master => "Master",
            Tier::Grandmaster => "Grandmaster",
            Tier::Legend => "Legend",
            Tier::Mythic => "Mythic",
            Tier::Eternal => "Eternal",
        }
    }

    /// First level that belongs to this tier.
    pub fn first_level(self) -> u32 {
        band_for_tier(self).first_level
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    I,
    II,
    III,
}

impl Rank {
    pub fn label(self) -> &'static str {
        match self {
            Rank::I => "I",
            Rank::II => "II",
            Rank::III => "III",
        }
    }
}

/// A tier and the rank inside it. Always derived from a level, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Trophy {
    pub tier: Tier,
    pub rank: Rank,
}

impl fmt::Display for Trophy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tier.label(), self.rank.label())
    }
}

struct TierBand {
    tier: Tier,
    first_level: u32,
    last_level: u32,
    rank_ii_from: u32,
    rank_iii_from: u32,
}

const fn band(
    tier: Tier,
    first_level: u32,
    last_level: u32,
    rank_ii_from: u32,
    rank_iii_from: u32,
) -> TierBand {
    TierBand {
        tier,
        first_level,
        last_level,
        rank_ii_from,
        rank_iii_from,
    }
}

/// Inclusive level ranges, ascending. Eternal is open-ended.
const TIER_BANDS: [TierBand; 10] = [
    band(Tier::Bronze, 1, 9, 4, 7),
    band(Tier::Silver, 10, 29, 17, 24),
    band(Tier::Gold, 30, 59, 40, 50),
    band(Tier::Platinum, 60, 99, 74, 87),
    band(Tier::Diamond, 100, 199, 134, 167),
    band(Tier::Master, 200, 399, 267, 334),
    band(Tier::Grandmaster, 400, 699, 500, 600),
    band(Tier::Legend, 700, 999, 800, 900),
    band(Tier::Mythic, 1000, 4999, 2334, 3667),
    band(Tier::Eternal, 5000, u32::MAX, 10_000, 20_000),
];

/// Fixed milestones: every tier entry above Bronze.
const FIXED_MILESTONES: [u32; 9] = [10, 30, 60, 100, 200, 400, 700, 1000, 5000];

/// Milestone spacing past the last fixed milestone.
pub const MILESTONE_STEP: u32 = 5000;

fn band_for_tier(tier: Tier) -> &'static TierBand {
    // Indexed by discriminant; TIER_BANDS is declared in Tier order.
    &TIER_BANDS[tier as usize]
}

/// Trophy for `level`, or `None` for the invalid level 0.
pub fn trophy_for(level: u32) -> Option<Trophy> {
    let band = TIER_BANDS
        .iter()
        .find(|b| (b.first_level..=b.last_level).contains(&level))?;

    let rank = if level >= band.rank_iii_from {
        Rank::III
    } else if level >= band.rank_ii_from {
        Rank::II
    } else {
        Rank::I
    };

    Some(Trophy {
        tier: band.tier,
        rank,
    })
}

/// Smallest milestone level strictly above `level`.
///
/// Saturates at `u32::MAX` for levels past the last representable milestone.
pub fn next_trophy_milestone(level: u32) -> u32 {
    if let Some(&milestone) = FIXED_MILESTONES.iter().find(|&&m| m > level) {
        return milestone;
    }

    let last_fixed = FIXED_MILESTONES[FIXED_MILESTONES.len() - 1];
    let steps = (level - last_fixed) / MILESTONE_STEP + 1;
    steps
        .checked_mul(MILESTONE_STEP)
        .and_then(|offset| last_fixed.checked_add(offset))
        .unwrap_or(u32::MAX)
}
