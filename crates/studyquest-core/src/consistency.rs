//! Study consistency heuristic.
//!
//! Scores how regular the gaps between study days are: `1 / (1 + σ)` over the
//! day-gaps, clamped to `[0, 1]`. This is an approximation, not an invariant.
//! Small samples are unreliable (two days give a single gap and σ = 0, which
//! would read as perfectly consistent), so fewer than
//! [`MIN_STUDY_DAYS`] distinct days score zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Distinct study days needed before a score is meaningful.
pub const MIN_STUDY_DAYS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// 0.0 (erratic or too little data) .. 1.0 (perfectly regular).
    pub score: f64,
    pub study_days: usize,
    /// Mean gap between study days; `None` below two days.
    pub mean_gap_days: Option<f64>,
}

/// Consistency score for a set of study days (order and duplicates ignored).
pub fn consistency_score(days: &[NaiveDate]) -> f64 {
    consistency_report(days).score
}

pub fn consistency_report(days: &[NaiveDate]) -> ConsistencyReport {
    let mut days = days.to_vec();
    days.sort_unstable();
    days.dedup();

    let gaps: Vec<f64> = days
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();

    let mean_gap_days = if gaps.is_empty() {
        None
    } else {
        Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
    };

    let score = match mean_gap_days {
        Some(mean) if days.len() >= MIN_STUDY_DAYS => {
            let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
            let score = 1.0 / (1.0 + variance.sqrt());
            if score.is_finite() {
                score.clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
        _ => 0.0,
    };

    ConsistencyReport {
        score,
        study_days: days.len(),
        mean_gap_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn too_few_days_score_zero() {
        assert_eq!(consistency_score(&[]), 0.0);
        assert_eq!(consistency_score(&[day(1)]), 0.0);
        assert_eq!(consistency_score(&[day(1), day(2)]), 0.0);
    }

    #[test]
    fn daily_study_is_perfect() {
        let days: Vec<_> = (1..=7).map(day).collect();
        assert_eq!(consistency_score(&days), 1.0);
    }

    #[test]
    fn every_other_day_is_also_regular() {
        let days = [day(1), day(3), day(5), day(7)];
        assert_eq!(consistency_score(&days), 1.0);
    }

    #[test]
    fn irregular_gaps_score_lower() {
        let regular = consistency_score(&[day(1), day(2), day(3), day(4)]);
        let erratic = consistency_score(&[day(1), day(2), day(10), day(11)]);
        assert!(erratic < regular);
        assert!(erratic > 0.0);
    }

    #[test]
    fn duplicates_and_order_are_ignored() {
        let a = consistency_score(&[day(5), day(1), day(3), day(3)]);
        let b = consistency_score(&[day(1), day(3), day(5)]);
        assert_eq!(a, b);
    }

    #[test]
    fn report_carries_mean_gap() {
        let report = consistency_report(&[day(1), day(4)]);
        assert_eq!(report.study_days, 2);
        assert_eq!(report.mean_gap_days, Some(3.0));
        assert_eq!(report.score, 0.0);
    }
}
