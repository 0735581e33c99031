//! Property tests for the level curve and the per-level limits.

use proptest::prelude::*;
use studyquest_core::progression::{
    apply_experience, daily_like_limit, experience_required, post_character_limit,
    total_experience_for_level, trophy_for, MAX_DAILY_LIKES, MAX_POST_CHARACTERS,
};
use studyquest_core::UserProgress;

proptest! {
    #[test]
    fn requirement_is_strictly_increasing(level in 1u32..50_000) {
        prop_assert!(experience_required(level + 1) > experience_required(level));
    }

    #[test]
    fn total_is_prefix_sum_of_requirements(level in 1u32..2_000) {
        let lhs = total_experience_for_level(level + 1);
        let rhs = total_experience_for_level(level) + experience_required(level);
        prop_assert!((lhs - rhs).abs() <= 1e-9 * lhs.max(1.0));
    }

    #[test]
    fn applying_experience_keeps_progress_normalized(
        level in 1u32..500,
        start in 0.0f64..1.0,
        delta in 0.0f64..2_000_000.0,
    ) {
        let mut progress = UserProgress::new(level, start * experience_required(level));
        let change = apply_experience(&mut progress, delta).unwrap();

        prop_assert!(progress.is_normalized());
        prop_assert!(progress.experience < experience_required(progress.level));
        prop_assert!(progress.level >= level);
        prop_assert_eq!(change.after_level, progress.level);
    }

    #[test]
    fn experience_is_conserved_across_level_ups(
        level in 1u32..200,
        delta in 0.0f64..500_000.0,
    ) {
        let mut progress = UserProgress::new(level, 0.0);
        let before = progress.lifetime_experience();
        apply_experience(&mut progress, delta).unwrap();
        let after = progress.lifetime_experience();
        prop_assert!((after - before - delta).abs() <= 1e-6 * after.max(1.0));
    }

    #[test]
    fn like_limit_is_monotonic_and_capped(level in 0u32..1_000_000) {
        prop_assert!(daily_like_limit(level + 1) >= daily_like_limit(level));
        prop_assert!(daily_like_limit(level) <= MAX_DAILY_LIKES);
    }

    #[test]
    fn post_limit_is_monotonic_and_capped(level in 0u32..1_000) {
        prop_assert!(post_character_limit(level + 1) >= post_character_limit(level));
        prop_assert!(post_character_limit(level) <= MAX_POST_CHARACTERS);
    }

    #[test]
    fn trophy_never_downgrades(level in 1u32..20_000) {
        prop_assert!(trophy_for(level + 1) >= trophy_for(level));
    }
}

#[test]
fn scenario_thirty_seconds_at_level_one() {
    let mut progress = UserProgress::default();
    let change = apply_experience(&mut progress, 30.0).unwrap();
    assert_eq!(progress, UserProgress::new(1, 30.0));
    assert!(!change.leveled_up());
}

#[test]
fn scenario_seventy_seconds_levels_up_once() {
    assert_eq!(experience_required(1), 60.0);
    let mut progress = UserProgress::default();
    let change = apply_experience(&mut progress, 70.0).unwrap();
    assert_eq!(progress.level, 2);
    assert!((progress.experience - 10.0).abs() < 1e-9);
    assert!((experience_required(2) - 134.82).abs() < 0.01);
    assert_eq!(change.levels_gained(), 1);
}

#[test]
fn limits_reach_their_caps() {
    assert_eq!(daily_like_limit(1_000_000), MAX_DAILY_LIKES);
    assert_eq!(post_character_limit(500), MAX_POST_CHARACTERS);
    assert_eq!(post_character_limit(u32::MAX), MAX_POST_CHARACTERS);
}
