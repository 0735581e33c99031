//! Per-level privileges: feed post length and daily likes.

/// Longest post any level can write.
pub const MAX_POST_CHARACTERS: usize = 280;

/// Hard ceiling on daily likes.
pub const MAX_DAILY_LIKES: u32 = 1000;

/// `(first_level, characters)`, ascending. A band runs until the next one starts.
/// These boundaries are user-visible; keep them exact.
const POST_CHARACTER_BANDS: [(u32, usize); 10] = [
    (1, 3),
    (3, 5),
    (6, 10),
    (10, 20),
    (20, 40),
    (30, 60),
    (50, 100),
    (100, 140),
    (200, 200),
    (500, MAX_POST_CHARACTERS),
];

/// Maximum feed post length at `level`.
pub fn post_character_limit(level: u32) -> usize {
    POST_CHARACTER_BANDS
        .iter()
        .rev()
        .find(|(first_level, _)| level >= *first_level)
        .map(|&(_, chars)| chars)
        .unwrap_or(POST_CHARACTER_BANDS[0].1)
}

/// Likes a user may hand out per day at `level`.
///
/// `min(1000, floor(3 + 5·√L + 10·log10(L + 1)))`
pub fn daily_like_limit(level: u32) -> u32 {
    let l = level as f64;
    let raw = (3.0 + l.sqrt() * 5.0 + (l + 1.0).log10() * 10.0).floor();
    // `as` saturates, so huge levels cannot wrap.
    (raw as u32).min(MAX_DAILY_LIKES)
}
