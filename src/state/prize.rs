//! Prize ladder and safe-haven checkpoints

use crate::types::PrizeLevel;

pub const MAX_LEVEL: u32 = 15;

/// Prize for answering each level correctly, index 0 = level 1
const PRIZE_LADDER: [u64; MAX_LEVEL as usize] = [
    1_000, 2_000, 3_000, 5_000, 10_000, 20_000, 40_000, 80_000, 160_000, 320_000, 640_000,
    1_250_000, 2_500_000, 5_000_000, 10_000_000,
];

/// (checkpoint level, guaranteed amount), sorted by level
pub const SAFE_HAVENS: &[(u32, u64)] = &[(5, 10_000), (10, 320_000)];

/// Prize banked by answering `level` correctly
pub fn prize_for(level: u32) -> Option<u64> {
    let index = level.checked_sub(1)? as usize;
    PRIZE_LADDER.get(index).copied()
}

/// Amount kept when failing or quitting while at `level`.
///
/// A checkpoint only counts once the player is strictly past it: being *at*
/// level 5 still means level 5 has not been answered.
pub fn safe_score(level: u32) -> u64 {
    SAFE_HAVENS
        .iter()
        .filter(|(checkpoint, _)| level > *checkpoint)
        .map(|(_, amount)| *amount)
        .max()
        .unwrap_or(0)
}

pub fn is_safe_haven(level: u32) -> bool {
    SAFE_HAVENS.iter().any(|(l, _)| *l == level)
}

/// Full ladder for display, level 1 first
pub fn ladder() -> Vec<PrizeLevel> {
    (1..=MAX_LEVEL)
        .zip(PRIZE_LADDER.iter())
        .map(|(level, &amount)| PrizeLevel {
            level,
            amount,
            safe_haven: is_safe_haven(level),
        })
        .collect()
}
