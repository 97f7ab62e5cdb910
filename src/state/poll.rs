//! Simulated audience poll for the audience-poll lifeline

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

use crate::types::{OptionLabel, PollDistribution};

/// Share of the vote the correct option receives, inclusive
pub const CORRECT_SHARE_RANGE: std::ops::RangeInclusive<u32> = 45..=75;

/// Generate percentages for A-D that sum to exactly 100, biased toward `correct`.
///
/// The remainder is cut twice at random and the three parts are shuffled
/// before being handed to the wrong options.
pub fn audience_poll<R: Rng + ?Sized>(correct: OptionLabel, rng: &mut R) -> PollDistribution {
    let correct_pct = rng.random_range(CORRECT_SHARE_RANGE);
    let remaining = 100 - correct_pct;

    let first = rng.random_range(0..=remaining);
    let second = rng.random_range(0..=remaining - first);
    let mut splits = [first, second, remaining - first - second];
    splits.shuffle(rng);

    let mut shares = BTreeMap::new();
    shares.insert(correct, correct_pct);
    for (label, share) in OptionLabel::ALL
        .iter()
        .filter(|&&label| label != correct)
        .zip(splits)
    {
        shares.insert(*label, share);
    }

    PollDistribution(shares)
}
