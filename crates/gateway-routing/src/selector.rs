//! Weighted random ordering.
//!
//! Produces a permutation of the candidate channels where each position is
//! drawn in proportion to the remaining channels' weights, so heavier channels
//! tend to come first but every channel appears exactly once.

use std::fmt;

use gateway_core::Channel;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform random integers
pub trait RandomSource: Send + Sync {
    /// Uniform value in `0..upper`; `upper` is always at least 1
    fn below(&self, upper: u64) -> u64;
}

/// Thread-local RNG, used in production
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&self, upper: u64) -> u64 {
        rand::thread_rng().gen_range(0..upper.max(1))
    }
}

/// Deterministic RNG for reproducible orderings
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a source from a fixed seed
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl fmt::Debug for SeededRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededRandom").finish_non_exhaustive()
    }
}

impl RandomSource for SeededRandom {
    fn below(&self, upper: u64) -> u64 {
        self.rng.lock().gen_range(0..upper.max(1))
    }
}

/// Order channels by weighted draw without replacement.
///
/// Weights are coerced to at least 1. Empty input yields empty output and a
/// single channel is returned as-is.
pub fn weighted_order(channels: Vec<Channel>, random: &dyn RandomSource) -> Vec<Channel> {
    let mut remaining = channels;
    let mut ordered = Vec::with_capacity(remaining.len());

    while remaining.len() > 1 {
        let total: u64 = remaining
            .iter()
            .map(|c| u64::from(c.effective_weight()))
            .sum();
        let roll = random.below(total);

        let mut cumulative = 0u64;
        let mut chosen = remaining.len() - 1;
        for (idx, channel) in remaining.iter().enumerate() {
            cumulative += u64::from(channel.effective_weight());
            if roll < cumulative {
                chosen = idx;
                break;
            }
        }
        ordered.push(remaining.remove(chosen));
    }

    ordered.append(&mut remaining);
    ordered
}
