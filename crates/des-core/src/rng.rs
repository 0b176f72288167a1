//! Deterministic per-element RNG.
//!
//! # Determinism strategy
//!
//! Each element gets its own independent `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (element_id * MIXING_CONSTANT)
//!
//! Elements never share RNG state, so sampled activity durations do not
//! depend on which worker thread happened to run an event first.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::ElementId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

// ── ElementRng ────────────────────────────────────────────────────────────────

/// Per-element deterministic RNG, stored inside the element's locked state.
pub struct ElementRng(SmallRng);

impl ElementRng {
    /// Seed deterministically from the run's global seed and an element id.
    pub fn new(global_seed: u64, element: ElementId) -> Self {
        let seed = global_seed ^ (element.0 as u64).wrapping_mul(MIXING_CONSTANT);
        ElementRng(SmallRng::seed_from_u64(seed))
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }
}
