// ============================================
// Exploration Randomness (探索随机源)
// ============================================
//
// Single injectable random source for the explore sub-score and the
// personalized feed shuffle. Seed it to make scores and orderings
// reproducible in tests.

use crate::config::EngineConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

pub struct ExploreSampler {
    rng: Mutex<StdRng>,
}

impl ExploreSampler {
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        match config.explore_seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Runs `f` with exclusive access to the generator.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Uniform draw in [0, 100).
    pub fn draw(&self) -> f64 {
        self.with_rng(|rng| rng.gen_range(0.0..100.0))
    }

    /// Uniform random permutation in place.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        self.with_rng(|rng| items.shuffle(rng));
    }
}

impl Default for ExploreSampler {
    fn default() -> Self {
        Self::from_entropy()
    }
}
