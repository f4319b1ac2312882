//! Level-owned random number generator.
//!
//! Every random gameplay decision draws from the one PCG32 stream owned by
//! the level, so a level started with the same seed and input replays
//! identically.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

#[derive(Debug, Clone)]
pub struct GameRng {
    inner: Pcg32,
}

impl GameRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg32::seed_from_u64(seed),
        }
    }

    /// Seed from the wall clock, for runs that don't need to be reproducible.
    pub fn from_time() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        self.inner.random::<f32>()
    }

    /// Uniform in `[min, max)`. An empty range yields `min`.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.inner.random_range(min..max)
    }

    /// Uniform in `[min, max)`. An empty range yields `min`.
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.inner.random_range(min..max)
    }

    /// Uniform index below `len`; `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        if len <= 1 {
            return 0;
        }
        self.inner.random_range(0..len)
    }

    pub fn next_bool(&mut self) -> bool {
        self.inner.random_bool(0.5)
    }

    /// `value` scattered by up to `spread` in either direction.
    pub fn fast_float(&mut self, value: f32, spread: f32) -> f32 {
        value + self.range_f32(-spread, spread)
    }
}
