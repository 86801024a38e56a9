//! Deterministic random stream for level generation and game logic.

use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seeded random stream shared by the generator and game variants.
///
/// Two streams built from the same seed emit identical draws, so every
/// consumer must pull from the episode's single stream in a fixed order.
pub struct LevelRng {
    inner: ChaCha8Rng,
}

impl LevelRng {
    /// Builds a stream from a level seed.
    #[must_use]
    pub fn from_seed(seed: i32) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(u64::from(seed as u32)),
        }
    }

    /// Restarts the stream from a new seed, discarding prior state.
    pub fn reseed(&mut self, seed: i32) {
        self.inner = ChaCha8Rng::seed_from_u64(u64::from(seed as u32));
    }

    /// Draws a uniform integer in `[0, bound)`.
    ///
    /// # Panics
    ///
    /// Panics when `bound` is zero; an empty range has no valid draw.
    #[must_use]
    pub fn uniform_int(&mut self, bound: u32) -> u32 {
        assert!(bound > 0, "uniform_int requires a non-empty range");
        self.inner.next_u32() % bound
    }

    /// Draws a uniform integer in `[low, high)`.
    ///
    /// # Panics
    ///
    /// Panics when `low >= high`.
    #[must_use]
    pub fn int_range(&mut self, low: i32, high: i32) -> i32 {
        assert!(low < high, "int_range requires low < high");
        let span = i64::from(high) - i64::from(low);
        let draw = i64::from(self.inner.next_u32() % span as u32);
        low.wrapping_add(draw as i32)
    }

    /// Draws a uniform float in `[0, 1)`.
    #[must_use]
    pub fn uniform_float(&mut self) -> f32 {
        (self.inner.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }
}
