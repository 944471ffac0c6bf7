//! Deterministic Random Number Generator
//!
//! Linear congruential generator with fixed public constants.
//! Given the same seed, produces an identical sequence on all platforms.

use serde::{Deserialize, Serialize};

/// LCG multiplier (Numerical Recipes constants).
pub const LCG_MULTIPLIER: u64 = 1_664_525;

/// LCG increment.
pub const LCG_INCREMENT: u64 = 1_013_904_223;

/// LCG modulus (2^32).
pub const LCG_MODULUS: u64 = 1 << 32;

/// Deterministic PRNG using a 32-bit linear congruential recurrence.
///
/// # Determinism Guarantee
///
/// Two instances constructed with the same seed and given the same call
/// sequence produce bit-identical output streams on any platform. This is
/// what lets independent peers derive identical boards from a shared seed:
/// the recurrence is pure integer arithmetic, and the `[0, 1)` projection is
/// a single IEEE-754 division, which is exactly rounded everywhere.
///
/// # Example
///
/// ```
/// use mineduel::core::rng::SeededRng;
///
/// let mut rng = SeededRng::new(42);
/// rng.next();
/// assert_eq!(rng.state(), 1_083_814_273); // Always the same!
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a new RNG from an integer seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed % LCG_MODULUS }
    }

    /// Generate the next value in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state as f64 / LCG_MODULUS as f64
    }

    /// Generate an integer in `[min, max)`.
    ///
    /// Advances the stream exactly once, including when `max <= min`
    /// (in which case `min` is returned). Callers replaying a recorded
    /// sequence rely on the one-call-one-step contract.
    pub fn next_int(&mut self, min: u32, max: u32) -> u32 {
        let span = max.saturating_sub(min);
        let value = self.next();
        (value * span as f64).floor() as u32 + min
    }

    /// Shuffle a slice in place using the Fisher-Yates algorithm.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_int(0, i as u32 + 1) as usize;
            slice.swap(i, j);
        }
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: u64) {
        self.state = state % LCG_MODULUS;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        // Same seed must produce same sequence
        let mut rng1 = SeededRng::new(12345);
        let mut rng2 = SeededRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next().to_bits(), rng2.next().to_bits());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        // Different seeds produce different sequences
        let mut rng1 = SeededRng::new(12345);
        let mut rng2 = SeededRng::new(54321);

        assert_ne!(rng1.next(), rng2.next());
    }

    #[test]
    fn test_rng_known_states() {
        // Verify specific state transitions for regression testing.
        // These values must never change - peers replaying old seeds
        // would derive different boards.
        let mut rng = SeededRng::new(0);
        rng.next();
        assert_eq!(rng.state(), 1_013_904_223);

        let mut rng = SeededRng::new(42);
        rng.next();
        assert_eq!(rng.state(), 1_083_814_273);
        rng.next();
        assert_eq!(rng.state(), 378_494_188);

        let mut rng = SeededRng::new(12345);
        rng.next();
        assert_eq!(rng.state(), 87_628_868);
    }

    #[test]
    fn test_next_range() {
        let mut rng = SeededRng::new(1234);

        for _ in 0..1000 {
            let val = rng.next();
            assert!((0.0..1.0).contains(&val));
        }
    }

    #[test]
    fn test_next_int() {
        let mut rng = SeededRng::new(1234);

        for _ in 0..1000 {
            let val = rng.next_int(0, 100);
            assert!(val < 100);
        }

        for _ in 0..1000 {
            let val = rng.next_int(10, 20);
            assert!((10..20).contains(&val));
        }

        // Degenerate span still returns min
        assert_eq!(rng.next_int(5, 5), 5);
    }

    #[test]
    fn test_shuffle_determinism() {
        let mut rng1 = SeededRng::new(1111);
        let mut rng2 = SeededRng::new(1111);

        let mut arr1 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let mut arr2 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        rng1.shuffle(&mut arr1);
        rng2.shuffle(&mut arr2);

        assert_eq!(arr1, arr2);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = SeededRng::new(7777);
        let mut arr: Vec<u32> = (0..64).collect();
        rng.shuffle(&mut arr);

        let mut sorted = arr.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..64).collect::<Vec<u32>>());
    }

    #[test]
    fn test_state_checkpoint() {
        let mut rng = SeededRng::new(5555);

        for _ in 0..50 {
            rng.next();
        }

        let saved_state = rng.state();
        let next_values: Vec<u64> = (0..10).map(|_| rng.next().to_bits()).collect();

        rng.set_state(saved_state);

        for expected in next_values {
            assert_eq!(rng.next().to_bits(), expected);
        }
    }
}
