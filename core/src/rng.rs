//! Seeded pseudo-random sequence shared by both participants of a match.

use serde::{Deserialize, Serialize};

const MULTIPLIER: u64 = 9_301;
const INCREMENT: u64 = 49_297;
const MODULUS: u64 = 233_280;

/// Linear congruential generator producing values in `[0, 1)`.
///
/// Two generators built from the same seed yield identical sequences. The
/// state is reduced modulo the recurrence's modulus up front, which leaves the
/// sequence unchanged while keeping every intermediate product in range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Creates a generator from the provided seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed % MODULUS,
        }
    }

    /// Advances the recurrence and returns the next value in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        self.state = (self.state * MULTIPLIER + INCREMENT) % MODULUS;
        self.state as f64 / MODULUS as f64
    }

    /// Draws an integer in `[0, bound)`; returns zero when `bound` is zero.
    pub fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        let scaled = (self.next_unit() * f64::from(bound)) as u32;
        scaled.min(bound - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::SeededRng;

    #[test]
    fn identical_seeds_produce_identical_sequences() {
        let mut first = SeededRng::new(1_700_000_000_123);
        let mut second = SeededRng::new(1_700_000_000_123);

        for _ in 0..64 {
            assert_eq!(first.next_unit().to_bits(), second.next_unit().to_bits());
        }
    }

    #[test]
    fn values_stay_inside_unit_interval() {
        let mut rng = SeededRng::new(42);
        for _ in 0..1_000 {
            let value = rng.next_unit();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn first_value_follows_recurrence() {
        let mut rng = SeededRng::new(1);
        let expected = (9_301.0 + 49_297.0) / 233_280.0;
        assert!((rng.next_unit() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn large_seed_matches_unreduced_recurrence() {
        let seed: u64 = 1_234_567_890_123;
        let mut rng = SeededRng::new(seed);
        let expected = ((seed as u128 * 9_301 + 49_297) % 233_280) as f64 / 233_280.0;
        assert!((rng.next_unit() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn bounded_draws_respect_bound() {
        let mut rng = SeededRng::new(7);
        assert_eq!(rng.next_below(0), 0);
        for _ in 0..500 {
            assert!(rng.next_below(10) < 10);
        }
    }
}
