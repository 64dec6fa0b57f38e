//! Explicit random context for jitter, candidate shuffles, choices and trims.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The only source of randomness in planning and selection.
///
/// Draws happen in slot order and the generator is never reseeded, so a run
/// with a fixed seed is fully reproducible.
#[derive(Debug, Clone)]
pub struct SelectionRng {
    rng: StdRng,
    seed: Option<u64>,
}

impl SelectionRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            seed: None,
        }
    }

    /// Seeded when `seed` is set, entropy otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Seed this context was built from, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Uniform sample in `[low, high]`; returns `low` for an empty range.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.rng.random_range(low..=high)
        } else {
            low
        }
    }

    /// Uniform index into a collection of `len` items.
    pub fn index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.random_range(0..len))
    }

    /// Seed for a derived generator, e.g. a repository shuffle.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.random()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SelectionRng::seeded(11);
        let mut b = SelectionRng::seeded(11);
        for _ in 0..10 {
            assert_eq!(a.next_seed(), b.next_seed());
            assert_eq!(a.uniform(0.0, 5.0), b.uniform(0.0, 5.0));
        }
    }

    #[test]
    fn test_uniform_bounds() {
        let mut rng = SelectionRng::seeded(3);
        for _ in 0..100 {
            let v = rng.uniform(-0.2, 0.2);
            assert!((-0.2..=0.2).contains(&v));
        }
        assert_eq!(rng.uniform(1.0, 1.0), 1.0);
        assert_eq!(rng.uniform(2.0, 1.0), 2.0);
    }

    #[test]
    fn test_index() {
        let mut rng = SelectionRng::seeded(3);
        assert!(rng.index(0).is_none());
        assert_eq!(rng.index(1), Some(0));
        assert!(rng.index(5).unwrap() < 5);
    }

    #[test]
    fn test_from_optional_seed() {
        assert_eq!(SelectionRng::from_optional_seed(Some(9)).seed(), Some(9));
        assert!(SelectionRng::from_optional_seed(None).seed().is_none());
    }
}
