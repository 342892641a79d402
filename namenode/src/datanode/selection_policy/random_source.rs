use std::fmt::Debug;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Where the placement path gets its randomness from. Production uses the
/// thread local generator, tests hand in a seeded one.
pub trait RandomSource: Debug + Send + Sync {
    /// Uniform pick from `0..bound`, `bound` must not be zero.
    fn next_below(&self, bound: usize) -> usize;
    /// Uniform pick from `[0, 1)`.
    fn next_f64(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_below(&self, bound: usize) -> usize {
        rand::thread_rng().gen_range(0..bound)
    }
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<Pcg64>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(Pcg64::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_below(&self, bound: usize) -> usize {
        self.rng.lock().gen_range(0..bound)
    }
    fn next_f64(&self) -> f64 {
        self.rng.lock().gen_range(0.0..1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let first = SeededRandom::new(42);
        let second = SeededRandom::new(42);
        let a: Vec<_> = (0..16).map(|_| first.next_below(10)).collect();
        let b: Vec<_> = (0..16).map(|_| second.next_below(10)).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|pick| *pick < 10));
    }

    #[test]
    fn thread_random_stays_in_bounds() {
        for _ in 0..100 {
            assert!(ThreadRandom.next_below(3) < 3);
            let f = ThreadRandom.next_f64();
            assert!((0.0..1.0).contains(&f));
        }
    }
}
