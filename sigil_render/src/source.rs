//! Wall-clock and randomness seams.
//!
//! The renderer never reads `Instant::now()` or a global RNG directly; it is
//! handed a [`Clock`] and a [`RandomSource`] at construction so a test can
//! pin both.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ════════════════════════════════════════════════════════════════════════════
// Clock
// ════════════════════════════════════════════════════════════════════════════

/// Monotonic milliseconds, origin arbitrary (like `performance.now()`).
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Milliseconds since the clock was created.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self { SystemClock { origin: Instant::now() } }
}

impl Default for SystemClock {
    fn default() -> Self { SystemClock::new() }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-advanced clock.  Clones share the same time, so a test can keep one
/// handle while the renderer owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn starting_at(ms: f64) -> Self {
        ManualClock { now: Rc::new(Cell::new(ms)) }
    }
    pub fn set(&self, ms: f64) { self.now.set(ms); }
    pub fn advance(&self, ms: f64) { self.now.set(self.now.get() + ms); }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 { self.now.get() }
}

// ════════════════════════════════════════════════════════════════════════════
// RandomSource
// ════════════════════════════════════════════════════════════════════════════

/// Uniform numbers in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f32;
}

/// `StdRng`-backed source; seeded for reproducible sessions, otherwise from
/// OS entropy.
#[derive(Clone, Debug)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => SeededRandom(StdRng::seed_from_u64(s)),
            None    => SeededRandom(StdRng::from_entropy()),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f32 { self.0.gen::<f32>() }
}

/// Replays a fixed list of values, cycling when it runs out.
#[derive(Clone, Debug)]
pub struct SequenceRandom {
    values: Vec<f32>,
    cursor: usize,
}

impl SequenceRandom {
    /// An empty list behaves as an endless stream of zeros.
    pub fn new(values: Vec<f32>) -> Self {
        SequenceRandom { values, cursor: 0 }
    }

    /// How many values have been drawn so far.
    pub fn drawn(&self) -> usize { self.cursor }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f32 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_unit(&mut self) -> f32 { (**self).next_unit() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::starting_at(100.0);
        let b = a.clone();
        a.advance(16.0);
        assert_eq!(b.now_ms(), 116.0);
        b.set(5.0);
        assert_eq!(a.now_ms(), 5.0);
    }

    #[test]
    fn sequence_cycles() {
        let mut r = SequenceRandom::new(vec![0.1, 0.9]);
        assert_eq!(r.next_unit(), 0.1);
        assert_eq!(r.next_unit(), 0.9);
        assert_eq!(r.next_unit(), 0.1);
        assert_eq!(r.drawn(), 3);
    }

    #[test]
    fn seeded_random_is_reproducible_and_in_range() {
        let mut a = SeededRandom::new(Some(7));
        let mut b = SeededRandom::new(Some(7));
        for _ in 0..1000 {
            let x = a.next_unit();
            assert_eq!(x, b.next_unit());
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn system_clock_is_monotonic() {
        let c = SystemClock::new();
        let t0 = c.now_ms();
        let t1 = c.now_ms();
        assert!(t1 >= t0);
    }
}
