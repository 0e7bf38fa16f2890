//! Injectable randomness for branch and idle selection
//!
//! Branch draws and idle-animation picks go through [`RandomSource`] so that
//! tests can substitute fixed sequences and replay exact playback paths.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Random source shared between the orchestrator and the animator.
pub type SharedRandom = Arc<Mutex<Box<dyn RandomSource + Send>>>;

/// Wrap a random source for shared use.
pub fn shared_random(source: impl RandomSource + Send + 'static) -> SharedRandom {
    let boxed: Box<dyn RandomSource + Send> = Box::new(source);
    Arc::new(Mutex::new(boxed))
}

/// Source of uniform random draws.
pub trait RandomSource {
    /// Next uniform value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Next uniform value in `[0, 100)`, the branch-draw range.
    fn next_percent(&mut self) -> f64 {
        self.next_f64() * 100.0
    }

    /// Uniform index in `[0, len)`. Returns 0 when `len` is 0.
    fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let idx = (self.next_f64() * len as f64) as usize;
        idx.min(len - 1)
    }
}

/// Linear congruential generator (glibc constants).
#[derive(Debug, Clone)]
pub struct LcgRandom {
    state: u32,
}

impl LcgRandom {
    /// Create a generator from an explicit seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }
}

impl Default for LcgRandom {
    fn default() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(1);
        Self::new(seed | 1)
    }
}

impl RandomSource for LcgRandom {
    fn next_f64(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12_345)
            & 0x7fff_ffff;
        f64::from(self.state) / f64::from(0x8000_0000u32)
    }
}

/// Fixed-sequence source for deterministic tests. Cycles when exhausted.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    /// Create a source replaying `values` (each in `[0, 1)`).
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_in_range() {
        let mut rng = LcgRandom::new(42);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_lcg_deterministic_for_seed() {
        let mut a = LcgRandom::new(7);
        let mut b = LcgRandom::new(7);
        for _ in 0..10 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }

    #[test]
    fn test_sequence_replays_and_cycles() {
        let mut rng = SequenceRandom::new(vec![0.1, 0.9]);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.next_f64(), 0.9);
        assert_eq!(rng.next_f64(), 0.1);
    }

    #[test]
    fn test_sequence_empty_yields_zero() {
        let mut rng = SequenceRandom::new(Vec::new());
        assert_eq!(rng.next_f64(), 0.0);
    }

    #[test]
    fn test_next_percent_scales() {
        let mut rng = SequenceRandom::new(vec![0.3]);
        assert!((rng.next_percent() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_next_index_bounds() {
        let mut rng = SequenceRandom::new(vec![0.0, 0.999, 0.5]);
        assert_eq!(rng.next_index(4), 0);
        assert_eq!(rng.next_index(4), 3);
        assert_eq!(rng.next_index(4), 2);
        assert_eq!(rng.next_index(0), 0);
    }
}
