//! Deterministic RNG for workload generation.
//!
//! Uses xorshift64* for speed and stable output across platforms.
//! This is not cryptographically secure and must never be used for secrets.

/// Deterministic RNG with a single 64-bit state.
///
/// Intentionally not `Copy`: copying would duplicate the stream and make two
/// tasks draw identical "random" bursts.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG. A zero seed is remapped to a non-zero constant to
    /// avoid the xorshift lockup state.
    pub fn new(seed: u64) -> Self {
        let s = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: s }
    }

    /// Derive an independent stream for `stream` (e.g. a task id) from a
    /// master seed. Uses a splitmix64 finalizer so adjacent ids diverge.
    pub fn fork(seed: u64, stream: u64) -> Self {
        let mut z = seed ^ stream.wrapping_add(1).wrapping_mul(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        Self::new(z ^ (z >> 31))
    }

    /// Next 64-bit value from xorshift64*.
    #[inline(always)]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate a value in `[lo, hi_inclusive]`.
    #[inline(always)]
    pub fn gen_range_inclusive(&mut self, lo: u32, hi_inclusive: u32) -> u32 {
        debug_assert!(lo <= hi_inclusive);
        let span = u64::from(hi_inclusive - lo) + 1;
        (u64::from(lo) + (self.next_u64() % span)) as u32
    }

    /// Generate a boolean with probability `numerator / denominator`.
    #[inline(always)]
    pub fn gen_bool(&mut self, numerator: u32, denominator: u32) -> bool {
        debug_assert!(denominator > 0);
        debug_assert!(numerator <= denominator);
        (self.next_u64() % u64::from(denominator)) < u64::from(numerator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SimRng::new(7);
        let mut b = SimRng::new(7);
        for _ in 0..32 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn zero_seed_does_not_lock_up() {
        let mut rng = SimRng::new(0);
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn forked_streams_differ() {
        let mut a = SimRng::fork(42, 0);
        let mut b = SimRng::fork(42, 1);
        let xs: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn inclusive_range_stays_in_bounds() {
        let mut rng = SimRng::new(99);
        let mut seen_lo = false;
        let mut seen_hi = false;
        for _ in 0..2_000 {
            let v = rng.gen_range_inclusive(1, 5);
            assert!((1..=5).contains(&v));
            seen_lo |= v == 1;
            seen_hi |= v == 5;
        }
        assert!(seen_lo && seen_hi);
    }

    #[test]
    fn gen_bool_extremes() {
        let mut rng = SimRng::new(3);
        for _ in 0..100 {
            assert!(!rng.gen_bool(0, 2));
            assert!(rng.gen_bool(2, 2));
        }
    }
}
