//! Sources of randomness for word sampling.
//!
//! Every sampling call receives its source explicitly, so tests can replay a
//! fixed sequence with [`Cycle`] while the binary uses a seeded [`Flat`] or
//! [`Natural`] generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of random numbers
pub trait RandomSource {
    /// Returns an index in `[0, max)`. `max` must be positive.
    fn index(&mut self, max: u128) -> u128;

    /// Returns a float in `[0, max)`
    fn float(&mut self, max: f64) -> f64;
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn index(&mut self, max: u128) -> u128 {
        (**self).index(max)
    }

    fn float(&mut self, max: f64) -> f64 {
        (**self).float(max)
    }
}

/// Uniformly distributed numbers
#[derive(Debug, Clone)]
pub struct Flat<R = StdRng> {
    rng: R,
}

impl Flat<StdRng> {
    pub fn new(seed: u64) -> Self {
        Flat {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Flat {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> Flat<R> {
    pub fn from_rng(rng: R) -> Self {
        Flat { rng }
    }
}

impl<R: Rng> RandomSource for Flat<R> {
    fn index(&mut self, max: u128) -> u128 {
        if max <= 1 {
            return 0;
        }
        self.rng.gen_range(0..max)
    }

    fn float(&mut self, max: f64) -> f64 {
        self.rng.r#gen::<f64>() * max
    }
}

/// Indices favour low ranks: index `i` of `max` has relative weight
/// `(ln(max + 1) - ln(i + 1)) / max`, the same decay used for implicitly
/// weighted alternatives. Floats are uniform.
#[derive(Debug, Clone)]
pub struct Natural<R = StdRng> {
    rng: R,
}

impl Natural<StdRng> {
    pub fn new(seed: u64) -> Self {
        Natural {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Natural {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> Natural<R> {
    pub fn from_rng(rng: R) -> Self {
        Natural { rng }
    }
}

/// Weight of rank `i` out of `n`
pub fn rank_weight(i: u64, n: u64) -> f64 {
    (((n + 1) as f64).ln() - ((i + 1) as f64).ln()) / n as f64
}

/// Sum of the weights of ranks `0..k` out of `n`, that is
/// `(k * ln(n + 1) - ln(k!)) / n`
fn rank_cumulative(k: u128, n: u128) -> f64 {
    let k = k as f64;
    (k * (n as f64 + 1.0).ln() - libm::lgamma(k + 1.0)) / n as f64
}

impl<R: Rng> RandomSource for Natural<R> {
    /// Runs in `O(log max)`, so `max` may be the size of a whole language
    fn index(&mut self, max: u128) -> u128 {
        if max <= 1 {
            return 0;
        }

        let r = self.rng.r#gen::<f64>() * rank_cumulative(max, max);

        // smallest i whose cumulative weight up to and including i exceeds r
        let (mut lo, mut hi) = (0, max - 1);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if rank_cumulative(mid + 1, max) > r {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    fn float(&mut self, max: f64) -> f64 {
        self.rng.r#gen::<f64>() * max
    }
}

/// Replays a fixed sequence of values in `[0, 1]`, starting over at the end.
/// An empty sequence replays zero.
#[derive(Debug, Clone)]
pub struct Cycle {
    values: Vec<f64>,
    cursor: usize,
}

impl Cycle {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let mut values = values.into();
        if values.is_empty() {
            values.push(0.0);
        }
        Cycle { values, cursor: 0 }
    }

    fn next_value(&mut self) -> f64 {
        let value = self.values[self.cursor];
        self.cursor = (self.cursor + 1) % self.values.len();
        value
    }
}

impl RandomSource for Cycle {
    fn index(&mut self, max: u128) -> u128 {
        let value = (self.next_value() * max as f64) as u128;
        value.min(max.saturating_sub(1))
    }

    fn float(&mut self, max: f64) -> f64 {
        self.next_value() * max
    }
}
