//! Source of randomness consumed by construction and mutation.
//!
//! The engine never owns a generator. Every operation that draws random values
//! takes a `&mut R` where `R: RandomSource`, so hosts decide seeding and
//! sharing. Any [`rand::Rng`] already qualifies through the blanket impl.

use rand::Rng;

/// Uniform draws used by the engine.
pub trait RandomSource {
    /// Uniform real in `[min, max]`.
    fn uniform_real(&mut self, min: f64, max: f64) -> f64;

    /// Uniform integer in `[min, max]` (both inclusive).
    fn uniform_int(&mut self, min: usize, max: usize) -> usize;

    /// Probability roll: uniform real in `[0, 1]`.
    #[inline]
    fn chance(&mut self) -> f64 {
        self.uniform_real(0.0, 1.0)
    }

    /// Uniform real in `[-1, 1]`, the range used for fresh biases and weights.
    #[inline]
    fn unit(&mut self) -> f64 {
        self.uniform_real(-1.0, 1.0)
    }
}

impl<R: Rng> RandomSource for R {
    #[inline]
    fn uniform_real(&mut self, min: f64, max: f64) -> f64 {
        self.random_range(min..=max)
    }

    #[inline]
    fn uniform_int(&mut self, min: usize, max: usize) -> usize {
        self.random_range(min..=max)
    }
}
