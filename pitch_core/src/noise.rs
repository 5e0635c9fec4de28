// pitch_core/src/noise.rs

use nalgebra::Vector2;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Draws all simulator randomness from one generator.
///
/// A zero standard deviation or a zero probability returns without touching
/// the generator, so noise-free sessions produce identical random streams no
/// matter how many objects are on the field.
pub struct NoiseSampler<'a, R: Rng> {
    rng: &'a mut R,
}

impl<'a, R: Rng> NoiseSampler<'a, R> {
    pub fn new(rng: &'a mut R) -> Self {
        Self { rng }
    }

    /// A zero-mean Gaussian sample.
    pub fn gaussian(&mut self, stddev: f32) -> f32 {
        if stddev <= 0.0 {
            return 0.0;
        }
        match Normal::new(0.0, stddev) {
            Ok(normal) => normal.sample(&mut *self.rng),
            Err(_) => 0.0,
        }
    }

    /// Two independent Gaussian samples.
    pub fn gaussian_vector(&mut self, stddev: f32) -> Vector2<f32> {
        Vector2::new(self.gaussian(stddev), self.gaussian(stddev))
    }

    /// True with the given probability.
    pub fn chance(&mut self, probability: f32) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.gen::<f32>() < probability
    }
}
