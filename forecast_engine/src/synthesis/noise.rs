//! Noise sources for forecast synthesis
//!
//! Every random draw made while synthesizing a forecast goes through
//! [`NoiseSource`], so callers can swap entropy for a seeded generator or
//! for a fully deterministic source.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

/// Source of bounded random draws
pub trait NoiseSource: Send {
    /// Draw a value in `[low, high)`; returns `low` when the interval is empty
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// Draw a symmetric perturbation in `[-magnitude, magnitude)`
    fn jitter(&mut self, magnitude: f64) -> f64 {
        let magnitude = magnitude.abs();
        self.uniform(-magnitude, magnitude)
    }
}

/// Pseudo-random noise backed by a seedable generator
#[derive(Debug, Clone)]
pub struct RandomNoise {
    rng: StdRng,
}

impl RandomNoise {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when a seed is given, entropy otherwise
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl NoiseSource for RandomNoise {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if !(high > low) || !low.is_finite() || !high.is_finite() {
            return low;
        }
        Uniform::new(low, high).sample(&mut self.rng)
    }
}

/// Deterministic source that always returns the interval midpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedNoise;

impl NoiseSource for FixedNoise {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            low + (high - low) / 2.0
        } else {
            low
        }
    }
}
