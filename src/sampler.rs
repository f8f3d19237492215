//! Heightfield sampling.

use noise::{NoiseFn, Perlin};

/// 2D height function consumed by chunk terrain builds.
///
/// Implementations must be pure and deterministic for a given seed: the
/// same column must produce the same height on every thread, since adjacent
/// chunks sample overlapping world coordinates independently.
pub trait HeightSampler: Send + Sync {
    /// Height for a world-space column, roughly in [-1, 1].
    fn sample(&self, x: f64, z: f64) -> f64;
}

/// Perlin-backed sampler with a broad base octave and a finer detail
/// octave.
pub struct NoiseHeightSampler {
    height_noise: Perlin,
    detail_noise: Perlin,
    seed: u32,
}

impl NoiseHeightSampler {
    pub fn new(seed: u32) -> Self {
        Self {
            height_noise: Perlin::new(seed),
            detail_noise: Perlin::new(seed.wrapping_add(1)),
            seed,
        }
    }

    /// Fresh random seed. Pin the seed instead when reproducibility matters.
    pub fn randomized() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl HeightSampler for NoiseHeightSampler {
    fn sample(&self, x: f64, z: f64) -> f64 {
        let base = self.height_noise.get([x * 0.01, z * 0.01]);
        let detail = self.detail_noise.get([x * 0.05, z * 0.05]);
        base * 0.75 + detail * 0.25
    }
}
