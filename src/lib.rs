//! Procedurally generated, infinitely streamed voxel terrain.
//!
//! The world is a sparse table of fixed-size cubic chunks around a moving
//! observer. Each chunk samples a height field into a dense voxel grid,
//! meshes the exposed faces, and is attached to the scene through the
//! [`scene::ScenePlacement`] seam. A [`streaming::StreamingManager`] keeps
//! the table converged on the observer: background workers build chunks
//! pulled from a LIFO request stack, finished chunks drain back on the
//! control thread, and retired chunks return to a pool for reuse.

pub mod error;
pub mod heightmap;
pub mod observer;
pub mod sampler;
pub mod scene;
pub mod streaming;
pub mod world;

pub use error::{TerrainError, TerrainResult};
pub use heightmap::HeightMap;
pub use observer::{ObserverSource, SharedObserver};
pub use sampler::{HeightSampler, NoiseHeightSampler};
pub use scene::{BodyHandle, HeadlessScene, MeshHandle, ScenePlacement};
pub use streaming::{StreamingManager, StreamingStats};
pub use world::{ChunkPos, ChunkState, TERRAIN_SCALE};

use serde::{Deserialize, Serialize};

/// Tunables for terrain generation and streaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Edge length of a chunk in world units.
    pub chunk_size: f32,
    /// Voxels along each chunk edge.
    pub subdivisions: usize,
    /// Chebyshev radius of the desired chunk cube around the observer.
    pub load_radius: i64,
    /// Lowest chunk layer kept loaded (inclusive).
    pub floor: i64,
    /// Highest chunk layer kept loaded (inclusive).
    pub ceiling: i64,
    /// Noise seed; `None` picks a random seed at startup.
    pub seed: Option<u32>,
    /// Background build threads; `None` uses the logical CPU count.
    pub worker_threads: Option<usize>,
    /// Finished chunks attached per tick.
    pub drain_budget: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16.0,
            subdivisions: 16,
            load_radius: 4,
            floor: -3,
            ceiling: 3,
            seed: None,
            worker_threads: None,
            drain_budget: 1,
        }
    }
}

impl TerrainConfig {
    pub fn validate(&self) -> TerrainResult<()> {
        if self.subdivisions == 0 {
            return Err(TerrainError::InvalidConfig {
                field: "subdivisions",
                message: "must be at least 1".into(),
            });
        }
        if !(self.chunk_size > 0.0) {
            return Err(TerrainError::InvalidConfig {
                field: "chunk_size",
                message: format!("{} is not a positive size", self.chunk_size),
            });
        }
        if self.load_radius < 0 {
            return Err(TerrainError::InvalidConfig {
                field: "load_radius",
                message: format!("{} is negative", self.load_radius),
            });
        }
        if self.floor > self.ceiling {
            return Err(TerrainError::InvalidConfig {
                field: "floor",
                message: format!("floor {} exceeds ceiling {}", self.floor, self.ceiling),
            });
        }
        Ok(())
    }
}
