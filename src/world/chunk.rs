//! Chunk slots: occupancy grid + mesh buffers + lifecycle state.

use glam::Vec3;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::sampler::HeightSampler;
use crate::scene::{BodyHandle, MeshHandle, ScenePlacement};
use crate::world::grid::VoxelGrid;
use crate::world::mesh::{mesh_visible_faces, MeshData};

/// Vertical exaggeration applied to sampled heights.
pub const TERRAIN_SCALE: f64 = 20.0;

/// Position of a chunk on the chunk grid (one unit per chunk edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl ChunkPos {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing a world position. Truncates toward zero, matching
    /// the observer-grid convention the load policy is defined over.
    pub fn from_world(pos: Vec3, chunk_size: f32) -> Self {
        Self::new(
            (pos.x / chunk_size) as i64,
            (pos.y / chunk_size) as i64,
            (pos.z / chunk_size) as i64,
        )
    }

    /// Recover the chunk position from a stored chunk origin.
    pub fn from_chunk_origin(origin: Vec3, chunk_size: f32) -> Self {
        Self::new(
            (origin.x / chunk_size).round() as i64,
            (origin.y / chunk_size).round() as i64,
            (origin.z / chunk_size).round() as i64,
        )
    }

    /// World-space origin of this chunk.
    pub fn to_world_pos(&self, chunk_size: f32) -> Vec3 {
        Vec3::new(
            self.x as f32 * chunk_size,
            self.y as f32 * chunk_size,
            self.z as f32 * chunk_size,
        )
    }

    /// Chebyshev distance: the largest per-axis absolute difference.
    pub fn max_axis_distance(&self, other: ChunkPos) -> i64 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

/// Chunk lifecycle. `Building` is set by whoever dequeues the chunk for a
/// build; `Active` only after build and scene attach both completed;
/// `Unused` when the slot is pooled or a stale result is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Unused,
    Building,
    Active,
}

/// Everything guarded by a chunk's content lock: the grid, the mesh
/// buffers, the world origin, and any live scene handles.
pub struct ChunkContent {
    pub position: Vec3,
    pub empty: bool,
    grid: VoxelGrid,
    mesh: MeshData,
    heights: Vec<f64>,
    mesh_handle: Option<MeshHandle>,
    body_handle: Option<BodyHandle>,
}

impl ChunkContent {
    fn new(subdivisions: usize) -> Self {
        Self {
            position: Vec3::ZERO,
            empty: true,
            grid: VoxelGrid::new(subdivisions),
            mesh: MeshData::with_capacity_for(subdivisions),
            heights: vec![0.0; subdivisions * subdivisions],
            mesh_handle: None,
            body_handle: None,
        }
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    /// Regenerate occupancy and mesh for the current `position`.
    ///
    /// Voxel (x, y, z) is solid when its world Y lies below the sampled
    /// column height scaled by [`TERRAIN_SCALE`]. Chunk-local coordinates
    /// are centered on the origin, so geometry spans
    /// `[-chunk_size/2, chunk_size/2)` around `position`.
    pub fn build_terrain(&mut self, chunk_size: f32, sampler: &dyn HeightSampler) {
        let n = self.grid.subdivisions();
        let voxel_size = chunk_size / n as f32;
        let half_extent = chunk_size / 2.0;

        // One height per (x, z) column.
        for z in 0..n {
            for x in 0..n {
                let wx = self.position.x + x as f32 * voxel_size - half_extent;
                let wz = self.position.z + z as f32 * voxel_size - half_extent;
                self.heights[x + z * n] = sampler.sample(wx as f64, wz as f64);
            }
        }

        self.grid.clear();
        for y in 0..n {
            let world_y = (self.position.y + y as f32 * voxel_size - half_extent) as f64;
            for z in 0..n {
                for x in 0..n {
                    if world_y < self.heights[x + z * n] * TERRAIN_SCALE {
                        self.grid.set(x, y, z, true);
                    }
                }
            }
        }

        self.mesh.reset();
        let quads = mesh_visible_faces(&self.grid, &mut self.mesh, voxel_size, half_extent);
        self.mesh.finish();
        self.empty = quads == 0;
    }

    /// Place this chunk's geometry in the scene. An empty chunk attaches
    /// nothing. Control thread only.
    pub fn attach(&mut self, scene: &mut dyn ScenePlacement) {
        self.detach(scene);
        if self.empty {
            return;
        }
        self.mesh_handle = Some(scene.attach_mesh(&self.mesh, self.position));
        self.body_handle = Some(scene.create_body(&self.mesh.collision_faces, self.position));
    }

    /// Release any scene-side resources. Control thread only.
    pub fn detach(&mut self, scene: &mut dyn ScenePlacement) {
        if let Some(handle) = self.mesh_handle.take() {
            scene.detach_mesh(handle);
        }
        if let Some(handle) = self.body_handle.take() {
            scene.destroy_body(handle);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.mesh_handle.is_some() || self.body_handle.is_some()
    }
}

/// One pooled chunk. Two independent locks: `content` is held for the full
/// duration of a build or a scene attach/detach, while `state` guards only
/// the lifecycle flag so other threads can poll it without waiting out a
/// build.
pub struct ChunkSlot {
    content: Mutex<ChunkContent>,
    state: Mutex<ChunkState>,
}

impl ChunkSlot {
    pub(crate) fn new(subdivisions: usize) -> Self {
        Self {
            content: Mutex::new(ChunkContent::new(subdivisions)),
            state: Mutex::new(ChunkState::Unused),
        }
    }

    pub fn state(&self) -> ChunkState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: ChunkState) {
        *self.state.lock() = state;
    }

    pub fn content(&self) -> MutexGuard<'_, ChunkContent> {
        self.content.lock()
    }
}
