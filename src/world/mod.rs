//! Voxel chunk core: occupancy grids, visible-face meshing, and the chunk
//! lifecycle state machine.

pub mod chunk;
pub mod grid;
pub mod mesh;

pub use chunk::{ChunkContent, ChunkPos, ChunkSlot, ChunkState, TERRAIN_SCALE};
pub use grid::VoxelGrid;
pub use mesh::{mesh_visible_faces, MeshData};
