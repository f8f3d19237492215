//! Visible-face mesh extraction.
//!
//! One quad per exposed unit face, no merging across runs and no
//! deduplication against neighboring chunks. Buffers are sized up front to
//! the structural maximum (a checkerboard fill, every solid voxel fully
//! exposed) and truncated to the used prefix once emission finishes.

use glam::{Vec2, Vec3};

use crate::world::grid::VoxelGrid;

/// One entry per axis direction: neighbor offset, outward normal, the four
/// quad corners as unit-cube offsets, and the two counter-clockwise
/// triangles over those corners.
pub(crate) struct FaceSpec {
    pub neighbor: [i64; 3],
    pub normal: Vec3,
    pub corners: [Vec3; 4],
    pub tris: [u32; 6],
}

pub(crate) const FACES: [FaceSpec; 6] = [
    // +Y
    FaceSpec {
        neighbor: [0, 1, 0],
        normal: Vec3::new(0.0, 1.0, 0.0),
        corners: [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ],
        tris: [0, 2, 1, 1, 2, 3],
    },
    // -Y
    FaceSpec {
        neighbor: [0, -1, 0],
        normal: Vec3::new(0.0, -1.0, 0.0),
        corners: [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ],
        tris: [0, 1, 2, 1, 3, 2],
    },
    // +X
    FaceSpec {
        neighbor: [1, 0, 0],
        normal: Vec3::new(1.0, 0.0, 0.0),
        corners: [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        ],
        tris: [0, 2, 1, 1, 2, 3],
    },
    // -X
    FaceSpec {
        neighbor: [-1, 0, 0],
        normal: Vec3::new(-1.0, 0.0, 0.0),
        corners: [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
        ],
        tris: [0, 1, 2, 1, 3, 2],
    },
    // +Z
    FaceSpec {
        neighbor: [0, 0, 1],
        normal: Vec3::new(0.0, 0.0, 1.0),
        corners: [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ],
        tris: [0, 1, 2, 1, 3, 2],
    },
    // -Z
    FaceSpec {
        neighbor: [0, 0, -1],
        normal: Vec3::new(0.0, 0.0, -1.0),
        corners: [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ],
        tris: [0, 2, 1, 1, 2, 3],
    },
];

/// Unit UV square shared by every face, in corner order.
const FACE_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
];

/// Parallel mesh buffers for one chunk: indexed render geometry plus a flat
/// triangle soup for the collision backend.
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub collision_faces: Vec<Vec3>,
    vertex_count: usize,
    index_count: usize,
    max_quads: usize,
}

impl MeshData {
    /// Buffers sized for a grid of `subdivisions` voxels per axis.
    pub fn with_capacity_for(subdivisions: usize) -> Self {
        let cells = subdivisions * subdivisions * subdivisions;
        // Checkerboard occupancy exposes the most faces.
        let max_quads = (cells + 1) / 2 * 6;
        let mut data = Self {
            vertices: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            collision_faces: Vec::new(),
            vertex_count: 0,
            index_count: 0,
            max_quads,
        };
        data.reset();
        data
    }

    /// Restore full-length buffers for a new emission pass. Capacity from
    /// earlier builds is retained; only the lengths change.
    pub fn reset(&mut self) {
        self.vertex_count = 0;
        self.index_count = 0;
        self.vertices.resize(self.max_quads * 4, Vec3::ZERO);
        self.normals.resize(self.max_quads * 4, Vec3::ZERO);
        self.uvs.resize(self.max_quads * 4, Vec2::ZERO);
        self.indices.resize(self.max_quads * 6, 0);
        self.collision_faces.resize(self.max_quads * 6, Vec3::ZERO);
    }

    /// Shrink every buffer to its used prefix.
    pub fn finish(&mut self) {
        self.vertices.truncate(self.vertex_count);
        self.normals.truncate(self.vertex_count);
        self.uvs.truncate(self.vertex_count);
        self.indices.truncate(self.index_count);
        self.collision_faces.truncate(self.index_count);
    }

    pub fn quad_count(&self) -> usize {
        self.vertex_count / 4
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    fn emit_face(&mut self, face: &FaceSpec, corner: Vec3, size: f32) {
        let v = self.vertex_count;
        let i = self.index_count;
        for (k, offset) in face.corners.iter().enumerate() {
            self.vertices[v + k] = corner + *offset * size;
            self.normals[v + k] = face.normal;
            self.uvs[v + k] = FACE_UVS[k];
        }
        for (k, t) in face.tris.iter().enumerate() {
            self.indices[i + k] = (v + *t as usize) as u32;
            self.collision_faces[i + k] = self.vertices[v + *t as usize];
        }
        self.vertex_count += 4;
        self.index_count += 6;
    }
}

/// Walk the grid and emit one quad per (solid voxel, exposed direction)
/// pair. Voxel (x, y, z) occupies the cube whose smallest corner is
/// `(x, y, z) * voxel_size - half_extent` in chunk-local space. Returns the
/// number of quads emitted.
pub fn mesh_visible_faces(
    grid: &VoxelGrid,
    mesh: &mut MeshData,
    voxel_size: f32,
    half_extent: f32,
) -> usize {
    let n = grid.subdivisions();
    for y in 0..n {
        for z in 0..n {
            for x in 0..n {
                if !grid.get(x, y, z) {
                    // Air voxels never need geometry
                    continue;
                }
                let corner = Vec3::new(
                    x as f32 * voxel_size - half_extent,
                    y as f32 * voxel_size - half_extent,
                    z as f32 * voxel_size - half_extent,
                );
                for face in &FACES {
                    let [dx, dy, dz] = face.neighbor;
                    if !grid.solid_or_empty(x as i64 + dx, y as i64 + dy, z as i64 + dz) {
                        mesh.emit_face(face, corner, voxel_size);
                    }
                }
            }
        }
    }
    mesh.quad_count()
}
