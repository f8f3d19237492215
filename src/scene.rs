//! Scene placement boundary.
//!
//! The streaming core never talks to a render or physics engine directly;
//! it drives this capability from the control thread only. Hosts implement
//! it over their engine of choice (a chunk-as-static-body strategy and a
//! child-mesh-node strategy are both expressible as implementations chosen
//! at construction).

use std::collections::HashMap;

use glam::Vec3;

use crate::world::mesh::MeshData;

/// Opaque id for an attached render mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Opaque id for a static collision body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

/// Render/physics backend consumed by the streaming manager.
///
/// All methods are invoked from the single control thread; implementations
/// do not need to be thread-safe.
pub trait ScenePlacement {
    /// Upload render geometry placed at `origin`.
    fn attach_mesh(&mut self, mesh: &MeshData, origin: Vec3) -> MeshHandle;

    fn detach_mesh(&mut self, handle: MeshHandle);

    /// Create a static body from a flat triangle soup placed at `origin`.
    fn create_body(&mut self, triangles: &[Vec3], origin: Vec3) -> BodyHandle;

    fn destroy_body(&mut self, handle: BodyHandle);
}

/// Record of one live attachment in a [`HeadlessScene`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRecord {
    pub origin: Vec3,
    /// Vertices for meshes, triangle-soup positions for bodies.
    pub element_count: usize,
}

/// Backend that records placements instead of rendering them. Used by the
/// demo binary and by tests that assert on attach/detach bookkeeping.
#[derive(Default)]
pub struct HeadlessScene {
    next_id: u64,
    pub meshes: HashMap<MeshHandle, PlacementRecord>,
    pub bodies: HashMap<BodyHandle, PlacementRecord>,
    pub meshes_attached: usize,
    pub meshes_detached: usize,
    pub bodies_created: usize,
    pub bodies_destroyed: usize,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl ScenePlacement for HeadlessScene {
    fn attach_mesh(&mut self, mesh: &MeshData, origin: Vec3) -> MeshHandle {
        let handle = MeshHandle(self.next_id());
        self.meshes.insert(
            handle,
            PlacementRecord {
                origin,
                element_count: mesh.vertices.len(),
            },
        );
        self.meshes_attached += 1;
        handle
    }

    fn detach_mesh(&mut self, handle: MeshHandle) {
        if self.meshes.remove(&handle).is_none() {
            log::warn!("[HeadlessScene] detach of unknown mesh {handle:?}");
        }
        self.meshes_detached += 1;
    }

    fn create_body(&mut self, triangles: &[Vec3], origin: Vec3) -> BodyHandle {
        let handle = BodyHandle(self.next_id());
        self.bodies.insert(
            handle,
            PlacementRecord {
                origin,
                element_count: triangles.len(),
            },
        );
        self.bodies_created += 1;
        handle
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        if self.bodies.remove(&handle).is_none() {
            log::warn!("[HeadlessScene] destroy of unknown body {handle:?}");
        }
        self.bodies_destroyed += 1;
    }
}
