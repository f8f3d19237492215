//! Chunk slot arena and free list.
//!
//! Slots are allocated once and then cycled between the coordinate table,
//! the work queues, and the free list. The [`ChunkHandle`] is deliberately
//! not `Clone`: holding it is the right to lock the slot's content, and it
//! moves between the table, the stacks, worker locals, and the pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::world::chunk::{ChunkSlot, ChunkState};

/// Exclusive ownership token for one chunk slot.
pub(crate) struct ChunkHandle {
    id: usize,
    slot: Arc<ChunkSlot>,
}

impl ChunkHandle {
    /// Stable identity, used by the coordinate table to recognize whether a
    /// finished build still corresponds to its entry.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn slot(&self) -> &ChunkSlot {
        &self.slot
    }

    /// Shared reference for state polling. Content-mutation rights stay
    /// with the handle.
    pub fn share_slot(&self) -> Arc<ChunkSlot> {
        Arc::clone(&self.slot)
    }
}

/// LIFO free list of chunk slots, all sized identically from the manager's
/// configuration.
pub(crate) struct ChunkPool {
    free: Mutex<Vec<ChunkHandle>>,
    next_id: AtomicUsize,
    subdivisions: usize,
    allocated: AtomicUsize,
}

impl ChunkPool {
    pub fn new(subdivisions: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            subdivisions,
            allocated: AtomicUsize::new(0),
        }
    }

    /// Reuse a pooled slot, or allocate a fresh one if the pool is dry.
    pub fn acquire(&self) -> ChunkHandle {
        if let Some(handle) = self.free.lock().pop() {
            return handle;
        }
        self.allocated.fetch_add(1, Ordering::Relaxed);
        ChunkHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            slot: Arc::new(ChunkSlot::new(self.subdivisions)),
        }
    }

    /// Return a slot for reuse. The caller must already have detached any
    /// scene resources.
    pub fn release(&self, handle: ChunkHandle) {
        debug_assert_eq!(handle.slot().state(), ChunkState::Unused);
        self.free.lock().push(handle);
    }

    /// Slots currently sitting in the free list.
    pub fn pooled(&self) -> usize {
        self.free.lock().len()
    }

    /// Slots ever allocated, pooled or not.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}
