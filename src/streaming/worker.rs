//! Background build workers.
//!
//! Each worker blocks on a token channel (the counting wait), pops the most
//! recent pending request, builds it, and pushes the result. Both queues
//! are explicit LIFO stacks: a freshly requested chunk is serviced before
//! older ones, which biases work toward the observer's latest movement
//! direction at the cost of possible starvation of old requests under
//! continuous motion.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::error::{TerrainError, TerrainResult};
use crate::sampler::HeightSampler;
use crate::streaming::pool::ChunkHandle;
use crate::world::chunk::ChunkState;

/// The two stacks shared between the control thread and the workers. The
/// chunk pool has its own lock; no operation ever holds two of the three
/// at once.
pub(crate) struct WorkQueues {
    pub pending: Mutex<Vec<ChunkHandle>>,
    pub results: Mutex<Vec<ChunkHandle>>,
}

impl WorkQueues {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            results: Mutex::new(Vec::new()),
        }
    }
}

pub(crate) fn spawn_workers(
    count: usize,
    queues: Arc<WorkQueues>,
    tokens: Receiver<()>,
    sampler: Arc<dyn HeightSampler>,
    chunk_size: f32,
) -> TerrainResult<Vec<JoinHandle<()>>> {
    let mut workers = Vec::with_capacity(count);
    for i in 0..count {
        let queues = Arc::clone(&queues);
        let tokens = tokens.clone();
        let sampler = Arc::clone(&sampler);
        let handle = thread::Builder::new()
            .name(format!("chunk-worker-{i}"))
            .spawn(move || worker_loop(queues, tokens, sampler, chunk_size))
            .map_err(|e| TerrainError::WorkerSpawnFailed {
                message: e.to_string(),
            })?;
        workers.push(handle);
    }
    Ok(workers)
}

fn worker_loop(
    queues: Arc<WorkQueues>,
    tokens: Receiver<()>,
    sampler: Arc<dyn HeightSampler>,
    chunk_size: f32,
) {
    // Channel disconnect is the shutdown signal.
    while tokens.recv().is_ok() {
        let handle = {
            let mut pending = queues.pending.lock();
            match pending.pop() {
                // Building is published before the stack lock drops, so an
                // eviction that fails to find the request in the stack
                // always observes the Building state.
                Some(handle) => {
                    handle.slot().set_state(ChunkState::Building);
                    handle
                }
                // The request was cancelled after its token was posted.
                None => continue,
            }
        };

        {
            let mut content = handle.slot().content();
            content.build_terrain(chunk_size, sampler.as_ref());
            log::trace!(
                "[worker] built chunk at {:?}: {} quads",
                content.position,
                content.mesh().quad_count()
            );
        }

        queues.results.lock().push(handle);
    }
    log::debug!("[worker] shutting down");
}
