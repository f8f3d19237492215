//! Chunk streaming around a moving observer.
//!
//! One control thread owns the coordinate table and the scene; a fixed
//! pool of workers builds chunk terrain and meshes. Chunks flow
//! control → pending stack → worker → result stack → control, and slots
//! cycle through a free list instead of being reallocated.

pub(crate) mod pool;
pub(crate) mod worker;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Sender};

use crate::error::TerrainResult;
use crate::observer::ObserverSource;
use crate::sampler::HeightSampler;
use crate::scene::ScenePlacement;
use crate::streaming::pool::{ChunkHandle, ChunkPool};
use crate::streaming::worker::{spawn_workers, WorkQueues};
use crate::world::chunk::{ChunkPos, ChunkSlot, ChunkState};
use crate::TerrainConfig;

/// Radius of the synchronous warm-start load around the observer.
const PRIME_RADIUS: i64 = 2;

/// Counters accumulated over the manager's lifetime.
#[derive(Debug, Default, Clone)]
pub struct StreamingStats {
    /// Builds attached to the scene (including empty chunks that attached
    /// nothing but went active).
    pub chunks_attached: usize,
    /// Table entries evicted by the distance policy.
    pub chunks_evicted: usize,
    /// Finished builds discarded because their table entry was superseded
    /// or evicted while they were in flight.
    pub stale_results: usize,
    /// Priority chunks built synchronously on the control thread.
    pub sync_loads: usize,
}

/// Table record for one coordinate. `slot` is a shared reference for
/// identity and state polling; the exclusive [`ChunkHandle`] is stored here
/// only once the chunk is attached, and is in flight (pending stack,
/// worker, or result stack) before that.
struct TableEntry {
    id: usize,
    slot: Arc<ChunkSlot>,
    attached: Option<ChunkHandle>,
}

/// Streams terrain chunks around the observer.
///
/// All methods must be called from one thread (the control thread); the
/// manager spawns and owns its worker threads internally.
pub struct StreamingManager {
    config: TerrainConfig,
    sampler: Arc<dyn HeightSampler>,
    observer: Arc<dyn ObserverSource>,
    scene: Box<dyn ScenePlacement>,
    /// Coordinate table. Single-writer: only the control thread mutates it.
    chunks: HashMap<ChunkPos, TableEntry>,
    queues: Arc<WorkQueues>,
    pool: ChunkPool,
    wake: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
    stats: StreamingStats,
}

impl StreamingManager {
    pub fn new(
        config: TerrainConfig,
        sampler: Arc<dyn HeightSampler>,
        observer: Arc<dyn ObserverSource>,
        scene: Box<dyn ScenePlacement>,
    ) -> TerrainResult<Self> {
        config.validate()?;

        let queues = Arc::new(WorkQueues::new());
        let (wake, tokens) = unbounded();
        let worker_count = config.worker_threads.unwrap_or_else(num_cpus::get);
        let workers = spawn_workers(
            worker_count,
            Arc::clone(&queues),
            tokens,
            Arc::clone(&sampler),
            config.chunk_size,
        )?;
        log::info!(
            "[StreamingManager] started with {} workers, load radius {}",
            worker_count,
            config.load_radius
        );

        Ok(Self {
            pool: ChunkPool::new(config.subdivisions),
            config,
            sampler,
            observer,
            scene,
            chunks: HashMap::new(),
            queues,
            wake: Some(wake),
            workers,
            stats: StreamingStats::default(),
        })
    }

    /// Synchronously load a small footprint around the observer so the
    /// world is present before the first streamed results arrive.
    pub fn prime(&mut self) {
        let center = ChunkPos::from_world(self.observer.position(), self.config.chunk_size);
        for y in self.config.floor..=self.config.ceiling {
            for x in (center.x - PRIME_RADIUS)..=(center.x + PRIME_RADIUS) {
                for z in (center.z - PRIME_RADIUS)..=(center.z + PRIME_RADIUS) {
                    let pos = ChunkPos::new(x, y, z);
                    if !self.chunks.contains_key(&pos) {
                        self.load_chunk_sync(pos);
                    }
                }
            }
        }
        log::info!("[StreamingManager] primed {} chunks", self.chunks.len());
    }

    /// One control-thread step: drain finished builds, evict distant
    /// chunks, keep the ground under the observer, request what's missing.
    pub fn tick(&mut self) {
        self.drain_results();

        let center = ChunkPos::from_world(self.observer.position(), self.config.chunk_size);

        let evict: Vec<ChunkPos> = self
            .chunks
            .keys()
            .copied()
            .filter(|pos| beyond_unload_distance(*pos, center, self.config.load_radius))
            .collect();
        for pos in evict {
            self.unload_chunk(pos);
        }

        // The chunk under the observer never waits on the worker pool.
        if !self.chunks.contains_key(&center)
            && center.y >= self.config.floor
            && center.y <= self.config.ceiling
        {
            self.load_chunk_sync(center);
        }

        let r = self.config.load_radius;
        for y in (center.y - r)..=(center.y + r) {
            if y < self.config.floor || y > self.config.ceiling {
                continue;
            }
            for x in (center.x - r)..=(center.x + r) {
                for z in (center.z - r)..=(center.z + r) {
                    let pos = ChunkPos::new(x, y, z);
                    if !self.chunks.contains_key(&pos) {
                        self.load_chunk(pos);
                    }
                }
            }
        }
    }

    /// Pop up to `drain_budget` finished builds off the result stack and
    /// attach them, unless their table entry changed while they were in
    /// flight.
    fn drain_results(&mut self) {
        for _ in 0..self.config.drain_budget {
            let handle = match self.queues.results.lock().pop() {
                Some(handle) => handle,
                None => break,
            };

            let position = handle.slot().content().position;
            let pos = ChunkPos::from_chunk_origin(position, self.config.chunk_size);

            match self.chunks.get_mut(&pos) {
                Some(entry) if entry.id == handle.id() => {
                    handle.slot().content().attach(self.scene.as_mut());
                    handle.slot().set_state(ChunkState::Active);
                    entry.attached = Some(handle);
                    self.stats.chunks_attached += 1;
                }
                _ => {
                    // Superseded or evicted while building. Never attach
                    // stale geometry; route the slot back to the pool.
                    handle.slot().content().detach(self.scene.as_mut());
                    handle.slot().set_state(ChunkState::Unused);
                    self.pool.release(handle);
                    self.stats.stale_results += 1;
                }
            }
        }
    }

    /// Request a background build for `pos`. The table entry exists from
    /// this moment on; the chunk goes active when its result drains.
    fn load_chunk(&mut self, pos: ChunkPos) {
        let handle = self.pool.acquire();
        handle.slot().content().position = pos.to_world_pos(self.config.chunk_size);
        self.chunks.insert(
            pos,
            TableEntry {
                id: handle.id(),
                slot: handle.share_slot(),
                attached: None,
            },
        );
        self.queues.pending.lock().push(handle);
        if let Some(wake) = &self.wake {
            // Fails only once the workers are gone.
            let _ = wake.send(());
        }
    }

    /// Build and attach `pos` on the control thread, bypassing the queue.
    fn load_chunk_sync(&mut self, pos: ChunkPos) {
        let handle = self.pool.acquire();
        handle.slot().set_state(ChunkState::Building);
        {
            let mut content = handle.slot().content();
            content.position = pos.to_world_pos(self.config.chunk_size);
            content.build_terrain(self.config.chunk_size, self.sampler.as_ref());
            content.attach(self.scene.as_mut());
        }
        handle.slot().set_state(ChunkState::Active);
        self.chunks.insert(
            pos,
            TableEntry {
                id: handle.id(),
                slot: handle.share_slot(),
                attached: Some(handle),
            },
        );
        self.stats.sync_loads += 1;
        self.stats.chunks_attached += 1;
    }

    /// Evict one tabled coordinate.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is not tabled: the eviction set must always be a
    /// subset of the table.
    fn unload_chunk(&mut self, pos: ChunkPos) {
        // Capture the entry first; it must never be read back out of the
        // table after removal.
        let entry = self
            .chunks
            .remove(&pos)
            .unwrap_or_else(|| panic!("[StreamingManager] unload of untabled chunk at {pos:?}"));
        self.stats.chunks_evicted += 1;

        // Cancel a queued request no worker has picked up yet. The state is
        // read under the pending-stack lock: workers publish Building
        // before releasing it, so a stack miss here means the state is
        // already visible.
        let (cancelled, state) = {
            let mut pending = self.queues.pending.lock();
            let cancelled = pending
                .iter()
                .position(|h| h.id() == entry.id)
                .map(|i| pending.swap_remove(i));
            (cancelled, entry.slot.state())
        };

        if let Some(handle) = cancelled {
            handle.slot().set_state(ChunkState::Unused);
            self.pool.release(handle);
            return;
        }

        if state == ChunkState::Building {
            // An in-flight build owns the content lock. Leave the slot
            // alone; the result drain will find the table entry gone and
            // pool it then.
            return;
        }

        if let Some(handle) = entry.attached {
            handle.slot().content().detach(self.scene.as_mut());
            handle.slot().set_state(ChunkState::Unused);
            self.pool.release(handle);
        }
    }

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn loaded_positions(&self) -> Vec<ChunkPos> {
        self.chunks.keys().copied().collect()
    }

    /// Lifecycle state of a tabled chunk.
    pub fn chunk_state(&self, pos: ChunkPos) -> Option<ChunkState> {
        self.chunks.get(&pos).map(|entry| entry.slot.state())
    }

    /// Requests waiting for a worker.
    pub fn pending_loads(&self) -> usize {
        self.queues.pending.lock().len()
    }

    /// Finished builds waiting for the control thread.
    pub fn pending_results(&self) -> usize {
        self.queues.results.lock().len()
    }

    /// Slots sitting in the free list.
    pub fn pooled_chunks(&self) -> usize {
        self.pool.pooled()
    }

    /// Slots ever allocated.
    pub fn allocated_chunks(&self) -> usize {
        self.pool.allocated()
    }

    pub fn stats(&self) -> &StreamingStats {
        &self.stats
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }
}

impl Drop for StreamingManager {
    fn drop(&mut self) {
        // Disconnecting the token channel shuts the workers down.
        self.wake.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("[StreamingManager] chunk worker panicked");
            }
        }
    }
}

/// Unload once any axis distance exceeds 1.5x the load radius. The wider
/// threshold keeps chunks near the load boundary from thrashing while the
/// observer oscillates across a chunk edge.
pub(crate) fn beyond_unload_distance(pos: ChunkPos, center: ChunkPos, load_radius: i64) -> bool {
    2 * pos.max_axis_distance(center) > 3 * load_radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::SharedObserver;
    use crate::scene::HeadlessScene;
    use glam::Vec3;

    struct FlatSampler(f64);

    impl HeightSampler for FlatSampler {
        fn sample(&self, _x: f64, _z: f64) -> f64 {
            self.0
        }
    }

    /// Manager with no background workers, so every queue transition is
    /// driven (and observable) from the test.
    fn test_manager(load_radius: i64) -> (StreamingManager, Arc<SharedObserver>) {
        let observer = Arc::new(SharedObserver::new(Vec3::ZERO));
        let config = TerrainConfig {
            chunk_size: 16.0,
            subdivisions: 8,
            load_radius,
            worker_threads: Some(0),
            ..TerrainConfig::default()
        };
        let manager = StreamingManager::new(
            config,
            Arc::new(FlatSampler(0.25)),
            Arc::clone(&observer) as Arc<dyn ObserverSource>,
            Box::new(HeadlessScene::new()),
        )
        .expect("manager construction");
        (manager, observer)
    }

    fn desired_cube(center: ChunkPos, r: i64, floor: i64, ceiling: i64) -> Vec<ChunkPos> {
        let mut cube = Vec::new();
        for y in (center.y - r).max(floor)..=(center.y + r).min(ceiling) {
            for x in (center.x - r)..=(center.x + r) {
                for z in (center.z - r)..=(center.z + r) {
                    cube.push(ChunkPos::new(x, y, z));
                }
            }
        }
        cube
    }

    #[test]
    fn test_unload_distance_hysteresis() {
        let center = ChunkPos::new(0, 0, 0);
        for (d, expect) in [(4, false), (5, false), (6, false), (7, true)] {
            assert_eq!(
                beyond_unload_distance(ChunkPos::new(d, 0, 0), center, 4),
                expect,
                "axis distance {d}"
            );
        }
        // Any axis triggers on its own.
        assert!(beyond_unload_distance(ChunkPos::new(0, 7, 0), center, 4));
    }

    #[test]
    fn test_tick_tables_the_desired_cube() {
        let (mut manager, _observer) = test_manager(2);
        manager.tick();

        let mut expected = desired_cube(ChunkPos::new(0, 0, 0), 2, -3, 3);
        let mut loaded = manager.loaded_positions();
        expected.sort_unstable_by_key(|p| (p.x, p.y, p.z));
        loaded.sort_unstable_by_key(|p| (p.x, p.y, p.z));
        assert_eq!(loaded, expected);
    }

    #[test]
    fn test_observer_chunk_built_synchronously() {
        let (mut manager, _observer) = test_manager(2);
        manager.tick();
        assert_eq!(
            manager.chunk_state(ChunkPos::new(0, 0, 0)),
            Some(ChunkState::Active)
        );
        assert_eq!(manager.stats().sync_loads, 1);
        // Everything else is still queued.
        assert_eq!(manager.pending_loads(), manager.loaded_count() - 1);
    }

    #[test]
    fn test_observer_outside_bounds_gets_no_priority_chunk() {
        let (mut manager, observer) = test_manager(1);
        observer.set_position(Vec3::new(0.0, 10.0 * 16.0, 0.0));
        manager.tick();
        assert_eq!(manager.stats().sync_loads, 0);
        // The vertical clip also empties the desired set at y = 10.
        assert_eq!(manager.loaded_count(), 0);
    }

    #[test]
    fn test_eviction_respects_hysteresis() {
        let (mut manager, observer) = test_manager(4);
        manager.tick();
        assert!(manager.is_loaded(ChunkPos::new(0, 0, 0)));

        // Axis distance 5: inside 1.5x radius, retained.
        observer.set_position(Vec3::new(5.0 * 16.0, 0.0, 0.0));
        manager.tick();
        assert!(manager.is_loaded(ChunkPos::new(0, 0, 0)));

        // Axis distance 7: beyond 1.5x radius, evicted.
        observer.set_position(Vec3::new(7.0 * 16.0, 0.0, 0.0));
        manager.tick();
        assert!(!manager.is_loaded(ChunkPos::new(0, 0, 0)));
        assert!(manager.stats().chunks_evicted > 0);
    }

    #[test]
    fn test_cancelled_pending_load_returns_to_pool() {
        let (mut manager, observer) = test_manager(1);
        manager.tick();
        assert!(manager.pending_loads() > 0);
        let allocated = manager.allocated_chunks();

        // Move far enough that every tabled coordinate is beyond the
        // unload distance; nothing ever started building, so the cancelled
        // requests cover the reloads at the new center without a single
        // fresh allocation.
        observer.set_position(Vec3::new(100.0 * 16.0, 0.0, 0.0));
        manager.tick();
        assert!(!manager.is_loaded(ChunkPos::new(0, 0, 0)));
        assert_eq!(manager.allocated_chunks(), allocated);
    }

    #[test]
    fn test_eviction_defers_while_building_then_discards_stale() {
        let (mut manager, observer) = test_manager(1);
        manager.tick();

        // Stand in for a worker: pop one request and publish Building.
        let handle = {
            let mut pending = manager.queues.pending.lock();
            let handle = pending.pop().expect("queued load");
            handle.slot().set_state(ChunkState::Building);
            handle
        };
        let pos = ChunkPos::from_chunk_origin(
            handle.slot().content().position,
            manager.config.chunk_size,
        );

        // Eviction must defer: the build owns the content lock.
        observer.set_position(Vec3::new(100.0 * 16.0, 0.0, 0.0));
        manager.tick();
        assert!(!manager.is_loaded(pos));
        assert_eq!(handle.slot().state(), ChunkState::Building);
        // Buffers are still valid for the in-flight build.
        assert!(handle.slot().content().grid().capacity() > 0);

        // Finish the build and hand the result back.
        handle
            .slot()
            .content()
            .build_terrain(manager.config.chunk_size, manager.sampler.as_ref());
        let id = handle.id();
        manager.queues.results.lock().push(handle);

        let stale_before = manager.stats().stale_results;
        manager.tick();
        assert_eq!(manager.stats().stale_results, stale_before + 1);
        // The slot went back to the pool, reset to Unused.
        let pooled = manager.pool.acquire();
        assert_eq!(pooled.id(), id);
        assert_eq!(pooled.slot().state(), ChunkState::Unused);
        manager.pool.release(pooled);
    }

    #[test]
    fn test_drained_result_goes_active_when_table_matches() {
        let (mut manager, _observer) = test_manager(1);
        manager.tick();

        let handle = {
            let mut pending = manager.queues.pending.lock();
            let handle = pending.pop().expect("queued load");
            handle.slot().set_state(ChunkState::Building);
            handle
        };
        let pos = ChunkPos::from_chunk_origin(
            handle.slot().content().position,
            manager.config.chunk_size,
        );
        handle
            .slot()
            .content()
            .build_terrain(manager.config.chunk_size, manager.sampler.as_ref());
        manager.queues.results.lock().push(handle);

        manager.tick();
        assert_eq!(manager.chunk_state(pos), Some(ChunkState::Active));
    }

    #[test]
    fn test_pool_reused_after_relocation() {
        let (mut manager, observer) = test_manager(1);
        manager.tick();
        // Cancel everything by leaving; the same tick reloads around the
        // new center, so the free list drains straight back to zero.
        observer.set_position(Vec3::new(100.0 * 16.0, 0.0, 0.0));
        manager.tick();
        let allocated = manager.allocated_chunks();
        assert_eq!(manager.pooled_chunks(), 0);

        // Settling somewhere new must reuse pooled slots, not allocate.
        observer.set_position(Vec3::new(100.0 * 16.0, 0.0, 100.0 * 16.0));
        manager.tick();
        assert_eq!(manager.allocated_chunks(), allocated);
    }

    #[test]
    #[should_panic(expected = "untabled chunk")]
    fn test_unload_of_untabled_coordinate_panics() {
        let (mut manager, _observer) = test_manager(1);
        manager.unload_chunk(ChunkPos::new(9, 9, 9));
    }

    #[test]
    fn test_prime_loads_synchronously() {
        let (mut manager, _observer) = test_manager(1);
        manager.prime();
        // 5x5 on x/z, full floor..=ceiling span on y.
        assert_eq!(manager.loaded_count(), 5 * 5 * 7);
        assert_eq!(manager.pending_loads(), 0);
        for pos in manager.loaded_positions() {
            assert_eq!(manager.chunk_state(pos), Some(ChunkState::Active));
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let observer = Arc::new(SharedObserver::default());
        let config = TerrainConfig {
            subdivisions: 0,
            ..TerrainConfig::default()
        };
        let result = StreamingManager::new(
            config,
            Arc::new(FlatSampler(0.0)),
            observer,
            Box::new(HeadlessScene::new()),
        );
        assert!(result.is_err());
    }
}
