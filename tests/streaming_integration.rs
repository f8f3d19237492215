//! End-to-end streaming tests with real background workers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;

use voxelstream::{
    ChunkPos, ChunkState, HeadlessScene, HeightSampler, SharedObserver, StreamingManager,
    TerrainConfig,
};

/// Constant-height field so chunk contents are predictable.
struct FlatSampler(f64);

impl HeightSampler for FlatSampler {
    fn sample(&self, _x: f64, _z: f64) -> f64 {
        self.0
    }
}

fn test_config(load_radius: i64) -> TerrainConfig {
    TerrainConfig {
        chunk_size: 16.0,
        subdivisions: 8,
        load_radius,
        floor: -1,
        ceiling: 1,
        worker_threads: Some(2),
        drain_budget: 8,
        ..TerrainConfig::default()
    }
}

fn spawn_manager(
    config: TerrainConfig,
    observer: Arc<SharedObserver>,
) -> StreamingManager {
    StreamingManager::new(
        config,
        Arc::new(FlatSampler(0.25)),
        observer,
        Box::new(HeadlessScene::new()),
    )
    .expect("streaming manager should start")
}

/// Tick until `done` holds or the deadline passes.
fn converge(manager: &mut StreamingManager, done: impl Fn(&StreamingManager) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while !done(manager) {
        assert!(
            Instant::now() < deadline,
            "streaming did not converge within the deadline"
        );
        manager.tick();
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn desired_cube(center: ChunkPos, config: &TerrainConfig) -> Vec<ChunkPos> {
    let r = config.load_radius;
    let mut cube = Vec::new();
    for y in config.floor..=config.ceiling {
        for x in (center.x - r)..=(center.x + r) {
            for z in (center.z - r)..=(center.z + r) {
                cube.push(ChunkPos::new(x, y, z));
            }
        }
    }
    cube
}

#[test]
fn test_workers_converge_on_desired_cube() {
    let config = test_config(2);
    let observer = Arc::new(SharedObserver::new(Vec3::new(8.0, 8.0, 8.0)));
    let mut manager = spawn_manager(config.clone(), observer);

    let cube = desired_cube(ChunkPos::new(0, 0, 0), &config);
    converge(&mut manager, |m| {
        cube.iter()
            .all(|pos| m.chunk_state(*pos) == Some(ChunkState::Active))
    });

    assert_eq!(manager.loaded_count(), cube.len());
    assert_eq!(manager.pending_loads(), 0);
    assert!(manager.stats().chunks_attached > 0);
}

#[test]
fn test_relocation_evicts_and_recycles() {
    let config = test_config(1);
    let observer = Arc::new(SharedObserver::new(Vec3::ZERO));
    let mut manager = spawn_manager(config.clone(), observer.clone());

    let home = desired_cube(ChunkPos::new(0, 0, 0), &config);
    converge(&mut manager, |m| {
        home.iter()
            .all(|pos| m.chunk_state(*pos) == Some(ChunkState::Active))
    });
    let allocated = manager.allocated_chunks();

    // Jump far past the hysteresis band and settle at the new spot.
    observer.set_position(Vec3::new(10.0 * 16.0, 0.0, 0.0));
    let away = desired_cube(ChunkPos::new(10, 0, 0), &config);
    converge(&mut manager, |m| {
        away.iter()
            .all(|pos| m.chunk_state(*pos) == Some(ChunkState::Active))
            && m.pending_results() == 0
    });

    for pos in &home {
        assert!(
            !manager.is_loaded(*pos),
            "chunk {pos:?} should have been evicted"
        );
    }
    assert!(manager.stats().chunks_evicted >= home.len());
    // The new neighborhood rebuilt out of recycled slots, not fresh ones.
    assert!(
        manager.allocated_chunks() <= allocated + config.drain_budget,
        "relocation allocated {} new slots",
        manager.allocated_chunks() - allocated
    );
}

#[test]
fn test_observer_chunk_loads_synchronously() {
    let config = test_config(2);
    let observer = Arc::new(SharedObserver::new(Vec3::ZERO));
    let mut manager = spawn_manager(config, observer.clone());

    // One tick is enough for the chunk under the observer, whatever the
    // workers are still chewing on.
    observer.set_position(Vec3::new(5.0 * 16.0 + 1.0, 1.0, 0.0));
    manager.tick();
    assert_eq!(
        manager.chunk_state(ChunkPos::new(5, 0, 0)),
        Some(ChunkState::Active)
    );
    assert!(manager.stats().sync_loads >= 1);
}

#[test]
fn test_shutdown_with_work_in_flight() {
    let config = test_config(3);
    let observer = Arc::new(SharedObserver::new(Vec3::ZERO));
    let mut manager = spawn_manager(config, observer);
    manager.tick();
    // Drop while the request stack is still full; join must not hang.
    drop(manager);
}
