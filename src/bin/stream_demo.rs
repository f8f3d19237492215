//! Headless streaming demo: walks an observer across the terrain and
//! reports what the streamer loads, evicts, and recycles along the way.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use glam::Vec3;

use voxelstream::{
    HeadlessScene, NoiseHeightSampler, SharedObserver, StreamingManager, TerrainConfig,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = TerrainConfig {
        load_radius: 3,
        subdivisions: 16,
        drain_budget: 4,
        seed: Some(1337),
        ..TerrainConfig::default()
    };

    let sampler = match config.seed {
        Some(seed) => NoiseHeightSampler::new(seed),
        None => NoiseHeightSampler::randomized(),
    };
    log::info!("[Demo] seed {}", sampler.seed());

    let observer = Arc::new(SharedObserver::new(Vec3::ZERO));
    let chunk_size = config.chunk_size;
    let mut manager = StreamingManager::new(
        config,
        Arc::new(sampler),
        observer.clone(),
        Box::new(HeadlessScene::new()),
    )?;

    manager.prime();
    log::info!(
        "[Demo] primed: {} chunks resident",
        manager.loaded_count()
    );

    // Stroll two chunks per step along +X, ticking as a game loop would.
    for step in 0..40 {
        let pos = Vec3::new(step as f32 * chunk_size * 2.0, 4.0, 0.0);
        observer.set_position(pos);
        manager.tick();

        if step % 10 == 0 {
            let stats = manager.stats();
            log::info!(
                "[Demo] step {}: {} resident, {} pending, {} pooled, {} attached / {} evicted / {} stale",
                step,
                manager.loaded_count(),
                manager.pending_loads(),
                manager.pooled_chunks(),
                stats.chunks_attached,
                stats.chunks_evicted,
                stats.stale_results
            );
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    // Let the workers finish what is still in flight.
    while manager.pending_loads() > 0 || manager.pending_results() > 0 {
        manager.tick();
        std::thread::sleep(Duration::from_millis(5));
    }

    let stats = manager.stats();
    log::info!(
        "[Demo] done: {} resident, {} allocated, attached {} evicted {} stale {} sync {}",
        manager.loaded_count(),
        manager.allocated_chunks(),
        stats.chunks_attached,
        stats.chunks_evicted,
        stats.stale_results,
        stats.sync_loads
    );
    Ok(())
}
