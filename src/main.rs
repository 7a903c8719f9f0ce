//! Terrain Demo
//!
//! Drives a voxel volume headlessly: a viewpoint orbits a noise-displaced
//! planet while the pipeline keeps the chunk meshes in sync, with stats
//! logged every second of simulated time.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::DVec3;
use rand::Rng;

use voxel_terrain::{CollectedMeshSink, NoiseField, VolumeConfig, VoxelVolume};

const TICKS: u32 = 600;
const TICK_SECONDS: f64 = 1.0 / 30.0;

fn load_config() -> Result<VolumeConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(VolumeConfig {
            volume_extent: 8192.0,
            max_depth: 5,
            ..Default::default()
        });
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path))?;
    let config: VolumeConfig =
        toml::from_str(&text).with_context(|| format!("parsing config {}", path))?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let seed: u32 = rand::thread_rng().gen();
    log::info!("[Demo] seed {}", seed);

    let planet_radius = config.volume_extent * 0.5;
    let field = Arc::new(NoiseField::new(seed, planet_radius));
    let mut volume = VoxelVolume::new(config, field)?;
    let mut sink = CollectedMeshSink::with_build_latency(2);

    let orbit_radius = planet_radius * 1.05;
    let started = Instant::now();

    for tick in 0..TICKS {
        let time = tick as f64 * TICK_SECONDS;
        // One slow orbit over the run, skimming the surface.
        let angle = time * 0.05 * std::f64::consts::TAU;
        let origin = DVec3::new(
            orbit_radius * angle.cos(),
            orbit_radius * 0.1 * (angle * 3.0).sin(),
            orbit_radius * angle.sin(),
        );

        volume.update(origin, &mut sink, time);
        sink.tick();

        if tick % 30 == 29 {
            let stats = volume.stats();
            log::info!(
                "[Demo] t={:>5.1}s sections={} nodes={} meshed={} cleanups={} backlog={}",
                time,
                sink.section_count(),
                volume.octree().node_count(),
                stats.chunks_meshed,
                stats.cleanups_run,
                volume.cleanup_backlog()
            );
        }
    }

    let stats = volume.stats().clone();
    log::info!(
        "[Demo] done in {:.2?}: {} chunks queued, {} meshed, {} sections created, {} cleanups",
        started.elapsed(),
        stats.chunks_queued,
        stats.chunks_meshed,
        stats.sections_created,
        stats.cleanups_run
    );
    Ok(())
}
