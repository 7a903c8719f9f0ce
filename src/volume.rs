//! Voxel Volume
//!
//! Ties the LOD octree, the generation pipeline and a density field into
//! one object driven once per frame. The volume is single-threaded at its
//! surface; only the pipeline's regenerate stage runs on workers.

use std::sync::Arc;

use glam::DVec3;

use crate::config::VolumeConfig;
use crate::error::TerrainResult;
use crate::field::DensityField;
use crate::mesh::MeshSink;
use crate::octree::LodOctree;
use crate::pipeline::{GenerationPipeline, PipelineStats};

pub struct VoxelVolume {
    config: VolumeConfig,
    octree: LodOctree,
    pipeline: GenerationPipeline,
}

impl VoxelVolume {
    pub fn new(config: VolumeConfig, field: Arc<dyn DensityField>) -> TerrainResult<Self> {
        config.validate()?;
        log::info!(
            "[VoxelVolume] extent {} | resolution {} | max depth {} | {} worker(s)",
            config.volume_extent,
            config.chunk_resolution,
            config.max_depth,
            config.worker_count
        );

        let octree = LodOctree::new(config.volume_extent, config.max_depth, config.lod_factor);
        let pipeline = GenerationPipeline::new(&config, field);
        Ok(Self {
            config,
            octree,
            pipeline,
        })
    }

    /// Advance the volume by one tick.
    ///
    /// Rechunks the octree toward `lod_origin` when the pipeline is idle
    /// and the sink is accepting work, then runs the bounded remesh and
    /// cleanup passes. With zero configured workers the regenerate stage
    /// runs inline here, which makes a single `update` call fully
    /// deterministic. A sink that is not ready, or that refuses a section,
    /// stalls the affected pass until a later tick; nothing is dropped.
    pub fn update(&mut self, lod_origin: DVec3, sink: &mut dyn MeshSink, time: f64) {
        if self.pipeline.is_quiescent() && sink.is_ready() {
            let dirty = self.octree.rechunk_to_center(lod_origin);
            for group in &dirty.groups {
                self.pipeline.enqueue_group(group, &self.octree, time);
            }
        }

        if self.config.worker_count == 0 {
            self.pipeline.drain_regenerate_once();
        }

        self.pipeline.process_remesh(&mut self.octree, sink);
        self.pipeline.process_cleanup(&mut self.octree, sink);
    }

    /// Throw away every chunk and section and start from an empty tree.
    ///
    /// Refused (returning `false`) while chunks are in flight; call again
    /// once [`VoxelVolume::is_quiescent`] reports true.
    pub fn regenerate(&mut self, sink: &mut dyn MeshSink) -> bool {
        if !self.pipeline.is_quiescent() {
            log::warn!("[VoxelVolume] regenerate deferred: pipeline busy");
            return false;
        }
        self.pipeline.reset(&mut self.octree, sink);
        log::info!("[VoxelVolume] volume regenerated from scratch");
        true
    }

    pub fn is_quiescent(&self) -> bool {
        self.pipeline.is_quiescent()
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    pub fn octree(&self) -> &LodOctree {
        &self.octree
    }

    pub fn stats(&self) -> &PipelineStats {
        self.pipeline.stats()
    }

    pub fn cleanup_backlog(&self) -> usize {
        self.pipeline.cleanup_backlog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::SphereField;
    use crate::mesh::CollectedMeshSink;

    fn test_config() -> VolumeConfig {
        VolumeConfig {
            volume_extent: 64.0,
            chunk_resolution: 8,
            max_depth: 2,
            worker_count: 0,
            per_tick_limit: 64,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = VolumeConfig {
            volume_extent: -5.0,
            ..test_config()
        };
        let field = Arc::new(SphereField::new(32.0));
        assert!(VoxelVolume::new(config, field).is_err());
    }

    #[test]
    fn test_update_produces_sections() {
        let field = Arc::new(SphereField::new(32.0));
        let mut volume = VoxelVolume::new(test_config(), field).expect("volume");
        let mut sink = CollectedMeshSink::new();

        for _ in 0..16 {
            volume.update(DVec3::ZERO, &mut sink, 0.0);
        }

        assert!(volume.is_quiescent());
        assert!(sink.section_count() > 0, "sphere surface must mesh");
        assert!(volume.stats().chunks_meshed > 0);
    }

    #[test]
    fn test_regenerate_clears_everything() {
        let field = Arc::new(SphereField::new(32.0));
        let mut volume = VoxelVolume::new(test_config(), field).expect("volume");
        let mut sink = CollectedMeshSink::new();

        for _ in 0..16 {
            volume.update(DVec3::ZERO, &mut sink, 0.0);
        }
        assert!(sink.section_count() > 0);

        assert!(volume.regenerate(&mut sink));
        assert_eq!(sink.section_count(), 0);
        assert_eq!(volume.octree().node_count(), 1);
    }
}
