use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};

/// Volume configuration, validated at construction.
///
/// Defaults mirror a volume spanning roughly half a million world units with
/// 16-voxel chunks subdivided 7 times near the viewpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Half-size of the volume's bounding cube, in world units.
    pub volume_extent: f64,
    /// Voxels per chunk axis.
    pub chunk_resolution: u32,
    /// Maximum octree subdivisions below the root.
    pub max_depth: u8,
    /// Scales the distance at which chunks subdivide.
    pub lod_factor: f64,
    /// Density threshold defining the rendered surface.
    pub surface_isovalue: f64,
    /// Chunk depths within this distance of `max_depth` get collision meshes.
    pub collision_inverse_depth: u8,
    /// Worker threads for density sampling and meshing. Zero means no
    /// workers are spawned; callers drive regeneration manually (test mode).
    pub worker_count: usize,
    /// Maximum remesh/cleanup items handled per tick.
    pub per_tick_limit: usize,
    /// Optional pause between worker items, throttling background load.
    #[serde(with = "duration_secs")]
    pub worker_rest: Duration,
    /// Emit triangles with reversed winding.
    pub reverse_winding: bool,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            volume_extent: 524288.0,
            chunk_resolution: 16,
            max_depth: 7,
            lod_factor: 1.0,
            surface_isovalue: 1.0,
            collision_inverse_depth: 3,
            worker_count: default_worker_count(),
            per_tick_limit: 8,
            worker_rest: Duration::ZERO,
            reverse_winding: false,
        }
    }
}

fn default_worker_count() -> usize {
    num_cpus::get().saturating_sub(1).clamp(1, 3)
}

impl VolumeConfig {
    /// Validate all fields, returning the first violation found.
    pub fn validate(&self) -> TerrainResult<()> {
        if !(self.volume_extent > 0.0) {
            return Err(TerrainError::invalid_config(
                "volume_extent",
                format!("must be > 0, got {}", self.volume_extent),
            ));
        }
        if self.chunk_resolution < 1 {
            return Err(TerrainError::invalid_config(
                "chunk_resolution",
                "must be >= 1",
            ));
        }
        if !(self.lod_factor > 0.0) {
            return Err(TerrainError::invalid_config(
                "lod_factor",
                format!("must be > 0, got {}", self.lod_factor),
            ));
        }
        if !self.surface_isovalue.is_finite() {
            return Err(TerrainError::invalid_config(
                "surface_isovalue",
                "must be finite",
            ));
        }
        if self.per_tick_limit < 1 {
            return Err(TerrainError::invalid_config("per_tick_limit", "must be >= 1"));
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
