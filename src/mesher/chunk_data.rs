use glam::DVec3;

use crate::mesh::MeshBuffers;
use crate::octree::NodeId;
use crate::util::Array3;

/// World-space placement of one chunk: a cube centered at `center` with
/// half-size `extent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkGeometry {
    pub center: DVec3,
    pub extent: f64,
}

impl ChunkGeometry {
    /// The (-x, -y, -z) corner of the cube.
    pub fn min_corner(&self) -> DVec3 {
        self.center - DVec3::splat(self.extent)
    }

    /// Edge length of one voxel cell at the given grid resolution.
    pub fn voxel_size(&self, resolution: u32) -> f64 {
        (self.extent * 2.0) / resolution as f64
    }

    /// World position of grid corner `(x, y, z)`, where the grid has
    /// `resolution + 1` corners per axis.
    pub fn corner_position(&self, resolution: u32, corner: [u32; 3]) -> DVec3 {
        let voxel = self.voxel_size(resolution);
        self.min_corner()
            + DVec3::new(
                corner[0] as f64 * voxel,
                corner[1] as f64 * voxel,
                corner[2] as f64 * voxel,
            )
    }
}

/// Mutable scratch for generating one chunk.
///
/// Owned by exactly one pipeline stage at a time and handed between stages
/// by value, so no locking is needed. `corner_densities` caches field
/// samples at grid corners with NaN marking unsampled slots; a chunk at
/// resolution R therefore samples the field at most `(R + 1)^3` times.
pub struct ChunkData {
    pub node: NodeId,
    pub geometry: ChunkGeometry,
    pub corner_densities: Array3<f64>,
    pub buffers: MeshBuffers,
}

impl ChunkData {
    pub fn new(node: NodeId, geometry: ChunkGeometry, resolution: u32) -> Self {
        Self {
            node,
            geometry,
            corner_densities: Array3::cubic(resolution as usize + 1, f64::NAN),
            buffers: MeshBuffers::default(),
        }
    }

    /// Forget all cached samples and generated geometry so the buffer can
    /// be reused for another chunk.
    pub fn reset(&mut self, node: NodeId, geometry: ChunkGeometry) {
        self.node = node;
        self.geometry = geometry;
        self.corner_densities.reset(f64::NAN);
        self.buffers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_geometry_corner_positions() {
        let geometry = ChunkGeometry {
            center: DVec3::new(100.0, 0.0, -50.0),
            extent: 8.0,
        };
        assert_eq!(geometry.min_corner(), DVec3::new(92.0, -8.0, -58.0));
        assert_eq!(geometry.voxel_size(16), 1.0);
        assert_eq!(
            geometry.corner_position(16, [0, 0, 0]),
            geometry.min_corner()
        );
        assert_eq!(
            geometry.corner_position(16, [16, 16, 16]),
            DVec3::new(108.0, 8.0, -42.0)
        );
    }

    #[test]
    fn test_reset_clears_cache_and_buffers() {
        let geometry = ChunkGeometry {
            center: DVec3::ZERO,
            extent: 1.0,
        };
        let node = crate::octree::NodeArena::new().insert(crate::octree::ChunkNode::new(0, DVec3::ZERO));
        let mut data = ChunkData::new(node, geometry, 2);
        data.corner_densities[[0, 0, 0]] = 0.25;
        data.buffers.vertices.push(crate::mesh::MeshVertex {
            position: [0.0; 3],
            normal: [0.0; 3],
        });

        data.reset(node, geometry);
        assert!(data.corner_densities[[0, 0, 0]].is_nan());
        assert!(data.buffers.vertices.is_empty());
    }
}
