use glam::DVec3;

use super::arena::NodeId;
use crate::mesh::SectionId;

/// Offsets from a node center to its 8 child centers, in units of the
/// node's extent. Index order is the binary pattern (-x-y-z, -x-y+z, ...).
pub const CHILD_OFFSETS: [DVec3; 8] = [
    DVec3::new(-0.5, -0.5, -0.5),
    DVec3::new(-0.5, -0.5, 0.5),
    DVec3::new(-0.5, 0.5, -0.5),
    DVec3::new(-0.5, 0.5, 0.5),
    DVec3::new(0.5, -0.5, -0.5),
    DVec3::new(0.5, -0.5, 0.5),
    DVec3::new(0.5, 0.5, -0.5),
    DVec3::new(0.5, 0.5, 0.5),
];

/// One octree node: a cubic chunk of the volume.
///
/// Children are all-or-nothing: `None` while the node has never expanded,
/// otherwise all 8 handles. A node can be interior yet still carry a mesh
/// section briefly, between its leaf→interior transition and the deferred
/// cleanup that retires the stale mesh.
#[derive(Debug, Clone)]
pub struct ChunkNode {
    /// Subdivision count from the root.
    pub depth: u8,
    /// World-space center, fixed at creation.
    pub center: DVec3,
    /// Child handles, populated on first expansion.
    pub children: Option<[NodeId; 8]>,
    /// Whether this node currently represents a renderable surface.
    pub leaf: bool,
    /// Mesh section backing this node, `SectionId::NONE` if unmeshed.
    pub section: SectionId,
}

impl ChunkNode {
    pub fn new(depth: u8, center: DVec3) -> Self {
        Self {
            depth,
            center,
            children: None,
            leaf: false,
            section: SectionId::NONE,
        }
    }

    /// Half-size of this node's cube: `volume_extent / 2^depth`.
    pub fn extent(&self, volume_extent: f64) -> f64 {
        volume_extent / f64::powi(2.0, self.depth as i32)
    }

    /// Center of child `i`.
    pub fn child_center(&self, child_index: usize, volume_extent: f64) -> DVec3 {
        self.center + CHILD_OFFSETS[child_index] * self.extent(volume_extent)
    }

    /// Whether `target` is close enough that this node should subdivide.
    ///
    /// Distance is measured from the target to the surface of the node's
    /// bounding box; the comparison is strict, so a target exactly on the
    /// threshold does not expand the node.
    pub fn is_within_reach(&self, target: DVec3, volume_extent: f64, lod_factor: f64) -> bool {
        let extent = self.extent(volume_extent);
        let to_center = (target - self.center).abs();
        let outside = (to_center - DVec3::splat(extent)).max(DVec3::ZERO);
        outside.length() < lod_factor * extent * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_halves_per_depth() {
        let volume_extent = 1024.0;
        let mut previous = f64::INFINITY;
        for depth in 0..10u8 {
            let node = ChunkNode::new(depth, DVec3::ZERO);
            let extent = node.extent(volume_extent);
            assert_eq!(extent, volume_extent / f64::powi(2.0, depth as i32));
            assert!(extent < previous, "extent must strictly decrease");
            previous = extent;
        }
    }

    #[test]
    fn test_child_centers_enumerate_octants() {
        let volume_extent = 64.0;
        let node = ChunkNode::new(1, DVec3::new(16.0, 16.0, 16.0));
        let half = node.extent(volume_extent) / 2.0; // 16

        let centers: Vec<DVec3> = (0..8).map(|i| node.child_center(i, volume_extent)).collect();
        // All centers distinct and offset by +-half on every axis.
        for (i, c) in centers.iter().enumerate() {
            let delta = *c - node.center;
            assert_eq!(delta.x.abs(), half);
            assert_eq!(delta.y.abs(), half);
            assert_eq!(delta.z.abs(), half);
            for other in centers.iter().skip(i + 1) {
                assert_ne!(c, other);
            }
        }
    }

    #[test]
    fn test_reach_inside_box_is_always_within() {
        let node = ChunkNode::new(0, DVec3::ZERO);
        // Target inside the box: surface distance is zero.
        assert!(node.is_within_reach(DVec3::new(10.0, -20.0, 30.0), 100.0, 0.001));
    }

    #[test]
    fn test_reach_threshold_is_strict() {
        let node = ChunkNode::new(0, DVec3::ZERO);
        let volume_extent = 100.0;
        let lod_factor = 1.0;
        // Surface distance along +x from the box at extent 100 is x - 100;
        // threshold is lod_factor * extent * 2 = 200.
        assert!(node.is_within_reach(DVec3::new(299.9, 0.0, 0.0), volume_extent, lod_factor));
        assert!(!node.is_within_reach(DVec3::new(300.0, 0.0, 0.0), volume_extent, lod_factor));
        assert!(!node.is_within_reach(DVec3::new(301.0, 0.0, 0.0), volume_extent, lod_factor));
    }

    #[test]
    fn test_reach_zero_extent_does_not_panic() {
        let node = ChunkNode::new(20, DVec3::ZERO);
        let extent = node.extent(0.0);
        assert_eq!(extent, 0.0);
        // Threshold is zero, strict comparison: never within reach.
        assert!(!node.is_within_reach(DVec3::ZERO, 0.0, 1.0));
    }
}
