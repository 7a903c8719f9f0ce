use glam::DVec3;

use super::DensityField;

/// Normalized sphere distance field centered on the origin.
///
/// Density is `|p| / radius`, so with an isovalue of 1.0 the surface sits
/// exactly on the sphere of the given radius and the inside samples below
/// the threshold.
#[derive(Debug, Clone, Copy)]
pub struct SphereField {
    pub radius: f64,
}

impl SphereField {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl DensityField for SphereField {
    fn density(&self, world_pos: DVec3, _time: f64) -> f64 {
        world_pos.length() / self.radius
    }
}
