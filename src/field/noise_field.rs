use glam::DVec3;
use noise::{NoiseFn, Perlin};

use super::DensityField;

/// Noise-displaced sphere field.
///
/// Starts from the normalized sphere distance and perturbs the surface with
/// two octaves of Perlin noise, giving rolling planetary terrain. Time is
/// ignored; the field depends only on seed and position.
pub struct NoiseField {
    surface_noise: Perlin,
    detail_noise: Perlin,
    radius: f64,
    /// Surface displacement as a fraction of the radius.
    amplitude: f64,
    /// Noise feature size in world units.
    feature_scale: f64,
}

impl NoiseField {
    pub fn new(seed: u32, radius: f64) -> Self {
        Self {
            surface_noise: Perlin::new(seed),
            detail_noise: Perlin::new(seed.wrapping_add(1)),
            radius,
            amplitude: 0.05,
            feature_scale: radius * 0.25,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }
}

impl DensityField for NoiseField {
    fn density(&self, world_pos: DVec3, _time: f64) -> f64 {
        let base = world_pos.length() / self.radius;

        let p = world_pos / self.feature_scale;
        let broad = self.surface_noise.get([p.x, p.y, p.z]);
        let fine = self.detail_noise.get([p.x * 4.0, p.y * 4.0, p.z * 4.0]) * 0.25;

        base + (broad + fine) * self.amplitude
    }

    fn material(&self, world_pos: DVec3, _time: f64) -> super::MaterialId {
        // Deeper rock below 90% of the radius, surface material above.
        if world_pos.length() < self.radius * 0.9 {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let a = NoiseField::new(7, 1000.0);
        let b = NoiseField::new(7, 1000.0);
        let p = DVec3::new(123.0, -456.0, 789.0);
        assert_eq!(a.density(p, 0.0), b.density(p, 0.0));
    }

    #[test]
    fn test_stays_near_sphere_surface() {
        let field = NoiseField::new(1, 1000.0);
        // Well inside and well outside should be unambiguous despite noise.
        assert!(field.density(DVec3::new(100.0, 0.0, 0.0), 0.0) < 1.0);
        assert!(field.density(DVec3::new(3000.0, 0.0, 0.0), 0.0) > 1.0);
    }
}
