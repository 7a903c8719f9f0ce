//! Density Fields
//!
//! The scalar field sampled by the mesher. Implementations must be pure:
//! the same position and time always yield the same density, because corner
//! values are cached per chunk and shared between adjacent cells.

pub mod noise_field;
pub mod sphere;

pub use noise_field::NoiseField;
pub use sphere::SphereField;

use glam::DVec3;

/// Material identifier carried per triangle group. Zero is the default
/// material.
pub type MaterialId = u8;

/// A procedural scalar density field over world space.
pub trait DensityField: Send + Sync {
    /// Sample the field at a world position. Values below the configured
    /// isovalue count as inside the surface.
    fn density(&self, world_pos: DVec3, time: f64) -> f64;

    /// Material at a world position, used to group triangles. Defaults to
    /// the single material zero.
    fn material(&self, _world_pos: DVec3, _time: f64) -> MaterialId {
        0
    }
}

/// Wrapper that counts every density sample made through it.
///
/// Used by tests to verify the corner cache keeps total samples per chunk at
/// exactly `(resolution + 1)^3`.
pub struct SampleCounting<F> {
    inner: F,
    samples: std::sync::atomic::AtomicUsize,
}

impl<F: DensityField> SampleCounting<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            samples: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn samples(&self) -> usize {
        self.samples.load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl<F: DensityField> DensityField for SampleCounting<F> {
    fn density(&self, world_pos: DVec3, time: f64) -> f64 {
        self.samples
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.inner.density(world_pos, time)
    }

    fn material(&self, world_pos: DVec3, time: f64) -> MaterialId {
        self.inner.material(world_pos, time)
    }
}

/// A field with the same density everywhere; handy in tests.
pub struct ConstantField(pub f64);

impl DensityField for ConstantField {
    fn density(&self, _world_pos: DVec3, _time: f64) -> f64 {
        self.0
    }
}

/// A field whose surface is the axis-aligned plane `x == plane_x`: density
/// rises linearly with x. Below the plane samples are inside.
pub struct PlaneField {
    pub plane_x: f64,
    pub isovalue: f64,
    pub slope: f64,
}

impl PlaneField {
    pub fn new(plane_x: f64, isovalue: f64) -> Self {
        Self {
            plane_x,
            isovalue,
            slope: 1.0,
        }
    }
}

impl DensityField for PlaneField {
    fn density(&self, world_pos: DVec3, _time: f64) -> f64 {
        self.isovalue + (world_pos.x - self.plane_x) * self.slope
    }
}
