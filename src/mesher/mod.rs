//! Chunk Mesher
//!
//! CPU marching cubes over a density field. Each chunk is a cube sampled
//! on a `(resolution + 1)^3` corner grid; densities below the isovalue are
//! solid, and the triangulated isosurface lands in per-material index
//! buffers ready for a mesh sink.

pub mod chunk_data;
pub mod marching_cubes;
pub mod tables;

pub use chunk_data::{ChunkData, ChunkGeometry};
pub use marching_cubes::{mesh_chunk, MesherConfig};

#[cfg(test)]
mod tests;
