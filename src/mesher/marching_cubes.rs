use glam::DVec3;

use super::chunk_data::ChunkData;
use super::tables::{CORNER_OFFSETS, EDGE_CONNECTIONS, EDGE_TABLE, TRI_TABLE};
use crate::field::DensityField;
use crate::mesh::MeshVertex;

/// Settings the mesher needs from the volume configuration.
#[derive(Debug, Clone, Copy)]
pub struct MesherConfig {
    /// Voxel cells per chunk axis.
    pub resolution: u32,
    /// Density at which the surface sits; below is solid.
    pub surface_isovalue: f64,
    /// Emit triangles with flipped winding for left-handed consumers.
    pub reverse_winding: bool,
}

/// Triangulate one chunk into `data.buffers`.
///
/// Walks the chunk's `resolution^3` cells, classifying each cell's corners
/// as solid (`density < isovalue`) or empty, and emits surface triangles
/// where the classification changes. Corner densities are cached in
/// `data.corner_densities`, so adjacent cells share samples and the field
/// is evaluated at most `(resolution + 1)^3` times per chunk.
///
/// Vertices are not welded: each triangle carries three vertices with a
/// shared flat face normal. Triangles are bucketed by the material the
/// field reports at their centroid.
pub fn mesh_chunk(
    field: &dyn DensityField,
    config: &MesherConfig,
    data: &mut ChunkData,
    time: f64,
) {
    let resolution = config.resolution;
    let isovalue = config.surface_isovalue;

    for x in 0..resolution {
        for y in 0..resolution {
            for z in 0..resolution {
                let mut densities = [0.0f64; 8];
                let mut positions = [DVec3::ZERO; 8];
                let mut mask = 0usize;

                for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
                    let corner = [x + offset[0], y + offset[1], z + offset[2]];
                    positions[i] = data.geometry.corner_position(resolution, corner);
                    densities[i] = sample_cached(field, data, corner, positions[i], time);
                    if densities[i] < isovalue {
                        mask |= 1 << i;
                    }
                }

                let edge_bits = EDGE_TABLE[mask];
                if edge_bits == 0 {
                    continue;
                }

                let mut edge_points = [DVec3::ZERO; 12];
                for (edge, pair) in EDGE_CONNECTIONS.iter().enumerate() {
                    if edge_bits & (1 << edge) == 0 {
                        continue;
                    }
                    edge_points[edge] = interpolate_edge(
                        positions[pair[0]],
                        positions[pair[1]],
                        densities[pair[0]],
                        densities[pair[1]],
                        isovalue,
                    );
                }

                emit_triangles(field, config, data, &edge_points, mask, time);
            }
        }
    }
}

/// Density at a grid corner, sampling the field only on a cache miss.
fn sample_cached(
    field: &dyn DensityField,
    data: &mut ChunkData,
    corner: [u32; 3],
    position: DVec3,
    time: f64,
) -> f64 {
    let index = [corner[0] as usize, corner[1] as usize, corner[2] as usize];
    let cached = data.corner_densities[index];
    if !cached.is_nan() {
        return cached;
    }
    let density = field.density(position, time);
    data.corner_densities[index] = density;
    density
}

/// Point on an edge where the density crosses the isovalue.
fn interpolate_edge(a: DVec3, b: DVec3, density_a: f64, density_b: f64, isovalue: f64) -> DVec3 {
    let t = if density_a == density_b {
        0.5
    } else {
        ((isovalue - density_a) / (density_b - density_a)).clamp(0.0, 1.0)
    };
    a + (b - a) * t
}

fn emit_triangles(
    field: &dyn DensityField,
    config: &MesherConfig,
    data: &mut ChunkData,
    edge_points: &[DVec3; 12],
    mask: usize,
    time: f64,
) {
    let triangle_edges = &TRI_TABLE[mask];
    let mut i = 0;
    while triangle_edges[i] >= 0 {
        let a = edge_points[triangle_edges[i] as usize];
        let b = edge_points[triangle_edges[i + 1] as usize];
        let c = edge_points[triangle_edges[i + 2] as usize];
        i += 3;

        let normal = (c - a).cross(b - a).normalize_or_zero();
        let normal_f32 = normal.as_vec3().to_array();

        let base = data.buffers.vertices.len() as u32;
        for position in [a, b, c] {
            data.buffers.vertices.push(MeshVertex {
                position: position.as_vec3().to_array(),
                normal: normal_f32,
            });
        }

        let indices = if config.reverse_winding {
            [base, base + 2, base + 1]
        } else {
            [base, base + 1, base + 2]
        };

        let centroid = (a + b + c) / 3.0;
        let material = field.material(centroid, time);
        data.buffers
            .indices_by_material
            .entry(material)
            .or_default()
            .push(indices);
    }
}
