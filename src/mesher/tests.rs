use glam::DVec3;

use super::{mesh_chunk, ChunkData, ChunkGeometry, MesherConfig};
use crate::field::{ConstantField, DensityField, MaterialId, PlaneField, SampleCounting, SphereField};
use crate::octree::{ChunkNode, NodeArena};

fn chunk(center: DVec3, extent: f64, resolution: u32) -> ChunkData {
    let mut arena = NodeArena::new();
    let node = arena.insert(ChunkNode::new(0, center));
    ChunkData::new(node, ChunkGeometry { center, extent }, resolution)
}

fn config(resolution: u32) -> MesherConfig {
    MesherConfig {
        resolution,
        surface_isovalue: 1.0,
        reverse_winding: false,
    }
}

#[test]
fn test_uniform_field_produces_no_triangles() {
    let mut data = chunk(DVec3::ZERO, 10.0, 4);
    // Entirely empty space.
    mesh_chunk(&ConstantField(5.0), &config(4), &mut data, 0.0);
    assert!(data.buffers.is_empty());

    // Entirely solid.
    data.reset(data.node, data.geometry);
    mesh_chunk(&ConstantField(0.0), &config(4), &mut data, 0.0);
    assert!(data.buffers.is_empty());
}

#[test]
fn test_density_exactly_at_isovalue_counts_as_empty() {
    // Solid needs density strictly below the isovalue, so a field pinned
    // at the isovalue has no surface.
    let mut data = chunk(DVec3::ZERO, 10.0, 4);
    mesh_chunk(&ConstantField(1.0), &config(4), &mut data, 0.0);
    assert!(data.buffers.is_empty());
}

#[test]
fn test_plane_field_meshes_onto_plane() {
    let plane_x = 1.5;
    let mut data = chunk(DVec3::ZERO, 8.0, 8);
    mesh_chunk(&PlaneField::new(plane_x, 1.0), &config(8), &mut data, 0.0);

    assert!(!data.buffers.is_empty());
    assert_eq!(data.buffers.vertices.len(), data.buffers.triangle_count() * 3);
    // The field is linear in x, so interpolated crossings land exactly on
    // the plane.
    for vertex in &data.buffers.vertices {
        assert!(
            (vertex.position[0] as f64 - plane_x).abs() < 1e-3,
            "vertex x {} should sit on the plane {}",
            vertex.position[0],
            plane_x
        );
    }

    // Gap-free tiling: the triangles together cover the chunk's full
    // cross-section, no more and no less.
    let mut area = 0.0;
    for triangle in data.buffers.vertices.chunks_exact(3) {
        let a = DVec3::from(triangle[0].position.map(f64::from));
        let b = DVec3::from(triangle[1].position.map(f64::from));
        let c = DVec3::from(triangle[2].position.map(f64::from));
        area += 0.5 * (b - a).cross(c - a).length();
    }
    let side = data.geometry.extent * 2.0;
    assert!(
        (area - side * side).abs() < 1e-6 * side * side,
        "plane triangles cover {} of a {} cross-section",
        area,
        side * side
    );
}

#[test]
fn test_corner_cache_bounds_samples() {
    let resolution = 8u32;
    let field = SampleCounting::new(PlaneField::new(0.0, 1.0));
    let mut data = chunk(DVec3::ZERO, 8.0, resolution);
    mesh_chunk(&field, &config(resolution), &mut data, 0.0);

    let corners = (resolution as usize + 1).pow(3);
    assert_eq!(field.samples(), corners);
}

#[test]
fn test_sphere_vertices_stay_in_chunk() {
    let mut data = chunk(DVec3::ZERO, 12.0, 8);
    mesh_chunk(&SphereField::new(8.0), &config(8), &mut data, 0.0);

    assert!(!data.buffers.is_empty());
    let min = data.geometry.min_corner();
    let max = data.geometry.center + DVec3::splat(data.geometry.extent);
    for vertex in &data.buffers.vertices {
        for axis in 0..3 {
            let v = vertex.position[axis] as f64;
            assert!(v >= min[axis] - 1e-3 && v <= max[axis] + 1e-3);
        }
        let n = DVec3::new(
            vertex.normal[0] as f64,
            vertex.normal[1] as f64,
            vertex.normal[2] as f64,
        );
        assert!((n.length() - 1.0).abs() < 1e-3, "normals are unit length");
    }
}

#[test]
fn test_reverse_winding_swaps_index_order() {
    let field = PlaneField::new(0.0, 1.0);
    let mut forward = chunk(DVec3::ZERO, 4.0, 4);
    mesh_chunk(&field, &config(4), &mut forward, 0.0);

    let mut reversed_config = config(4);
    reversed_config.reverse_winding = true;
    let mut reversed = chunk(DVec3::ZERO, 4.0, 4);
    mesh_chunk(&field, &reversed_config, &mut reversed, 0.0);

    let forward_tris = &forward.buffers.indices_by_material[&0];
    let reversed_tris = &reversed.buffers.indices_by_material[&0];
    assert_eq!(forward_tris.len(), reversed_tris.len());
    for (f, r) in forward_tris.iter().zip(reversed_tris) {
        assert_eq!([f[0], f[2], f[1]], *r);
    }
}

#[test]
fn test_triangles_grouped_by_material() {
    struct Banded;
    impl DensityField for Banded {
        fn density(&self, world_pos: DVec3, _time: f64) -> f64 {
            1.0 + world_pos.x
        }
        fn material(&self, world_pos: DVec3, _time: f64) -> MaterialId {
            if world_pos.y < 0.0 {
                1
            } else {
                2
            }
        }
    }

    let mut data = chunk(DVec3::ZERO, 4.0, 4);
    mesh_chunk(&Banded, &config(4), &mut data, 0.0);

    assert!(data.buffers.indices_by_material.contains_key(&1));
    assert!(data.buffers.indices_by_material.contains_key(&2));
    let total: usize = data.buffers.indices_by_material.values().map(|t| t.len()).sum();
    assert_eq!(total, data.buffers.triangle_count());
}

#[test]
fn test_reused_buffer_matches_fresh_mesh() {
    let field = PlaneField::new(0.0, 1.0);
    let mut reused = chunk(DVec3::ZERO, 4.0, 4);
    mesh_chunk(&ConstantField(5.0), &config(4), &mut reused, 0.0);
    reused.reset(reused.node, reused.geometry);
    mesh_chunk(&field, &config(4), &mut reused, 0.0);

    let mut fresh = chunk(DVec3::ZERO, 4.0, 4);
    mesh_chunk(&field, &config(4), &mut fresh, 0.0);

    assert_eq!(reused.buffers.vertices, fresh.buffers.vertices);
    assert_eq!(
        reused.buffers.indices_by_material,
        fresh.buffers.indices_by_material
    );
}
