//! Mesh Sink Seam
//!
//! The renderable-mesh resource is an external collaborator: something that
//! accepts vertex/index streams under a named section, uploads and bakes
//! collision asynchronously, and can be asked whether a section is still
//! building. The pipeline only talks to this trait; `CollectedMeshSink` is
//! the in-memory implementation used by tests and the demo binary.

use std::collections::{BTreeMap, HashMap};

use bytemuck::{Pod, Zeroable};

use crate::error::TerrainResult;
use crate::field::MaterialId;

/// Stable identifier naming a mesh section. Zero means "no mesh".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub u32);

impl SectionId {
    pub const NONE: SectionId = SectionId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Deterministic section name, e.g. `SectionGroup_1`.
    pub fn name(self) -> String {
        format!("SectionGroup_{}", self.0)
    }
}

/// Vertex emitted by the mesher: position and face normal.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Triangulated output for one chunk: a shared vertex stream plus index
/// triples grouped by material.
#[derive(Debug, Default, Clone)]
pub struct MeshBuffers {
    pub vertices: Vec<MeshVertex>,
    pub indices_by_material: BTreeMap<MaterialId, Vec<[u32; 3]>>,
}

impl MeshBuffers {
    pub fn triangle_count(&self) -> usize {
        self.indices_by_material.values().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices_by_material.clear();
    }
}

/// Destination for generated chunk meshes.
///
/// All methods are called from the consumer thread only.
pub trait MeshSink {
    /// Whether the sink can accept work this tick. A `false` return makes
    /// the pipeline skip its remesh pass and retry next tick.
    fn is_ready(&self) -> bool {
        true
    }

    /// Create (or replace) a named section from the given buffers.
    fn create_section(
        &mut self,
        section: SectionId,
        buffers: MeshBuffers,
        enable_collision: bool,
    ) -> TerrainResult<()>;

    /// Remove a section. Removing an unknown section is a no-op.
    fn remove_section(&mut self, section: SectionId);

    /// Whether a section's asynchronous upload/collision build is still in
    /// progress. Unknown sections are not pending.
    fn is_pending(&self, section: SectionId) -> bool;
}

/// A live section held by [`CollectedMeshSink`].
#[derive(Debug, Clone)]
pub struct CollectedSection {
    pub name: String,
    pub buffers: MeshBuffers,
    pub collision: bool,
    /// Remaining `tick()` calls until the simulated build completes.
    pub build_remaining: u32,
}

/// In-memory mesh sink that simulates asynchronous section builds.
///
/// Each created section stays pending for `build_latency` ticks; call
/// [`CollectedMeshSink::tick`] once per frame to advance builds.
#[derive(Debug, Default)]
pub struct CollectedMeshSink {
    sections: HashMap<SectionId, CollectedSection>,
    build_latency: u32,
    created: u64,
    removed: u64,
}

impl CollectedMeshSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose sections stay pending for `latency` ticks after creation.
    pub fn with_build_latency(latency: u32) -> Self {
        Self {
            build_latency: latency,
            ..Self::default()
        }
    }

    /// Advance all in-progress section builds by one tick.
    pub fn tick(&mut self) {
        for section in self.sections.values_mut() {
            section.build_remaining = section.build_remaining.saturating_sub(1);
        }
    }

    pub fn section(&self, id: SectionId) -> Option<&CollectedSection> {
        self.sections.get(&id)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn section_ids(&self) -> Vec<SectionId> {
        let mut ids: Vec<_> = self.sections.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn created_total(&self) -> u64 {
        self.created
    }

    pub fn removed_total(&self) -> u64 {
        self.removed
    }
}

impl MeshSink for CollectedMeshSink {
    fn create_section(
        &mut self,
        section: SectionId,
        buffers: MeshBuffers,
        enable_collision: bool,
    ) -> TerrainResult<()> {
        debug_assert!(!section.is_none(), "section id 0 is reserved for 'no mesh'");
        self.created += 1;
        self.sections.insert(
            section,
            CollectedSection {
                name: section.name(),
                buffers,
                collision: enable_collision,
                build_remaining: self.build_latency,
            },
        );
        Ok(())
    }

    fn remove_section(&mut self, section: SectionId) {
        if self.sections.remove(&section).is_some() {
            self.removed += 1;
        }
    }

    fn is_pending(&self, section: SectionId) -> bool {
        self.sections
            .get(&section)
            .map(|s| s.build_remaining > 0)
            .unwrap_or(false)
    }
}
