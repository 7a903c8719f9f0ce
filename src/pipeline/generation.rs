use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::config::VolumeConfig;
use crate::field::DensityField;
use crate::mesh::{MeshSink, SectionId};
use crate::mesher::{mesh_chunk, ChunkData, ChunkGeometry, MesherConfig};
use crate::octree::{DirtyGroup, LodOctree, NodeId};

/// Counters for monitoring pipeline throughput.
#[derive(Debug, Default, Clone)]
pub struct PipelineStats {
    pub chunks_queued: u64,
    pub chunks_meshed: u64,
    pub sections_created: u64,
    pub cleanups_run: u64,
    pub sink_retries: u64,
}

/// One chunk moving through the pipeline: its scratch data plus the dirty
/// group it belongs to.
struct ChunkJob {
    data: ChunkData,
    group: NodeId,
    time: f64,
}

/// A dirty group whose leaves are still being meshed. When `remaining`
/// reaches zero the group graduates to the cleanup queue.
struct GroupTracker {
    leaves: Vec<NodeId>,
    remaining: usize,
}

/// A finished group awaiting stale-mesh removal, strictly FIFO.
struct CleanupEntry {
    parent: NodeId,
    leaves: Vec<NodeId>,
}

/// Three-stage chunk generation pipeline.
///
/// Stage 1 (regenerate) samples the density field and runs marching cubes;
/// it is the expensive stage and runs on worker threads. Stages 2 (remesh:
/// hand buffers to the mesh sink) and 3 (cleanup: retire superseded
/// sections) run on the caller's thread, bounded per tick.
///
/// `pending` counts jobs between enqueue and the end of stage 2; the tree
/// is only rechunked while it is zero, so no worker ever holds a chunk that
/// references a node the tree is about to restructure. The cleanup queue
/// does not block rechunking: entries are dispatched on the node's state at
/// execution time, so an entry outlived by a later transition degrades to
/// the correct smaller action (or a no-op).
pub struct GenerationPipeline {
    regenerate_tx: Option<Sender<ChunkJob>>,
    regenerate_rx: Receiver<ChunkJob>,
    remesh_tx: Sender<ChunkJob>,
    remesh_rx: Receiver<ChunkJob>,
    /// Chunk whose section the sink refused; retried before the channel.
    retry: Option<ChunkJob>,
    cleanup_queue: VecDeque<CleanupEntry>,
    groups: HashMap<NodeId, GroupTracker>,
    pending: Arc<AtomicUsize>,
    workers: Vec<JoinHandle<()>>,
    mesher: MesherConfig,
    field: Arc<dyn DensityField>,
    chunk_resolution: u32,
    per_tick_limit: usize,
    max_depth: u8,
    collision_inverse_depth: u8,
    next_section: u32,
    stats: PipelineStats,
}

impl GenerationPipeline {
    pub fn new(config: &VolumeConfig, field: Arc<dyn DensityField>) -> Self {
        let (regenerate_tx, regenerate_rx) = unbounded::<ChunkJob>();
        let (remesh_tx, remesh_rx) = unbounded::<ChunkJob>();

        let mesher = MesherConfig {
            resolution: config.chunk_resolution,
            surface_isovalue: config.surface_isovalue,
            reverse_winding: config.reverse_winding,
        };

        let mut pipeline = Self {
            regenerate_tx: Some(regenerate_tx),
            regenerate_rx,
            remesh_tx,
            remesh_rx,
            retry: None,
            cleanup_queue: VecDeque::new(),
            groups: HashMap::new(),
            pending: Arc::new(AtomicUsize::new(0)),
            workers: Vec::new(),
            mesher,
            field,
            chunk_resolution: config.chunk_resolution,
            per_tick_limit: config.per_tick_limit,
            max_depth: config.max_depth,
            collision_inverse_depth: config.collision_inverse_depth,
            next_section: 1,
            stats: PipelineStats::default(),
        };
        pipeline.spawn_workers(config.worker_count, config.worker_rest);
        pipeline
    }

    fn spawn_workers(&mut self, count: usize, rest: Duration) {
        for index in 0..count {
            let regenerate_rx = self.regenerate_rx.clone();
            let remesh_tx = self.remesh_tx.clone();
            let field = Arc::clone(&self.field);
            let mesher = self.mesher;

            self.workers.push(thread::spawn(move || {
                log::debug!("[Pipeline] worker {} started", index);
                while let Ok(mut job) = regenerate_rx.recv() {
                    mesh_chunk(field.as_ref(), &mesher, &mut job.data, job.time);
                    if remesh_tx.send(job).is_err() {
                        break;
                    }
                    if !rest.is_zero() {
                        thread::sleep(rest);
                    }
                }
                log::debug!("[Pipeline] worker {} stopped", index);
            }));
        }
        if count > 0 {
            log::info!("[Pipeline] spawned {} generation worker(s)", count);
        }
    }

    /// True when no chunk sits between enqueue and the end of the remesh
    /// stage. Only then may the octree be restructured.
    pub fn is_quiescent(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }

    pub fn cleanup_backlog(&self) -> usize {
        self.cleanup_queue.len()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Queue every leaf of a dirty group for regeneration.
    ///
    /// A group whose leaves were all meshed by earlier passes (possible
    /// when a node re-splits before its collapse cleanup ran) skips straight
    /// to the cleanup queue.
    pub fn enqueue_group(&mut self, group: &DirtyGroup, octree: &LodOctree, time: f64) {
        if group.leaves.is_empty() {
            self.cleanup_queue.push_back(CleanupEntry {
                parent: group.parent,
                leaves: Vec::new(),
            });
            return;
        }

        self.groups.insert(
            group.parent,
            GroupTracker {
                leaves: group.leaves.clone(),
                remaining: group.leaves.len(),
            },
        );

        for leaf in &group.leaves {
            let Some(node) = octree.node(*leaf) else {
                // The tree is quiescent when groups are enqueued, so every
                // reported leaf must still exist.
                debug_assert!(false, "dirty leaf missing from the tree");
                self.finish_leaf(group.parent);
                continue;
            };
            let geometry = ChunkGeometry {
                center: node.center,
                extent: node.extent(octree.volume_extent()),
            };
            let data = ChunkData::new(*leaf, geometry, self.chunk_resolution);
            self.pending.fetch_add(1, Ordering::AcqRel);
            self.stats.chunks_queued += 1;

            let job = ChunkJob {
                data,
                group: group.parent,
                time,
            };
            if let Some(tx) = &self.regenerate_tx {
                // Send only fails after shutdown began.
                if tx.send(job).is_err() {
                    self.pending.fetch_sub(1, Ordering::AcqRel);
                    self.finish_leaf(group.parent);
                }
            }
        }
    }

    /// Run the regenerate stage inline for every queued job.
    ///
    /// This is how tests (and any caller configured with zero workers)
    /// drive the pipeline deterministically.
    pub fn drain_regenerate_once(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(mut job) = self.regenerate_rx.try_recv() {
            mesh_chunk(self.field.as_ref(), &self.mesher, &mut job.data, job.time);
            if self.remesh_tx.send(job).is_err() {
                break;
            }
            drained += 1;
        }
        drained
    }

    /// Stage 2: move finished chunks into the mesh sink, at most
    /// `per_tick_limit` per call.
    ///
    /// A chunk the sink refuses is parked, not consumed: the pass stops and
    /// the same chunk leads the next one, so no mesh is ever lost to a
    /// transient sink failure. A sink reporting not-ready defers the whole
    /// pass.
    pub fn process_remesh(&mut self, octree: &mut LodOctree, sink: &mut dyn MeshSink) -> usize {
        if !sink.is_ready() {
            return 0;
        }
        let mut handled = 0;
        while handled < self.per_tick_limit {
            let job = match self.retry.take() {
                Some(job) => job,
                None => match self.remesh_rx.try_recv() {
                    Ok(job) => job,
                    Err(_) => break,
                },
            };
            if !self.apply_meshed_chunk(job, octree, sink) {
                break;
            }
            handled += 1;
        }
        handled
    }

    /// Hand one meshed chunk to the sink. Returns `false` when the sink
    /// refused it; the job is then parked with all its bookkeeping intact
    /// (the node keeps its old section, `pending` stays up) for retry.
    fn apply_meshed_chunk(
        &mut self,
        job: ChunkJob,
        octree: &mut LodOctree,
        sink: &mut dyn MeshSink,
    ) -> bool {
        let node_id = job.data.node;

        match octree.node_mut(node_id) {
            Some(node) => {
                // A node can still carry a section from before its last
                // transition; the replacement mesh supersedes it now.
                let stale = node.section;
                let depth = node.depth;
                if job.data.buffers.is_empty() {
                    // Nothing crossed the surface here; the node is unmeshed.
                    node.section = SectionId::NONE;
                    if !stale.is_none() {
                        sink.remove_section(stale);
                    }
                } else {
                    let section = SectionId(self.next_section);
                    let collision =
                        collision_enabled(depth, self.max_depth, self.collision_inverse_depth);
                    if let Err(err) =
                        sink.create_section(section, job.data.buffers.clone(), collision)
                    {
                        log::warn!(
                            "[Pipeline] sink refused section {}: {}; retrying next tick",
                            section.0,
                            err
                        );
                        self.stats.sink_retries += 1;
                        self.retry = Some(job);
                        return false;
                    }
                    self.next_section += 1;
                    node.section = section;
                    if !stale.is_none() {
                        sink.remove_section(stale);
                    }
                    self.stats.sections_created += 1;
                }
            }
            None => {
                log::warn!("[Pipeline] meshed chunk for a node that no longer exists");
            }
        }

        self.stats.chunks_meshed += 1;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        self.finish_leaf(job.group);
        true
    }

    fn finish_leaf(&mut self, group: NodeId) {
        let Some(tracker) = self.groups.get_mut(&group) else {
            return;
        };
        tracker.remaining = tracker.remaining.saturating_sub(1);
        if tracker.remaining > 0 {
            return;
        }
        if let Some(tracker) = self.groups.remove(&group) {
            self.cleanup_queue.push_back(CleanupEntry {
                parent: group,
                leaves: tracker.leaves,
            });
        }
    }

    /// Stage 3: retire superseded meshes, strictly in completion order.
    ///
    /// The head entry waits until none of its new sections is still building
    /// in the sink; later entries never overtake it.
    pub fn process_cleanup(&mut self, octree: &mut LodOctree, sink: &mut dyn MeshSink) -> usize {
        let mut handled = 0;
        while handled < self.per_tick_limit {
            let Some(entry) = self.cleanup_queue.front() else {
                break;
            };

            let blocked = entry.leaves.iter().any(|leaf| {
                octree
                    .node(*leaf)
                    .map(|node| !node.section.is_none() && sink.is_pending(node.section))
                    .unwrap_or(false)
            });
            if blocked {
                break;
            }

            let Some(entry) = self.cleanup_queue.pop_front() else {
                break;
            };
            self.run_cleanup(entry, octree, sink);
            self.stats.cleanups_run += 1;
            handled += 1;
        }
        handled
    }

    /// Dispatch on the parent's state now, not at enqueue time. A leaf
    /// parent supersedes its children wholesale; an interior parent only
    /// sheds its own stale mesh.
    fn run_cleanup(&mut self, entry: CleanupEntry, octree: &mut LodOctree, sink: &mut dyn MeshSink) {
        let Some(node) = octree.node(entry.parent) else {
            // Parent freed by an earlier subtree cleanup.
            return;
        };

        if node.leaf {
            for section in octree.clear_children(entry.parent) {
                sink.remove_section(section);
            }
        } else {
            let section = node.section;
            if !section.is_none() {
                sink.remove_section(section);
                if let Some(node) = octree.node_mut(entry.parent) {
                    node.section = SectionId::NONE;
                }
            }
        }
    }

    /// Remove every known section and reset pipeline bookkeeping. Callers
    /// must only do this while the pipeline is quiescent.
    pub fn reset(&mut self, octree: &mut LodOctree, sink: &mut dyn MeshSink) {
        debug_assert!(self.is_quiescent(), "reset requires a quiescent pipeline");
        while self.remesh_rx.try_recv().is_ok() {}
        self.retry = None;
        self.cleanup_queue.clear();
        self.groups.clear();

        let root = octree.root();
        for section in octree.clear_children(root) {
            sink.remove_section(section);
        }
        if let Some(node) = octree.node(root) {
            if !node.section.is_none() {
                sink.remove_section(node.section);
            }
        }
        octree.reset();
        self.next_section = 1;
    }
}

impl Drop for GenerationPipeline {
    fn drop(&mut self) {
        // Closing the channel wakes every worker out of recv().
        self.regenerate_tx = None;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Whether chunks at `depth` should get collision meshes. Depth is counted
/// from the root, the knob from the deepest level up. Widened arithmetic:
/// `u8` sums can wrap for extreme `max_depth` values.
pub fn collision_enabled(depth: u8, max_depth: u8, collision_inverse_depth: u8) -> bool {
    let depth = depth.min(max_depth) as u32;
    depth + collision_inverse_depth as u32 > max_depth as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_enabled_near_max_depth() {
        // With max depth 7 and an inverse depth of 3, depths 5..=7 collide.
        assert!(collision_enabled(7, 7, 3));
        assert!(collision_enabled(6, 7, 3));
        assert!(collision_enabled(5, 7, 3));
        assert!(!collision_enabled(4, 7, 3));
        assert!(!collision_enabled(0, 7, 3));
    }

    #[test]
    fn test_collision_disabled_when_knob_is_zero() {
        for depth in 0..=7 {
            assert!(!collision_enabled(depth, 7, 0));
        }
    }

    #[test]
    fn test_collision_with_single_level_tree() {
        assert!(collision_enabled(0, 0, 1));
        assert!(!collision_enabled(0, 0, 0));
    }

    #[test]
    fn test_collision_at_extreme_max_depth_does_not_overflow() {
        // Root of a 255-level tree is far from the collision band.
        assert!(!collision_enabled(0, 255, 3));
        assert!(collision_enabled(255, 255, 3));
        assert!(collision_enabled(253, 255, 3));
        assert!(!collision_enabled(252, 255, 3));
    }
}
