use glam::DVec3;

use super::arena::{NodeArena, NodeId};
use super::node::ChunkNode;
use crate::mesh::SectionId;

/// Nodes whose leaf status changed on one rechunk pass, grouped by the node
/// whose existing mesh the change supersedes.
///
/// When a leaf splits, the group is keyed by the split node (its mesh must
/// go once all replacement leaves are live) and lists the new leaves. When
/// an interior node collapses, it groups under itself: its children's
/// meshes must go once its own new mesh is live.
#[derive(Debug, Default)]
pub struct DirtyChunks {
    pub groups: Vec<DirtyGroup>,
}

#[derive(Debug)]
pub struct DirtyGroup {
    /// The node whose previous representation is being replaced.
    pub parent: NodeId,
    /// New leaves that need meshes before `parent` can be cleaned up.
    pub leaves: Vec<NodeId>,
}

impl DirtyChunks {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.groups.iter().map(|g| g.leaves.len()).sum()
    }

    fn group_mut(&mut self, parent: NodeId) -> &mut DirtyGroup {
        if let Some(pos) = self.groups.iter().position(|g| g.parent == parent) {
            return &mut self.groups[pos];
        }
        self.groups.push(DirtyGroup {
            parent,
            leaves: Vec::new(),
        });
        self.groups.last_mut().expect("just pushed")
    }
}

/// Distance-driven LOD octree.
///
/// Owns the node arena and decides, per rechunk call, which nodes are
/// leaves (rendered as one mesh each) and which are interior. Mutated only
/// from the consumer thread; the pipeline guarantees no worker holds chunk
/// data referencing the tree while a rechunk runs.
pub struct LodOctree {
    arena: NodeArena,
    root: NodeId,
    volume_extent: f64,
    max_depth: u8,
    lod_factor: f64,
}

impl LodOctree {
    pub fn new(volume_extent: f64, max_depth: u8, lod_factor: f64) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert(ChunkNode::new(0, DVec3::ZERO));
        Self {
            arena,
            root,
            volume_extent,
            max_depth,
            lod_factor,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn volume_extent(&self) -> f64 {
        self.volume_extent
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub fn node(&self, id: NodeId) -> Option<&ChunkNode> {
        self.arena.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ChunkNode> {
        self.arena.get_mut(id)
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Count of nodes currently flagged as leaves.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.arena.get(id) {
                if node.leaf {
                    count += 1;
                }
                if let Some(children) = node.children {
                    stack.extend_from_slice(&children);
                }
            }
        }
        count
    }

    /// Drop the whole tree and start over with a fresh, unmeshed root.
    pub fn reset(&mut self) {
        self.arena.clear();
        self.root = self.arena.insert(ChunkNode::new(0, DVec3::ZERO));
    }

    /// Walk the tree toward `target`, expanding and collapsing nodes, and
    /// report exactly the nodes whose leaf status changed.
    ///
    /// Panics if the root node is missing; that is a construction bug, not
    /// a runtime condition.
    pub fn rechunk_to_center(&mut self, target: DVec3) -> DirtyChunks {
        assert!(
            self.arena.contains(self.root),
            "octree root missing; tree was corrupted"
        );

        let mut dirty = DirtyChunks::default();
        self.rechunk_node(target, self.root, None, &mut dirty);

        if !dirty.is_empty() {
            log::debug!(
                "[LodOctree] rechunk produced {} group(s), {} new leaf/leaves, {} nodes total",
                dirty.groups.len(),
                dirty.leaf_count(),
                self.arena.len()
            );
        }
        dirty
    }

    fn rechunk_node(
        &mut self,
        target: DVec3,
        id: NodeId,
        inherited_parent: Option<NodeId>,
        dirty: &mut DirtyChunks,
    ) {
        let (depth, is_leaf, within_reach) = {
            let node = self.arena.get(id).expect("rechunk visited a freed node");
            (
                node.depth,
                node.leaf,
                node.is_within_reach(target, self.volume_extent, self.lod_factor),
            )
        };

        if depth == self.max_depth || !within_reach {
            // This node should render as a single mesh.
            if !is_leaf {
                self.arena.get_mut(id).expect("node vanished").leaf = true;
                // Under an inherited key this is a freshly exposed finer (or
                // re-coarsened) leaf; without one it is a collapse and the
                // node supersedes its own children.
                let key = inherited_parent.unwrap_or(id);
                dirty.group_mut(key).leaves.push(id);
            }
            return;
        }

        // This node should subdivide.
        let mut parent_key = inherited_parent;
        if is_leaf {
            self.arena.get_mut(id).expect("node vanished").leaf = false;
            parent_key = Some(id);
            // Materialize the group now so a split is reported even before
            // its descendant leaves are found.
            dirty.group_mut(id);
        }

        let children = self.ensure_children(id);
        for child in children {
            self.rechunk_node(target, child, parent_key, dirty);
        }
    }

    /// Create the 8 children on first expansion; later passes reuse them.
    fn ensure_children(&mut self, id: NodeId) -> [NodeId; 8] {
        if let Some(children) = self.arena.get(id).expect("node vanished").children {
            return children;
        }

        let (depth, centers) = {
            let node = self.arena.get(id).expect("node vanished");
            let mut centers = [DVec3::ZERO; 8];
            for (i, c) in centers.iter_mut().enumerate() {
                *c = node.child_center(i, self.volume_extent);
            }
            (node.depth, centers)
        };

        let mut children = [self.root; 8];
        for (i, center) in centers.into_iter().enumerate() {
            children[i] = self.arena.insert(ChunkNode::new(depth + 1, center));
        }
        self.arena.get_mut(id).expect("node vanished").children = Some(children);
        children
    }

    /// Destroy all children subtrees of `parent`, returning the mesh
    /// sections of every freed node so the caller can retire them.
    pub fn clear_children(&mut self, parent: NodeId) -> Vec<SectionId> {
        let Some(children) = self.arena.get(parent).and_then(|n| n.children) else {
            return Vec::new();
        };

        let mut freed = Vec::new();
        for child in children {
            for node in self.arena.remove_subtree(child) {
                if !node.section.is_none() {
                    freed.push(node.section);
                }
            }
        }
        if let Some(node) = self.arena.get_mut(parent) {
            node.children = None;
        }
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn octree(max_depth: u8) -> LodOctree {
        LodOctree::new(1000.0, max_depth, 1.0)
    }

    #[test]
    fn test_max_depth_zero_roots_single_leaf() {
        let mut tree = octree(0);
        let dirty = tree.rechunk_to_center(DVec3::ZERO);

        assert_eq!(dirty.groups.len(), 1);
        assert_eq!(dirty.groups[0].parent, tree.root());
        assert_eq!(dirty.groups[0].leaves, vec![tree.root()]);
        assert!(tree.node(tree.root()).expect("root").leaf);
    }

    #[test]
    fn test_rechunk_is_idempotent_for_unchanged_target() {
        let mut tree = octree(3);
        let target = DVec3::new(10.0, 20.0, 30.0);

        let first = tree.rechunk_to_center(target);
        assert!(!first.is_empty());

        let second = tree.rechunk_to_center(target);
        assert!(second.is_empty(), "unchanged target must report nothing");
    }

    #[test]
    fn test_nearby_target_splits_root() {
        let mut tree = octree(2);
        // First pass from nowhere: root is within reach of a center target,
        // so it subdivides and the leaves appear deeper.
        let dirty = tree.rechunk_to_center(DVec3::ZERO);

        // The root never was a leaf, so no group is keyed by it; every new
        // leaf sits under the synthetic "collapse onto itself" key.
        let mut all_leaves = Vec::new();
        for group in &dirty.groups {
            all_leaves.extend_from_slice(&group.leaves);
        }
        assert!(!all_leaves.is_empty());
        for leaf in &all_leaves {
            let node = tree.node(*leaf).expect("leaf");
            assert!(node.leaf);
            assert!(node.depth > 0, "center target must subdivide the root");
        }
    }

    #[test]
    fn test_split_groups_under_previous_leaf() {
        let mut tree = octree(2);
        // Far target first: the root becomes a single coarse leaf.
        let far = DVec3::new(1.0e7, 0.0, 0.0);
        let dirty = tree.rechunk_to_center(far);
        assert_eq!(dirty.leaf_count(), 1);
        let root = tree.root();
        assert!(tree.node(root).expect("root").leaf);

        // Move close: the root splits and its replacement leaves group
        // under it.
        let dirty = tree.rechunk_to_center(DVec3::ZERO);
        let group = dirty
            .groups
            .iter()
            .find(|g| g.parent == root)
            .expect("split keyed by former leaf");
        assert!(!group.leaves.is_empty());
        assert!(!tree.node(root).expect("root").leaf);
        for leaf in &group.leaves {
            assert!(tree.node(*leaf).expect("leaf").leaf);
        }
    }

    #[test]
    fn test_dirty_grouping_exhaustive_and_disjoint() {
        let mut tree = octree(4);
        let first = tree.rechunk_to_center(DVec3::ZERO);

        let mut seen = HashSet::new();
        for group in &first.groups {
            for leaf in &group.leaves {
                assert!(seen.insert(*leaf), "leaf reported in two groups");
            }
        }

        // Every reported node is a leaf now; and re-running reports none of
        // them again (no unchanged node appears).
        for id in &seen {
            assert!(tree.node(*id).expect("node").leaf);
        }
        let again = tree.rechunk_to_center(DVec3::ZERO);
        assert!(again.is_empty());
    }

    #[test]
    fn test_collapse_groups_under_self() {
        let mut tree = octree(3);
        tree.rechunk_to_center(DVec3::ZERO);

        // Step far away; deep interior nodes collapse back to leaves,
        // each keyed by itself.
        let dirty = tree.rechunk_to_center(DVec3::new(1.0e9, 0.0, 0.0));
        assert!(!dirty.is_empty());
        let collapse = dirty
            .groups
            .iter()
            .find(|g| g.leaves.contains(&g.parent))
            .expect("collapse group keyed by the collapsing node");
        assert!(tree.node(collapse.parent).expect("node").leaf);
    }

    #[test]
    fn test_clear_children_reports_freed_sections() {
        let mut tree = octree(1);
        tree.rechunk_to_center(DVec3::ZERO);
        let root = tree.root();
        let children = tree.node(root).expect("root").children.expect("expanded");

        for (i, child) in children.iter().enumerate() {
            tree.node_mut(*child).expect("child").section = SectionId(i as u32 + 1);
        }

        let freed = tree.clear_children(root);
        assert_eq!(freed.len(), 8);
        assert_eq!(tree.node(root).expect("root").children, None);
        for child in children {
            assert!(tree.node(child).is_none());
        }
        // Second call is a no-op.
        assert!(tree.clear_children(root).is_empty());
    }

    #[test]
    fn test_reset_recreates_unmeshed_root() {
        let mut tree = octree(3);
        tree.rechunk_to_center(DVec3::ZERO);
        assert!(tree.node_count() > 1);

        tree.reset();
        assert_eq!(tree.node_count(), 1);
        let root = tree.node(tree.root()).expect("root");
        assert!(!root.leaf);
        assert!(root.section.is_none());
    }
}
