use super::node::ChunkNode;

/// Generational handle into a [`NodeArena`].
///
/// Holding a `NodeId` does not keep the node alive; after the slot is freed
/// and reused, lookups with the stale handle return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    node: Option<ChunkNode>,
}

/// Slab of octree nodes with free-list reuse.
#[derive(Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: ChunkNode) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.node.is_none());
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&ChunkNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ChunkNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Free a single slot, bumping its generation so stale handles miss.
    pub fn remove(&mut self, id: NodeId) -> Option<ChunkNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Free `id` and every descendant. Returns the removed nodes in
    /// depth-first order so the caller can retire their mesh sections.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<ChunkNode> {
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.remove(next) {
                if let Some(children) = node.children {
                    stack.extend_from_slice(&children);
                }
                removed.push(node);
            }
        }
        removed
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn leaf(depth: u8) -> ChunkNode {
        ChunkNode::new(depth, DVec3::ZERO)
    }

    #[test]
    fn test_insert_get_remove() {
        let mut arena = NodeArena::new();
        let id = arena.insert(leaf(2));
        assert_eq!(arena.get(id).map(|n| n.depth), Some(2));
        assert_eq!(arena.len(), 1);

        let node = arena.remove(id).expect("remove");
        assert_eq!(node.depth, 2);
        assert!(arena.get(id).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_stale_handle_misses_after_reuse() {
        let mut arena = NodeArena::new();
        let old = arena.insert(leaf(1));
        arena.remove(old);

        let new = arena.insert(leaf(3));
        // The slot was reused but the generation moved on.
        assert!(arena.get(old).is_none());
        assert!(arena.remove(old).is_none());
        assert_eq!(arena.get(new).map(|n| n.depth), Some(3));
    }

    #[test]
    fn test_remove_subtree_frees_descendants() {
        let mut arena = NodeArena::new();
        let root = arena.insert(leaf(0));
        let children: Vec<NodeId> = (0..8).map(|_| arena.insert(leaf(1))).collect();
        let grandchildren: Vec<NodeId> = (0..8).map(|_| arena.insert(leaf(2))).collect();

        let child_ids: [NodeId; 8] = children.clone().try_into().expect("8 children");
        let grand_ids: [NodeId; 8] = grandchildren.clone().try_into().expect("8 children");
        arena.get_mut(children[0]).expect("child").children = Some(grand_ids);
        arena.get_mut(root).expect("root").children = Some(child_ids);

        let removed = arena.remove_subtree(root);
        assert_eq!(removed.len(), 17);
        assert!(arena.is_empty());
        assert!(children.iter().chain(grandchildren.iter()).all(|id| !arena.contains(*id)));
    }
}
