//! Chunk Octree
//!
//! An arena-backed octree of cubic chunks. The arena hands out generational
//! handles, so a handle to a freed node resolves to `None` instead of
//! dangling; destroying a node frees its whole subtree.

pub mod arena;
pub mod lod;
pub mod node;

pub use arena::{NodeArena, NodeId};
pub use lod::{DirtyChunks, DirtyGroup, LodOctree};
pub use node::{ChunkNode, CHILD_OFFSETS};
