//! Generation Pipeline
//!
//! Moves dirty chunks through three stages: regenerate (density sampling
//! plus marching cubes, on worker threads), remesh (section creation in the
//! mesh sink) and cleanup (retiring superseded sections). The two consumer
//! stages are tick-bounded so a burst of LOD changes never stalls a frame.

pub mod generation;

pub use generation::{collision_enabled, GenerationPipeline, PipelineStats};
