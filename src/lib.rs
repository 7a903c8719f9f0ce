pub mod config;
pub mod error;
pub mod field;
pub mod mesh;
pub mod mesher;
pub mod octree;
pub mod pipeline;
pub mod util;
pub mod volume;

pub use config::VolumeConfig;
pub use error::{TerrainError, TerrainResult};
pub use field::{DensityField, MaterialId, NoiseField, SphereField};
pub use mesh::{CollectedMeshSink, MeshBuffers, MeshSink, MeshVertex, SectionId};
pub use mesher::{ChunkData, ChunkGeometry, MesherConfig};
pub use octree::{ChunkNode, DirtyChunks, DirtyGroup, LodOctree, NodeId};
pub use pipeline::{GenerationPipeline, PipelineStats};
pub use volume::VoxelVolume;
