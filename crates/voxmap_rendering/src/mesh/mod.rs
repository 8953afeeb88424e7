//! Chunk meshing.
//!
//! Snapshot a chunk with a one-block border, resolve every block to a
//! [`BlockShape`] and emit quads grouped by atlas layer, pass and face
//! direction.

mod builder;
mod ranges;
mod snapshot;
mod tables;
mod vertex;

pub use builder::{ChunkMeshBuilder, ChunkMeshData, PartMesh};
pub use ranges::{
    quad_indices, DrawRange, IndexWindow, PartRanges, WindowedDraws, MAX_PART_QUADS, MAX_U16_INDICES,
    MAX_U16_VERTICES, QUAD_INDICES, QUAD_VERTICES,
};
pub use snapshot::{ChunkSnapshot, PaddedChunkShape, PADDED_CHUNK_SIZE, PADDED_CHUNK_VOLUME};
pub use tables::{BlockShape, FaceTexture, MeshPass, MeshTables};
pub use vertex::{face_colour, TerrainVertex, WHITE};
