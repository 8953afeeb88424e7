//! # VOXMAP Rendering
//!
//! Chunk-based terrain renderer for block worlds:
//! - Chunks of 16x16x16 blocks meshed into per-layer parts
//! - One shared quad index buffer, one vertex buffer per part
//! - Opposite faces merged into a single draw when both can be seen
//! - Translucent terrain drawn back-to-front over a depth pre-pass
//! - Block edits rebuild only the touched chunks, within a frame budget
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       TERRAIN PIPELINE                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Block edit → UpdateScheduler → ChunkMeshBuilder → ChunkStore │
//! │                                                     ↓         │
//! │  Camera → FrustumCuller + ChunkSorter → BatchRenderer → GPU   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The GPU is reached only through [`GraphicsBackend`]; the
//! [`RecordingBackend`] records every command for tests and benchmarks.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod atlas;
pub mod backend;
pub mod batch;
pub mod chunk;
pub mod config;
pub mod culling;
pub mod error;
pub mod mesh;
pub mod pipeline;
pub mod scheduler;

pub use atlas::{AtlasLayout, TerrainAtlas1D, TerrainAtlas2D, UvRect};
pub use backend::{
    BufferId, GraphicsBackend, IndexData, IndexedDraw, PassState, RecordingBackend, ScopedState, TextureId,
};
pub use batch::BatchRenderer;
pub use chunk::{ChunkCoord, ChunkInfo, ChunkPart, ChunkStore, FaceMask, CHUNK_SIZE};
pub use config::{IndexFormat, RendererConfig};
pub use culling::{Aabb, ChunkSorter, FrustumCuller};
pub use error::{RenderError, RenderResult, ResourceKind};
pub use mesh::{ChunkMeshBuilder, ChunkMeshData, ChunkSnapshot, MeshPass, MeshTables, PartRanges, TerrainVertex};
pub use pipeline::{Camera, MapRenderer, Projection, RenderStats};
pub use scheduler::{ChunkFailure, MeshWorker, SchedulerReport, UpdateScheduler};
