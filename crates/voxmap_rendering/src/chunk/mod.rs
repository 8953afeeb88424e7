//! Chunk metadata and uploaded parts.
//!
//! A chunk is a 16x16x16 block volume. Each chunk owns at most one part per
//! atlas layer and pass; a part is one vertex buffer plus the index ranges
//! of its sprite and face categories.

mod coord;
mod info;
mod store;

pub use coord::{ChunkCoord, CHUNK_SHIFT, CHUNK_SIZE, CHUNK_VOLUME};
pub use info::{ChunkInfo, ChunkPart, FaceMask};
pub use store::{ApplyOutcome, ChunkStore};
