//! Chunk visibility and ordering.
//!
//! Frustum tests decide which chunks are drawn, face flags decide which of
//! their directions can face the camera, and the sorter orders them for the
//! opaque and translucent passes.

mod frustum;
mod sorter;

pub use frustum::{Aabb, Frustum, FrustumCuller, Plane};
pub use sorter::ChunkSorter;
