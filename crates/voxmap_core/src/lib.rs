//! # VOXMAP Core
//!
//! World data consumed by the terrain renderer:
//! - Block ids, face directions and the block property table
//! - A fixed-size world grid with bounds-checked lookups
//! - Block-change events drained by the renderer once per frame
//!
//! ## Example
//!
//! ```rust
//! use voxmap_core::{BlockId, World};
//!
//! let world = World::new(64, 32, 64).unwrap();
//! world.set_block(1, 2, 3, BlockId::STONE).unwrap();
//! assert_eq!(world.take_changes().len(), 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod block;
pub mod error;
pub mod world;

pub use block::{
    BlockId, BlockProperties, BlockRegistry, CollideType, Face, SoundType, Transparency, BLOCK_COUNT,
};
pub use error::{WorldError, WorldResult};
pub use world::{BlockChange, World, WorldView, MAX_WORLD_EXTENT};
