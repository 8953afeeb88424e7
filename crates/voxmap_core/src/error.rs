//! # World Error Types
//!
//! All errors that can occur while building or editing the world grid.

use thiserror::Error;

/// Errors that can occur in the world data layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// A block edit targeted a position outside the loaded map.
    #[error("block position ({x}, {y}, {z}) is outside the world")]
    OutOfBounds {
        /// X coordinate of the edit.
        x: i32,
        /// Y coordinate of the edit.
        y: i32,
        /// Z coordinate of the edit.
        z: i32,
    },

    /// The requested world dimensions are zero or too large.
    #[error("invalid world dimensions {width}x{height}x{length}")]
    InvalidDimensions {
        /// Width along X.
        width: usize,
        /// Height along Y.
        height: usize,
        /// Length along Z.
        length: usize,
    },

    /// Block data does not match the world volume.
    #[error("block data has {actual} entries, expected {expected}")]
    BlockDataSize {
        /// Expected number of blocks.
        expected: usize,
        /// Number of blocks supplied.
        actual: usize,
    },

    /// A block definition file could not be parsed.
    #[error("invalid block definition: {0}")]
    InvalidDefinition(String),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
