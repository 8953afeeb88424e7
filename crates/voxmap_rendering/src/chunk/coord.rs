//! Chunk coordinates.

use crate::culling::Aabb;

/// Chunk edge length in blocks.
pub const CHUNK_SIZE: i32 = 16;

/// `log2(CHUNK_SIZE)`.
pub const CHUNK_SHIFT: u32 = 4;

/// Blocks per chunk.
pub const CHUNK_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Position of a chunk: block position divided by [`CHUNK_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChunkCoord {
    /// X in chunks.
    pub x: i32,
    /// Y in chunks.
    pub y: i32,
    /// Z in chunks.
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing a block.
    #[inline]
    #[must_use]
    pub const fn from_block(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: x >> CHUNK_SHIFT,
            y: y >> CHUNK_SHIFT,
            z: z >> CHUNK_SHIFT,
        }
    }

    /// Block position of the chunk's minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin(self) -> [i32; 3] {
        [self.x * CHUNK_SIZE, self.y * CHUNK_SIZE, self.z * CHUNK_SIZE]
    }

    /// World-space centre of the chunk.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centre(self) -> [f32; 3] {
        let half = CHUNK_SIZE / 2;
        let [x, y, z] = self.origin();
        [(x + half) as f32, (y + half) as f32, (z + half) as f32]
    }

    /// World-space bounds of the chunk.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bounds(self) -> Aabb {
        Aabb::cube(self.origin().map(|v| v as f32), CHUNK_SIZE as f32)
    }

    /// Neighbouring chunk in a direction.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}
