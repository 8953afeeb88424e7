//! Bordered chunk snapshots.
//!
//! A mesh is built from a copy of the chunk plus a one-block border taken
//! from the neighbouring chunks, so building never touches the world and
//! can run on any thread.

use ndshape::{ConstShape, ConstShape3u32};
use voxmap_core::{BlockId, WorldView};

use crate::chunk::{ChunkCoord, CHUNK_SIZE};

/// Edge length of a snapshot: the chunk plus one block on each side.
pub const PADDED_CHUNK_SIZE: u32 = CHUNK_SIZE as u32 + 2;

/// Shape of the padded snapshot (18x18x18).
pub type PaddedChunkShape = ConstShape3u32<PADDED_CHUNK_SIZE, PADDED_CHUNK_SIZE, PADDED_CHUNK_SIZE>;

/// Blocks in a snapshot.
pub const PADDED_CHUNK_VOLUME: usize =
    (PADDED_CHUNK_SIZE * PADDED_CHUNK_SIZE * PADDED_CHUNK_SIZE) as usize;

/// A chunk's blocks plus a one-block border.
#[derive(Clone)]
pub struct ChunkSnapshot {
    coord: ChunkCoord,
    blocks: Box<[BlockId]>,
    solid_blocks: u32,
}

impl ChunkSnapshot {
    /// Copies a chunk and its border out of the world. Blocks outside the
    /// world read as air.
    #[must_use]
    pub fn capture(view: &WorldView<'_>, coord: ChunkCoord) -> Self {
        let [ox, oy, oz] = coord.origin();
        Self::from_fn(coord, |x, y, z| view.block_at(ox + x, oy + y, oz + z))
    }

    /// Builds a snapshot from a function of chunk-local coordinates in
    /// `-1..=16`.
    pub fn from_fn<F>(coord: ChunkCoord, mut block: F) -> Self
    where
        F: FnMut(i32, i32, i32) -> BlockId,
    {
        let mut blocks = vec![BlockId::AIR; PADDED_CHUNK_VOLUME].into_boxed_slice();
        let mut solid_blocks = 0;

        for pz in 0..PADDED_CHUNK_SIZE {
            for py in 0..PADDED_CHUNK_SIZE {
                for px in 0..PADDED_CHUNK_SIZE {
                    let (x, y, z) = (px as i32 - 1, py as i32 - 1, pz as i32 - 1);
                    let id = block(x, y, z);
                    blocks[PaddedChunkShape::linearize([px, py, pz]) as usize] = id;

                    let inside = (0..CHUNK_SIZE).contains(&x)
                        && (0..CHUNK_SIZE).contains(&y)
                        && (0..CHUNK_SIZE).contains(&z);
                    if inside && !id.is_air() {
                        solid_blocks += 1;
                    }
                }
            }
        }

        Self {
            coord,
            blocks,
            solid_blocks,
        }
    }

    /// The chunk this snapshot was taken from.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Block at chunk-local coordinates in `-1..=16`.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockId {
        let index = PaddedChunkShape::linearize([(x + 1) as u32, (y + 1) as u32, (z + 1) as u32]);
        self.blocks[index as usize]
    }

    /// Returns true if every block inside the chunk (border excluded) has
    /// id 0.
    #[inline]
    #[must_use]
    pub const fn is_all_air(&self) -> bool {
        self.solid_blocks == 0
    }
}

impl std::fmt::Debug for ChunkSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSnapshot")
            .field("coord", &self.coord)
            .field("solid_blocks", &self.solid_blocks)
            .finish_non_exhaustive()
    }
}
