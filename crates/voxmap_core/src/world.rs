//! World grid management.
//!
//! A fixed-size map of block ids. Edits are recorded as [`BlockChange`]s
//! which the renderer drains once per frame.

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::block::BlockId;
use crate::error::{WorldError, WorldResult};

/// Largest supported extent along any axis.
pub const MAX_WORLD_EXTENT: usize = 4096;

/// A single block edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockChange {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
    /// Block before the edit.
    pub old: BlockId,
    /// Block after the edit.
    pub new: BlockId,
}

/// Voxel world of a fixed size.
///
/// Thread-safe: the network thread may write while the render thread
/// snapshots chunks. Every lock is held only for the duration of a call.
pub struct World {
    width: usize,
    height: usize,
    length: usize,

    /// Blocks in Y-Z-X order: `blocks[(y * length + z) * width + x]`.
    blocks: RwLock<Box<[BlockId]>>,

    /// Edits not yet seen by the renderer.
    changes: Mutex<Vec<BlockChange>>,
}

impl World {
    /// Creates a world filled with air.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if any extent is zero or
    /// larger than [`MAX_WORLD_EXTENT`].
    pub fn new(width: usize, height: usize, length: usize) -> WorldResult<Self> {
        Self::validate_dims(width, height, length)?;
        let volume = width * height * length;
        Self::from_blocks(width, height, length, vec![BlockId::AIR; volume])
    }

    /// Creates a world from existing block data in Y-Z-X order.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are invalid or the data length
    /// does not match the volume.
    pub fn from_blocks(
        width: usize,
        height: usize,
        length: usize,
        blocks: Vec<BlockId>,
    ) -> WorldResult<Self> {
        Self::validate_dims(width, height, length)?;
        let expected = width * height * length;
        if blocks.len() != expected {
            return Err(WorldError::BlockDataSize {
                expected,
                actual: blocks.len(),
            });
        }
        Ok(Self {
            width,
            height,
            length,
            blocks: RwLock::new(blocks.into_boxed_slice()),
            changes: Mutex::new(Vec::new()),
        })
    }

    /// Creates a world by evaluating `f` at every position.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] for invalid extents.
    pub fn generate<F>(width: usize, height: usize, length: usize, mut f: F) -> WorldResult<Self>
    where
        F: FnMut(usize, usize, usize) -> BlockId,
    {
        Self::validate_dims(width, height, length)?;
        let mut blocks = Vec::with_capacity(width * height * length);
        for y in 0..height {
            for z in 0..length {
                for x in 0..width {
                    blocks.push(f(x, y, z));
                }
            }
        }
        Self::from_blocks(width, height, length, blocks)
    }

    fn validate_dims(width: usize, height: usize, length: usize) -> WorldResult<()> {
        let valid = |v: usize| v > 0 && v <= MAX_WORLD_EXTENT;
        if valid(width) && valid(height) && valid(length) {
            Ok(())
        } else {
            Err(WorldError::InvalidDimensions {
                width,
                height,
                length,
            })
        }
    }

    /// Returns `[width, height, length]`.
    #[inline]
    #[must_use]
    pub const fn dims(&self) -> [usize; 3] {
        [self.width, self.height, self.length]
    }

    /// Returns true if the position is inside the map.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        in_bounds(self.dims(), x, y, z)
    }

    /// Gets a block, returning air outside the map.
    #[must_use]
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.read().block_at(x, y, z)
    }

    /// Sets a block and records the change.
    ///
    /// Returns `None` when the block already had that id.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] for positions outside the map.
    pub fn set_block(&self, x: i32, y: i32, z: i32, block: BlockId) -> WorldResult<Option<BlockChange>> {
        if !self.contains(x, y, z) {
            return Err(WorldError::OutOfBounds { x, y, z });
        }
        let index = linear_index(self.dims(), x, y, z);

        let old = {
            let mut blocks = self.blocks.write();
            let old = blocks[index];
            if old == block {
                return Ok(None);
            }
            blocks[index] = block;
            old
        };

        let change = BlockChange {
            x,
            y,
            z,
            old,
            new: block,
        };
        self.changes.lock().push(change);
        Ok(Some(change))
    }

    /// Returns and clears the list of unseen edits, oldest first.
    pub fn take_changes(&self) -> Vec<BlockChange> {
        std::mem::take(&mut *self.changes.lock())
    }

    /// Returns the number of unseen edits.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.changes.lock().len()
    }

    /// Locks the grid for a batch of reads.
    ///
    /// Keep the view short-lived: writers wait while it exists.
    #[must_use]
    pub fn read(&self) -> WorldView<'_> {
        WorldView {
            dims: self.dims(),
            blocks: self.blocks.read(),
        }
    }
}

/// Read access to the whole grid without per-block locking.
pub struct WorldView<'a> {
    dims: [usize; 3],
    blocks: RwLockReadGuard<'a, Box<[BlockId]>>,
}

impl WorldView<'_> {
    /// Returns `[width, height, length]`.
    #[inline]
    #[must_use]
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Gets a block, returning air outside the map.
    #[inline]
    #[must_use]
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId {
        if in_bounds(self.dims, x, y, z) {
            self.blocks[linear_index(self.dims, x, y, z)]
        } else {
            BlockId::AIR
        }
    }
}

#[inline]
fn in_bounds(dims: [usize; 3], x: i32, y: i32, z: i32) -> bool {
    x >= 0
        && y >= 0
        && z >= 0
        && (x as usize) < dims[0]
        && (y as usize) < dims[1]
        && (z as usize) < dims[2]
}

#[inline]
fn linear_index(dims: [usize; 3], x: i32, y: i32, z: i32) -> usize {
    (y as usize * dims[2] + z as usize) * dims[0] + x as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_operations() {
        let world = World::new(32, 16, 32).unwrap();

        let change = world.set_block(5, 10, 15, BlockId(42)).unwrap();
        assert_eq!(
            change,
            Some(BlockChange {
                x: 5,
                y: 10,
                z: 15,
                old: BlockId::AIR,
                new: BlockId(42),
            })
        );
        assert_eq!(world.block_at(5, 10, 15), BlockId(42));

        // Same block again is not a change
        assert_eq!(world.set_block(5, 10, 15, BlockId(42)).unwrap(), None);

        let changes = world.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(world.pending_changes(), 0);
    }

    #[test]
    fn test_out_of_range_reads_are_air() {
        let world = World::generate(4, 4, 4, |_, _, _| BlockId::STONE).unwrap();

        assert_eq!(world.block_at(0, 0, 0), BlockId::STONE);
        assert_eq!(world.block_at(-1, 0, 0), BlockId::AIR);
        assert_eq!(world.block_at(0, 4, 0), BlockId::AIR);
        assert_eq!(world.read().block_at(3, 3, 4), BlockId::AIR);
    }

    #[test]
    fn test_out_of_range_writes_fail() {
        let world = World::new(4, 4, 4).unwrap();
        let result = world.set_block(4, 0, 0, BlockId::STONE);
        assert_eq!(result, Err(WorldError::OutOfBounds { x: 4, y: 0, z: 0 }));
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(matches!(World::new(0, 4, 4), Err(WorldError::InvalidDimensions { .. })));
        assert!(matches!(
            World::from_blocks(2, 2, 2, vec![BlockId::AIR; 7]),
            Err(WorldError::BlockDataSize { expected: 8, actual: 7 })
        ));
    }
}
