//! Per-block mesh tables.
//!
//! The block property table is resolved once into a [`BlockShape`] per id,
//! with texture layers and UV rects already looked up. The meshing loop
//! then only matches on the shape tag.

use tracing::warn;
use voxmap_core::{BlockId, BlockRegistry, Face, Transparency, BLOCK_COUNT};

use crate::atlas::{AtlasLayout, UvRect};

/// Which part of a chunk a block's geometry goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshPass {
    /// Opaque and alpha-tested geometry.
    Normal,
    /// Alpha-blended geometry.
    Translucent,
}

/// A resolved texture: atlas layer and UV rect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceTexture {
    /// Atlas layer.
    pub layer: usize,
    /// UV rect inside the layer.
    pub uv: UvRect,
}

/// How one block id is meshed.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockShape {
    /// Nothing is emitted.
    Air,
    /// Two crossing double-sided quads, never culled against neighbours.
    Sprite {
        /// Texture of both quads.
        texture: FaceTexture,
    },
    /// An axis-aligned box inside the cell.
    Cuboid {
        /// Minimum corner in the unit cube.
        min: [f32; 3],
        /// Maximum corner in the unit cube.
        max: [f32; 3],
        /// Texture per face, indexed by [`Face::index`].
        textures: [FaceTexture; 6],
        /// Skip face shading.
        full_bright: bool,
        /// Target part.
        pass: MeshPass,
    },
}

/// How a block hides the faces of its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occluder {
    /// Hides nothing (air, sprites, partial boxes).
    None,
    /// Hides every face.
    Opaque,
    /// Hides faces of translucent blocks.
    Translucent,
    /// Hides faces of the same block.
    Transparent,
}

/// Lookup tables shared by every mesh builder.
#[derive(Debug, Clone)]
pub struct MeshTables {
    shapes: Vec<BlockShape>,
    occluders: Vec<Occluder>,
    translucent: Vec<bool>,
    layout: AtlasLayout,
}

impl MeshTables {
    /// Resolves every block of `registry` against `layout`.
    ///
    /// Texture ids outside the atlas fall back to texture 0.
    #[must_use]
    pub fn new(registry: &BlockRegistry, layout: AtlasLayout) -> Self {
        let mut shapes = Vec::with_capacity(BLOCK_COUNT);
        let mut occluders = Vec::with_capacity(BLOCK_COUNT);
        let mut translucent = Vec::with_capacity(BLOCK_COUNT);

        let resolve = |id: usize, texture: u16| {
            let texture = if u32::from(texture) < layout.total_tiles() {
                texture
            } else {
                warn!(block = id, texture, "Texture id outside the terrain atlas");
                0
            };
            let (layer, uv) = layout.resolve(texture);
            FaceTexture { layer, uv }
        };

        for raw in 0..BLOCK_COUNT {
            #[allow(clippy::cast_possible_truncation)]
            let props = registry.get(BlockId(raw as u8));

            let (shape, occluder) = if props.air {
                (BlockShape::Air, Occluder::None)
            } else if props.sprite {
                let shape = BlockShape::Sprite {
                    texture: resolve(raw, props.textures[Face::Right.index()]),
                };
                (shape, Occluder::None)
            } else {
                let pass = if props.transparency == Transparency::Translucent {
                    MeshPass::Translucent
                } else {
                    MeshPass::Normal
                };
                let occluder = if !props.is_full_cube() {
                    Occluder::None
                } else {
                    match props.transparency {
                        Transparency::Opaque => Occluder::Opaque,
                        Transparency::Translucent => Occluder::Translucent,
                        Transparency::Transparent => Occluder::Transparent,
                    }
                };
                let shape = BlockShape::Cuboid {
                    min: props.min_bb,
                    max: props.max_bb,
                    textures: Face::ALL.map(|face| resolve(raw, props.textures[face.index()])),
                    full_bright: props.full_bright,
                    pass,
                };
                (shape, occluder)
            };

            shapes.push(shape);
            occluders.push(occluder);
            translucent.push(props.transparency == Transparency::Translucent);
        }

        Self {
            shapes,
            occluders,
            translucent,
            layout,
        }
    }

    /// Shape of a block.
    #[inline]
    #[must_use]
    pub fn shape(&self, id: BlockId) -> &BlockShape {
        &self.shapes[id.index()]
    }

    /// The atlas layout the textures were resolved against.
    #[inline]
    #[must_use]
    pub const fn layout(&self) -> &AtlasLayout {
        &self.layout
    }

    /// Number of atlas layers.
    #[inline]
    #[must_use]
    pub const fn layer_count(&self) -> usize {
        self.layout.layer_count()
    }

    /// Returns true if `neighbour` fully hides the face of `block` that
    /// touches it.
    #[inline]
    #[must_use]
    pub fn occludes(&self, block: BlockId, neighbour: BlockId) -> bool {
        match self.occluders[neighbour.index()] {
            Occluder::None => false,
            Occluder::Opaque => true,
            Occluder::Translucent => self.translucent[block.index()],
            Occluder::Transparent => block == neighbour,
        }
    }
}
