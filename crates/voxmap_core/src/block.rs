//! Block ids, face directions and the block property table.
//!
//! The renderer never looks at block names or sounds; it only reads the
//! shape, transparency and per-face texture columns of this table.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};

/// Number of addressable block ids.
pub const BLOCK_COUNT: usize = 256;

/// A block id. `0` is always air.
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockId(pub u8);

impl BlockId {
    /// Air - the empty block.
    pub const AIR: Self = Self(0);
    /// Stone.
    pub const STONE: Self = Self(1);
    /// Grass.
    pub const GRASS: Self = Self(2);
    /// Dirt.
    pub const DIRT: Self = Self(3);
    /// Sapling (sprite).
    pub const SAPLING: Self = Self(6);
    /// Flowing water.
    pub const WATER: Self = Self(8);
    /// Still water.
    pub const STILL_WATER: Self = Self(9);
    /// Flowing lava.
    pub const LAVA: Self = Self(10);
    /// Leaves.
    pub const LEAVES: Self = Self(18);
    /// Glass.
    pub const GLASS: Self = Self(20);
    /// Dandelion (sprite).
    pub const DANDELION: Self = Self(37);
    /// Half slab.
    pub const SLAB: Self = Self(44);

    /// Returns true if this is the air id.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }

    /// Returns the id as a table index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u8> for BlockId {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

/// One of the six axis-aligned face directions.
///
/// The declaration order is the order faces are laid out in chunk vertex
/// buffers, so opposite faces of one axis are always adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Face {
    /// -X
    Left,
    /// +X
    Right,
    /// -Z
    Front,
    /// +Z
    Back,
    /// -Y
    Bottom,
    /// +Y
    Top,
}

impl Face {
    /// All faces in buffer order.
    pub const ALL: [Face; 6] = [
        Face::Left,
        Face::Right,
        Face::Front,
        Face::Back,
        Face::Bottom,
        Face::Top,
    ];

    /// Index of this face in per-face tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Face::Left => 0,
            Face::Right => 1,
            Face::Front => 2,
            Face::Back => 3,
            Face::Bottom => 4,
            Face::Top => 5,
        }
    }

    /// Unit offset to the neighbouring cell this face looks at.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> [i32; 3] {
        match self {
            Face::Left => [-1, 0, 0],
            Face::Right => [1, 0, 0],
            Face::Front => [0, 0, -1],
            Face::Back => [0, 0, 1],
            Face::Bottom => [0, -1, 0],
            Face::Top => [0, 1, 0],
        }
    }

    /// The face pointing the other way along the same axis.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Face {
        match self {
            Face::Left => Face::Right,
            Face::Right => Face::Left,
            Face::Front => Face::Back,
            Face::Back => Face::Front,
            Face::Bottom => Face::Top,
            Face::Top => Face::Bottom,
        }
    }

    /// Axis index (0 = X, 1 = Y, 2 = Z).
    #[inline]
    #[must_use]
    pub const fn axis(self) -> usize {
        match self {
            Face::Left | Face::Right => 0,
            Face::Bottom | Face::Top => 1,
            Face::Front | Face::Back => 2,
        }
    }

    /// True for faces whose normal points along the positive axis.
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self, Face::Right | Face::Back | Face::Top)
    }
}

/// How entities collide with a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollideType {
    /// Walk-through (air, plants).
    None,
    /// Swimmable (water, lava).
    Liquid,
    /// Solid.
    #[default]
    Solid,
}

/// How a block's pixels combine with what is behind them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transparency {
    /// Fully opaque, hides everything behind it.
    #[default]
    Opaque,
    /// Pixels are either fully opaque or fully clear (glass, leaves).
    Transparent,
    /// Alpha blended (water).
    Translucent,
}

/// Step/dig sound class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundType {
    /// Silent.
    None,
    /// Wood.
    Wood,
    /// Gravel.
    Gravel,
    /// Grass.
    Grass,
    /// Stone.
    #[default]
    Stone,
    /// Metal.
    Metal,
    /// Glass.
    Glass,
    /// Cloth.
    Cloth,
    /// Sand.
    Sand,
}

/// Properties of a single block id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockProperties {
    /// Display name.
    pub name: String,
    /// True for the empty block and undefined ids.
    pub air: bool,
    /// Drawn as two crossing quads instead of a cuboid.
    pub sprite: bool,
    /// Ignores face shading.
    pub full_bright: bool,
    /// Collision class.
    pub collide: CollideType,
    /// Transparency class.
    pub transparency: Transparency,
    /// Minimum bounding box corner inside the unit cube.
    pub min_bb: [f32; 3],
    /// Maximum bounding box corner inside the unit cube.
    pub max_bb: [f32; 3],
    /// Texture id per face, indexed by [`Face::index`].
    pub textures: [u16; 6],
    /// Step sound class.
    pub step_sound: SoundType,
}

impl Default for BlockProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            air: false,
            sprite: false,
            full_bright: false,
            collide: CollideType::Solid,
            transparency: Transparency::Opaque,
            min_bb: [0.0; 3],
            max_bb: [1.0; 3],
            textures: [0; 6],
            step_sound: SoundType::Stone,
        }
    }
}

impl BlockProperties {
    /// The air block.
    #[must_use]
    pub fn air() -> Self {
        Self {
            name: "Air".to_owned(),
            air: true,
            collide: CollideType::None,
            transparency: Transparency::Transparent,
            step_sound: SoundType::None,
            ..Self::default()
        }
    }

    /// An opaque full cube using one texture on every face.
    #[must_use]
    pub fn cube(name: &str, texture: u16, sound: SoundType) -> Self {
        Self {
            name: name.to_owned(),
            textures: [texture; 6],
            step_sound: sound,
            ..Self::default()
        }
    }

    /// A sprite (plant) block.
    #[must_use]
    pub fn plant(name: &str, texture: u16) -> Self {
        Self {
            name: name.to_owned(),
            sprite: true,
            collide: CollideType::None,
            transparency: Transparency::Transparent,
            textures: [texture; 6],
            step_sound: SoundType::Grass,
            ..Self::default()
        }
    }

    /// A liquid block.
    #[must_use]
    pub fn liquid(name: &str, texture: u16, transparency: Transparency, full_bright: bool) -> Self {
        Self {
            name: name.to_owned(),
            full_bright,
            collide: CollideType::Liquid,
            transparency,
            textures: [texture; 6],
            step_sound: SoundType::None,
            ..Self::default()
        }
    }

    /// Replaces the textures with separate top, side and bottom ids.
    #[must_use]
    pub fn with_textures(mut self, top: u16, side: u16, bottom: u16) -> Self {
        self.textures = [side, side, side, side, bottom, top];
        self
    }

    /// Replaces the transparency class.
    #[must_use]
    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    /// Replaces the maximum bounding box corner.
    #[must_use]
    pub fn with_max_bb(mut self, max_bb: [f32; 3]) -> Self {
        self.max_bb = max_bb;
        self
    }

    /// Returns true if the bounding box fills the whole cell.
    #[must_use]
    pub fn is_full_cube(&self) -> bool {
        self.min_bb == [0.0; 3] && self.max_bb == [1.0; 3]
    }
}

/// One entry of a block definition file.
#[derive(Debug, Deserialize)]
struct BlockDefinition {
    id: u8,
    #[serde(flatten)]
    properties: BlockProperties,
}

/// Top-level layout of a block definition file.
#[derive(Debug, Default, Deserialize)]
struct BlockDefinitionFile {
    #[serde(default, rename = "block")]
    blocks: Vec<BlockDefinition>,
}

/// The block property table, indexed by [`BlockId`].
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    blocks: Vec<BlockProperties>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// Creates a table where every id is air.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: vec![BlockProperties::air(); BLOCK_COUNT],
        }
    }

    /// Creates the table of the 50 classic blocks.
    #[must_use]
    pub fn classic() -> Self {
        use SoundType::{Cloth, Glass, Grass, Gravel, Metal, Sand, Stone, Wood};

        let mut registry = Self::new();
        let mut define = |id: u8, props: BlockProperties| registry.blocks[id as usize] = props;

        define(1, BlockProperties::cube("Stone", 1, Stone));
        define(2, BlockProperties::cube("Grass", 3, Grass).with_textures(0, 3, 2));
        define(3, BlockProperties::cube("Dirt", 2, Gravel));
        define(4, BlockProperties::cube("Cobblestone", 16, Stone));
        define(5, BlockProperties::cube("Wood", 4, Wood));
        define(6, BlockProperties::plant("Sapling", 15));
        define(7, BlockProperties::cube("Bedrock", 17, Stone));
        define(8, BlockProperties::liquid("Water", 14, Transparency::Translucent, false));
        define(9, BlockProperties::liquid("Still water", 14, Transparency::Translucent, false));
        define(10, BlockProperties::liquid("Lava", 30, Transparency::Opaque, true));
        define(11, BlockProperties::liquid("Still lava", 30, Transparency::Opaque, true));
        define(12, BlockProperties::cube("Sand", 18, Sand));
        define(13, BlockProperties::cube("Gravel", 19, Gravel));
        define(14, BlockProperties::cube("Gold ore", 32, Stone));
        define(15, BlockProperties::cube("Iron ore", 33, Stone));
        define(16, BlockProperties::cube("Coal ore", 34, Stone));
        define(17, BlockProperties::cube("Log", 20, Wood).with_textures(21, 20, 21));
        define(
            18,
            BlockProperties::cube("Leaves", 22, Grass).with_transparency(Transparency::Transparent),
        );
        define(19, BlockProperties::cube("Sponge", 48, Grass));
        define(
            20,
            BlockProperties::cube("Glass", 49, Glass).with_transparency(Transparency::Transparent),
        );

        const WOOL: [&str; 16] = [
            "Red", "Orange", "Yellow", "Lime", "Green", "Teal", "Aqua", "Cyan", "Blue", "Indigo",
            "Violet", "Magenta", "Pink", "Black", "Gray", "White",
        ];
        for (i, colour) in WOOL.iter().enumerate() {
            let id = 21 + i as u8;
            define(id, BlockProperties::cube(&format!("{colour} wool"), 64 + i as u16, Cloth));
        }

        define(37, BlockProperties::plant("Dandelion", 13));
        define(38, BlockProperties::plant("Rose", 12));
        define(39, BlockProperties::plant("Brown mushroom", 29));
        define(40, BlockProperties::plant("Red mushroom", 28));
        define(41, BlockProperties::cube("Gold", 40, Metal).with_textures(24, 40, 56));
        define(42, BlockProperties::cube("Iron", 39, Metal).with_textures(23, 39, 55));
        define(43, BlockProperties::cube("Double slab", 5, Stone).with_textures(6, 5, 6));
        define(
            44,
            BlockProperties::cube("Slab", 5, Stone)
                .with_textures(6, 5, 6)
                .with_max_bb([1.0, 0.5, 1.0]),
        );
        define(45, BlockProperties::cube("Brick", 7, Stone));
        define(46, BlockProperties::cube("TNT", 8, Grass).with_textures(9, 8, 10));
        define(47, BlockProperties::cube("Bookshelf", 35, Wood).with_textures(4, 35, 4));
        define(48, BlockProperties::cube("Mossy rocks", 36, Stone));
        define(49, BlockProperties::cube("Obsidian", 37, Stone));

        registry
    }

    /// Creates the classic table and applies the definitions in a TOML file.
    ///
    /// ```toml
    /// [[block]]
    /// id = 50
    /// name = "Snow"
    /// textures = [50, 50, 50, 50, 50, 50]
    /// max_bb = [1.0, 0.125, 1.0]
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDefinition`] if the file does not parse.
    pub fn from_toml_str(source: &str) -> WorldResult<Self> {
        let file: BlockDefinitionFile =
            toml::from_str(source).map_err(|e| WorldError::InvalidDefinition(e.to_string()))?;

        let mut registry = Self::classic();
        for def in file.blocks {
            if def.id == 0 {
                return Err(WorldError::InvalidDefinition("block 0 is reserved for air".to_owned()));
            }
            registry.set(BlockId(def.id), def.properties);
        }
        Ok(registry)
    }

    /// Returns the properties of a block.
    #[inline]
    #[must_use]
    pub fn get(&self, id: BlockId) -> &BlockProperties {
        &self.blocks[id.index()]
    }

    /// Replaces the properties of a block. Air (id 0) cannot be redefined.
    pub fn set(&mut self, id: BlockId, properties: BlockProperties) {
        if id.is_air() {
            return;
        }
        self.blocks[id.index()] = properties;
    }

    /// Returns true if the block is air or undefined.
    #[inline]
    #[must_use]
    pub fn is_air(&self, id: BlockId) -> bool {
        self.get(id).air
    }

    /// Returns true if the block is drawn as a sprite.
    #[inline]
    #[must_use]
    pub fn is_sprite(&self, id: BlockId) -> bool {
        self.get(id).sprite
    }

    /// Returns true if the block ignores face shading.
    #[inline]
    #[must_use]
    pub fn is_full_bright(&self, id: BlockId) -> bool {
        self.get(id).full_bright
    }

    /// Returns the collision class.
    #[inline]
    #[must_use]
    pub fn collide_type(&self, id: BlockId) -> CollideType {
        self.get(id).collide
    }

    /// Returns the transparency class.
    #[inline]
    #[must_use]
    pub fn transparency(&self, id: BlockId) -> Transparency {
        self.get(id).transparency
    }

    /// Returns the minimum bounding box corner.
    #[inline]
    #[must_use]
    pub fn min_bb(&self, id: BlockId) -> [f32; 3] {
        self.get(id).min_bb
    }

    /// Returns the maximum bounding box corner.
    #[inline]
    #[must_use]
    pub fn max_bb(&self, id: BlockId) -> [f32; 3] {
        self.get(id).max_bb
    }

    /// Returns the texture id used on one face of a block.
    #[inline]
    #[must_use]
    pub fn face_texture(&self, id: BlockId, face: Face) -> u16 {
        self.get(id).textures[face.index()]
    }

    /// Returns the highest texture id referenced by any non-air block.
    #[must_use]
    pub fn max_texture_id(&self) -> u16 {
        self.blocks
            .iter()
            .filter(|props| !props.air)
            .flat_map(|props| props.textures)
            .max()
            .unwrap_or(0)
    }
}
