//! Terrain texture atlases.
//!
//! Block textures arrive as one 2D atlas of 16 tiles per row. Sampling
//! neighbouring tiles of a 2D atlas bleeds at tile seams once mipmapping or
//! filtering kicks in, so the renderer repacks the tiles into a few tall
//! one-tile-wide layers and addresses a tile by `(layer, row)`.

mod layout;
mod terrain_1d;
mod terrain_2d;

pub use layout::{AtlasLayout, UvRect, MAX_LAYER_DIMENSION};
pub use terrain_1d::TerrainAtlas1D;
pub use terrain_2d::{TerrainAtlas2D, TILES_PER_ROW};
