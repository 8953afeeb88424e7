//! The source 2D terrain atlas.

use crate::error::{RenderError, RenderResult};

/// Tiles in one row of a terrain atlas.
pub const TILES_PER_ROW: u32 = 16;

/// A terrain atlas image: square tiles, 16 per row, RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct TerrainAtlas2D {
    width: u32,
    height: u32,
    tile_size: u32,
    rgba: Vec<u8>,
}

impl TerrainAtlas2D {
    /// Wraps an RGBA8 image.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::AtlasLayout`] if the width is not a multiple of
    /// 16, the height is not a whole number of tile rows, or the pixel data
    /// does not match the dimensions.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> RenderResult<Self> {
        if width == 0 || width % TILES_PER_ROW != 0 {
            return Err(RenderError::AtlasLayout(format!(
                "atlas width {width} is not a multiple of {TILES_PER_ROW}"
            )));
        }
        let tile_size = width / TILES_PER_ROW;
        if height == 0 || height % tile_size != 0 {
            return Err(RenderError::AtlasLayout(format!(
                "atlas height {height} is not a multiple of the tile size {tile_size}"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RenderError::AtlasLayout(format!(
                "atlas has {} bytes of pixels, expected {expected}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            tile_size,
            rgba,
        })
    }

    /// Creates an atlas where every tile is filled by `colour(tile_id)`.
    ///
    /// Handy as a placeholder before a texture pack is loaded.
    #[must_use]
    pub fn solid_tiles<F>(tile_size: u32, rows: u32, mut colour: F) -> Self
    where
        F: FnMut(u32) -> [u8; 4],
    {
        let width = tile_size * TILES_PER_ROW;
        let height = tile_size * rows;
        let mut rgba = vec![0; width as usize * height as usize * 4];

        for y in 0..height {
            for x in 0..width {
                let tile = (y / tile_size) * TILES_PER_ROW + x / tile_size;
                let offset = (y as usize * width as usize + x as usize) * 4;
                rgba[offset..offset + 4].copy_from_slice(&colour(tile));
            }
        }

        Self {
            width,
            height,
            tile_size,
            rgba,
        }
    }

    /// Image width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Edge length of a tile in pixels.
    #[inline]
    #[must_use]
    pub const fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of tile rows.
    #[inline]
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.height / self.tile_size
    }

    /// Number of tiles.
    #[inline]
    #[must_use]
    pub const fn tile_count(&self) -> u32 {
        self.rows() * TILES_PER_ROW
    }

    /// Copies one tile into `dst`, a `tile_size` wide RGBA8 image, with the
    /// tile's top row at pixel row `dst_row`.
    pub(crate) fn copy_tile(&self, tile: u32, dst: &mut [u8], dst_row: u32) {
        let size = self.tile_size as usize;
        let src_x = (tile % TILES_PER_ROW) as usize * size;
        let src_y = (tile / TILES_PER_ROW) as usize * size;
        let stride = self.width as usize * 4;

        for row in 0..size {
            let src = (src_y + row) * stride + src_x * 4;
            let dst_offset = (dst_row as usize + row) * size * 4;
            dst[dst_offset..dst_offset + size * 4].copy_from_slice(&self.rgba[src..src + size * 4]);
        }
    }
}
