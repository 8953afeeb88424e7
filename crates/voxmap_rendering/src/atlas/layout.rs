//! Layer layout math, shared by the atlas and the mesh builders.

use crate::error::{RenderError, RenderResult};

use super::terrain_2d::TILES_PER_ROW;

/// Upper bound on the height of one layer, whatever the GPU supports.
pub const MAX_LAYER_DIMENSION: u32 = 4096;

/// Fraction of a tile kept clear on every edge of a UV rect.
const UV_INSET: f32 = 0.01 / 16.0;

/// Texture coordinates of one tile inside its layer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UvRect {
    /// Left edge.
    pub u1: f32,
    /// Top edge.
    pub v1: f32,
    /// Right edge.
    pub u2: f32,
    /// Bottom edge.
    pub v2: f32,
}

impl UvRect {
    /// Interpolates a point inside the rect, `(0, 0)` being the top left.
    #[inline]
    #[must_use]
    pub fn at(&self, fu: f32, fv: f32) -> [f32; 2] {
        [
            self.u1 + (self.u2 - self.u1) * fu,
            self.v1 + (self.v2 - self.v1) * fv,
        ]
    }
}

/// How tiles are distributed over layers.
///
/// Pure data: mesh workers carry a copy so they never touch the textures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasLayout {
    tile_size: u32,
    total_tiles: u32,
    elements_per_layer: u32,
    layer_count: u32,
    layer_height: u32,
    inv_element_size: f32,
}

impl AtlasLayout {
    /// Computes the layout for `total_tiles` square tiles of `tile_size`
    /// pixels on a GPU whose textures are at most `max_texture_dimension`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::AtlasLayout`] if there are no tiles or a single
    /// tile does not fit into a layer.
    pub fn compute(tile_size: u32, total_tiles: u32, max_texture_dimension: u32) -> RenderResult<Self> {
        if tile_size == 0 || total_tiles == 0 {
            return Err(RenderError::AtlasLayout("atlas has no tiles".to_owned()));
        }
        let max_height = max_texture_dimension.min(MAX_LAYER_DIMENSION);
        let per_full_layer = max_height / tile_size;
        if per_full_layer == 0 {
            return Err(RenderError::AtlasLayout(format!(
                "tile size {tile_size} exceeds maximum texture size {max_height}"
            )));
        }

        let layer_count = total_tiles.div_ceil(per_full_layer);
        let elements_per_layer = per_full_layer.min(total_tiles);
        let layer_height = (elements_per_layer * tile_size).next_power_of_two();
        #[allow(clippy::cast_precision_loss)]
        let inv_element_size = 1.0 / (layer_height / tile_size) as f32;

        Ok(Self {
            tile_size,
            total_tiles,
            elements_per_layer,
            layer_count,
            layer_height,
            inv_element_size,
        })
    }

    /// Edge length of one tile in pixels.
    #[inline]
    #[must_use]
    pub const fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of tiles in the source atlas.
    #[inline]
    #[must_use]
    pub const fn total_tiles(&self) -> u32 {
        self.total_tiles
    }

    /// Tiles stored in each layer.
    #[inline]
    #[must_use]
    pub const fn elements_per_layer(&self) -> u32 {
        self.elements_per_layer
    }

    /// Number of layers.
    #[inline]
    #[must_use]
    pub const fn layer_count(&self) -> usize {
        self.layer_count as usize
    }

    /// Height of every layer texture in pixels (a power of two).
    #[inline]
    #[must_use]
    pub const fn layer_height(&self) -> u32 {
        self.layer_height
    }

    /// Height of one tile as a fraction of the layer height.
    #[inline]
    #[must_use]
    pub const fn inv_element_size(&self) -> f32 {
        self.inv_element_size
    }

    /// Layer holding a texture id.
    #[inline]
    #[must_use]
    pub const fn layer_index(&self, texture_id: u16) -> usize {
        (texture_id as u32 / self.elements_per_layer) as usize
    }

    /// Row of a texture id inside its layer.
    #[inline]
    #[must_use]
    pub const fn row_index(&self, texture_id: u16) -> u32 {
        texture_id as u32 % self.elements_per_layer
    }

    /// Resolves a texture id to its layer and UV rect.
    #[must_use]
    pub fn resolve(&self, texture_id: u16) -> (usize, UvRect) {
        #[allow(clippy::cast_precision_loss)]
        let row = self.row_index(texture_id) as f32;
        let rect = UvRect {
            u1: UV_INSET,
            v1: (row + UV_INSET) * self.inv_element_size,
            u2: 1.0 - UV_INSET,
            v2: (row + 1.0 - UV_INSET) * self.inv_element_size,
        };
        (self.layer_index(texture_id), rect)
    }

    /// Number of layers a block table whose highest texture id is
    /// `max_texture_id` actually touches.
    ///
    /// Counts whole atlas rows, since a row is the unit texture packs are
    /// authored in.
    #[must_use]
    pub fn used_layers(&self, max_texture_id: u16) -> usize {
        let used_rows = u32::from(max_texture_id) / TILES_PER_ROW + 1;
        let used_tiles = (used_rows * TILES_PER_ROW).min(self.total_tiles);
        (used_tiles.div_ceil(self.elements_per_layer) as usize).min(self.layer_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_atlas_fits_one_layer() {
        // 256x256 atlas of 16px tiles
        let layout = AtlasLayout::compute(16, 256, 8192).unwrap();

        assert_eq!(layout.elements_per_layer(), 256);
        assert_eq!(layout.layer_count(), 1);
        assert_eq!(layout.layer_height(), 4096);
        assert!((layout.inv_element_size() - 1.0 / 256.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_small_textures_split_into_layers() {
        let layout = AtlasLayout::compute(16, 256, 1024).unwrap();

        assert_eq!(layout.elements_per_layer(), 64);
        assert_eq!(layout.layer_count(), 4);
        assert_eq!(layout.layer_index(63), 0);
        assert_eq!(layout.layer_index(64), 1);
        assert_eq!(layout.row_index(64), 0);
        assert_eq!(layout.row_index(130), 2);
    }

    #[test]
    fn test_layer_height_rounds_to_power_of_two() {
        // 3 rows of 16 tiles, 48 * 16 = 768 -> 1024
        let layout = AtlasLayout::compute(16, 48, 4096).unwrap();
        assert_eq!(layout.layer_height(), 1024);
        assert!((layout.inv_element_size() - 1.0 / 64.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_resolve_is_inset() {
        let layout = AtlasLayout::compute(16, 256, 4096).unwrap();
        let (layer, rect) = layout.resolve(5);
        let tile = layout.inv_element_size();

        assert_eq!(layer, 0);
        assert!(rect.u1 > 0.0 && rect.u2 < 1.0);
        assert!(rect.v1 > 5.0 * tile && rect.v1 < 5.0 * tile + tile * 0.01);
        assert!(rect.v2 < 6.0 * tile && rect.v2 > 6.0 * tile - tile * 0.01);
    }

    #[test]
    fn test_used_layers() {
        let layout = AtlasLayout::compute(16, 256, 1024).unwrap();

        // Texture 79 lives in row 4, rows 0..=4 are 80 tiles -> 2 layers of 64
        assert_eq!(layout.used_layers(79), 2);
        assert_eq!(layout.used_layers(0), 1);
        assert_eq!(layout.used_layers(255), 4);
    }

    #[test]
    fn test_oversized_tile_is_rejected() {
        assert!(matches!(
            AtlasLayout::compute(64, 256, 32),
            Err(RenderError::AtlasLayout(_))
        ));
        assert!(AtlasLayout::compute(16, 0, 4096).is_err());
    }
}
