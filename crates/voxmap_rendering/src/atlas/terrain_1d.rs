//! The terrain atlas as uploaded layers.

use tracing::debug;

use super::layout::{AtlasLayout, UvRect};
use super::terrain_2d::TerrainAtlas2D;
use crate::backend::{GraphicsBackend, TextureId};
use crate::error::RenderResult;

/// A [`TerrainAtlas2D`] repacked into one-tile-wide layer textures.
#[derive(Debug)]
pub struct TerrainAtlas1D {
    layout: AtlasLayout,
    textures: Vec<TextureId>,
}

impl TerrainAtlas1D {
    /// Repacks `atlas` and uploads every layer.
    ///
    /// Rebuilding the atlas invalidates every chunk mesh: callers must
    /// rebuild all chunks afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::AtlasLayout`] if the tiles cannot be
    /// laid out, or the backend's error if a layer cannot be uploaded. No
    /// texture is leaked on failure.
    pub fn build<B: GraphicsBackend + ?Sized>(atlas: &TerrainAtlas2D, backend: &mut B) -> RenderResult<Self> {
        Self::build_capped(atlas, backend, u32::MAX)
    }

    /// Like [`Self::build`], with layers no taller than `max_dimension`
    /// even if the backend supports more.
    ///
    /// # Errors
    ///
    /// Same as [`Self::build`].
    pub fn build_capped<B: GraphicsBackend + ?Sized>(
        atlas: &TerrainAtlas2D,
        backend: &mut B,
        max_dimension: u32,
    ) -> RenderResult<Self> {
        let layout = AtlasLayout::compute(
            atlas.tile_size(),
            atlas.tile_count(),
            backend.max_texture_dimension().min(max_dimension),
        )?;

        let tile_size = layout.tile_size();
        let layer_bytes = tile_size as usize * layout.layer_height() as usize * 4;
        let mut textures = Vec::with_capacity(layout.layer_count());
        let mut pixels = vec![0u8; layer_bytes];
        let mut tile = 0;

        for _ in 0..layout.layer_count() {
            pixels.fill(0);
            for element in 0..layout.elements_per_layer() {
                if tile >= layout.total_tiles() {
                    break;
                }
                atlas.copy_tile(tile, &mut pixels, element * tile_size);
                tile += 1;
            }

            match backend.create_texture(tile_size, layout.layer_height(), &pixels) {
                Ok(texture) => textures.push(texture),
                Err(err) => {
                    for texture in textures {
                        backend.delete_texture(texture);
                    }
                    return Err(err);
                }
            }
        }

        debug!(
            layers = layout.layer_count(),
            per_layer = layout.elements_per_layer(),
            "Loaded new terrain atlas"
        );
        Ok(Self { layout, textures })
    }

    /// The layer layout.
    #[inline]
    #[must_use]
    pub const fn layout(&self) -> &AtlasLayout {
        &self.layout
    }

    /// Number of layers.
    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.textures.len()
    }

    /// Texture of a layer.
    #[inline]
    #[must_use]
    pub fn texture(&self, layer: usize) -> Option<TextureId> {
        self.textures.get(layer).copied()
    }

    /// Resolves a texture id to its layer and UV rect.
    #[inline]
    #[must_use]
    pub fn resolve(&self, texture_id: u16) -> (usize, UvRect) {
        self.layout.resolve(texture_id)
    }

    /// Layer holding a texture id.
    #[inline]
    #[must_use]
    pub const fn layer_index(&self, texture_id: u16) -> usize {
        self.layout.layer_index(texture_id)
    }

    /// Row of a texture id inside its layer.
    #[inline]
    #[must_use]
    pub const fn row_index(&self, texture_id: u16) -> u32 {
        self.layout.row_index(texture_id)
    }

    /// Number of layers touched by texture ids up to `max_texture_id`.
    #[must_use]
    pub fn used_layers(&self, max_texture_id: u16) -> usize {
        let used = self.layout.used_layers(max_texture_id);
        debug!(used, "Used atlas layers");
        used
    }

    /// Deletes every layer texture.
    pub fn dispose<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        for texture in self.textures.drain(..) {
            backend.delete_texture(texture);
        }
    }
}
