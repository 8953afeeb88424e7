//! Renderer configuration.
//!
//! Loaded once at startup from a TOML file. Every field has a default, so
//! an empty file is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Width of the shared quad index buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFormat {
    /// 16-bit indices. Parts over 65536 vertices are drawn in two calls.
    #[default]
    U16,
    /// 32-bit indices. Every part is drawn in one call.
    U32,
}

/// Configuration for the terrain renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Maximum chunk rebuilds started per frame.
    pub max_rebuilds_per_frame: usize,
    /// Background mesh worker threads. 0 builds meshes on the render thread.
    pub mesh_workers: usize,
    /// Camera movement (in blocks) that triggers a re-sort of chunks.
    pub resort_distance: f32,
    /// Chunks whose sort distance is computed per frame while re-sorting.
    pub sort_chunks_per_frame: usize,
    /// Largest texture dimension the atlas may use.
    pub max_texture_dimension: u32,
    /// Index width of the shared quad index buffer.
    pub index_format: IndexFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_rebuilds_per_frame: 4,
            mesh_workers: 0,
            resort_distance: 1.0,
            sort_chunks_per_frame: 16_384,
            max_texture_dimension: 4096,
            index_format: IndexFormat::U16,
        }
    }
}

impl RendererConfig {
    /// Parses and validates a configuration from TOML source.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] if parsing or validation fails.
    pub fn from_toml_str(source: &str) -> RenderResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| RenderError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] if the file cannot be read,
    /// parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| RenderError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> RenderResult<()> {
        if self.max_rebuilds_per_frame == 0 {
            return Err(RenderError::InvalidConfig(
                "max_rebuilds_per_frame must be at least 1".to_owned(),
            ));
        }
        if self.sort_chunks_per_frame == 0 {
            return Err(RenderError::InvalidConfig(
                "sort_chunks_per_frame must be at least 1".to_owned(),
            ));
        }
        if !self.resort_distance.is_finite() || self.resort_distance < 0.0 {
            return Err(RenderError::InvalidConfig(
                "resort_distance must be a non-negative number".to_owned(),
            ));
        }
        if self.max_texture_dimension < 16 {
            return Err(RenderError::InvalidConfig(
                "max_texture_dimension must be at least 16".to_owned(),
            ));
        }
        Ok(())
    }
}
