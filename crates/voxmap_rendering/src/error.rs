//! # Render Error Types
//!
//! All errors that can occur in the terrain renderer.

use thiserror::Error;

/// GPU resource kinds, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Vertex buffer.
    VertexBuffer,
    /// Index buffer.
    IndexBuffer,
    /// Texture.
    Texture,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::VertexBuffer => "vertex buffer",
            Self::IndexBuffer => "index buffer",
            Self::Texture => "texture",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in the renderer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The graphics backend could not allocate a resource.
    #[error("graphics resources exhausted: could not create {kind} of {bytes} bytes")]
    GraphicsResourceExhausted {
        /// What was being created.
        kind: ResourceKind,
        /// Requested size in bytes.
        bytes: usize,
    },

    /// A buffer handle was not known to the backend.
    #[error("unknown buffer handle {0}")]
    UnknownBuffer(u32),

    /// The terrain atlas cannot be split into layers.
    #[error("invalid atlas layout: {0}")]
    AtlasLayout(String),

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A mesh worker thread could not be started.
    #[error("failed to spawn mesh worker: {0}")]
    WorkerSpawn(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
