//! Graphics backend abstraction.
//!
//! The renderer talks to the GPU only through [`GraphicsBackend`]. Render
//! state is a single [`PassState`] value; passes change it through a
//! [`ScopedState`] guard which puts the previous state back when dropped,
//! so the sky, entity and UI renderers that follow always start from the
//! state they expect.

mod recording;

pub use recording::{Command, DrawRecord, RecordingBackend};

use std::ops::{Deref, DerefMut};

use crate::error::RenderResult;
use crate::mesh::TerrainVertex;

/// Handle to a vertex or index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u32);

/// Handle to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

/// Index data for an index buffer.
#[derive(Debug, Clone, Copy)]
pub enum IndexData<'a> {
    /// 16-bit indices.
    U16(&'a [u16]),
    /// 32-bit indices.
    U32(&'a [u32]),
}

impl IndexData<'_> {
    /// Number of indices.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U16(data) => data.len(),
            Self::U32(data) => data.len(),
        }
    }

    /// Returns true if there are no indices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Self::U16(data) => std::mem::size_of_val(*data),
            Self::U32(data) => std::mem::size_of_val(*data),
        }
    }
}

/// Arguments of one indexed triangle-list draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexedDraw {
    /// Number of indices to draw.
    pub index_count: u32,
    /// First index in the bound index buffer.
    pub first_index: u32,
    /// Value added to every index before fetching a vertex.
    pub base_vertex: u32,
}

/// Fixed-function state for a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct PassState {
    /// Back faces are discarded.
    pub face_culling: bool,
    /// Fragments with low alpha are discarded.
    pub alpha_test: bool,
    /// Fragments are blended with the framebuffer.
    pub alpha_blending: bool,
    /// Fragments are depth tested.
    pub depth_test: bool,
    /// Fragments write depth.
    pub depth_write: bool,
    /// Fragments write colour.
    pub colour_write: bool,
    /// The bound texture is sampled.
    pub texturing: bool,
}

impl PassState {
    /// State every other renderer expects: depth test and writes on,
    /// nothing else.
    pub const DEFAULT: Self = Self {
        face_culling: false,
        alpha_test: false,
        alpha_blending: false,
        depth_test: true,
        depth_write: true,
        colour_write: true,
        texturing: false,
    };

    /// Opaque terrain: textured with alpha test.
    pub const OPAQUE: Self = Self {
        alpha_test: true,
        texturing: true,
        ..Self::DEFAULT
    };

    /// First translucent sub-pass: depth only.
    pub const TRANSLUCENT_DEPTH: Self = Self {
        colour_write: false,
        ..Self::DEFAULT
    };

    /// Second translucent sub-pass: blended colour over the primed depth.
    pub const TRANSLUCENT_COLOUR: Self = Self {
        alpha_blending: true,
        texturing: true,
        depth_write: false,
        ..Self::DEFAULT
    };

    /// Returns a copy with face culling set.
    #[inline]
    #[must_use]
    pub const fn with_face_culling(mut self, face_culling: bool) -> Self {
        self.face_culling = face_culling;
        self
    }
}

impl Default for PassState {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Commands the renderer issues to the GPU.
///
/// Every method must be called from the thread owning the graphics context.
pub trait GraphicsBackend {
    /// Creates a vertex buffer holding `vertices`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::GraphicsResourceExhausted`] if the
    /// buffer cannot be allocated.
    fn create_vertex_buffer(&mut self, vertices: &[TerrainVertex]) -> RenderResult<BufferId>;

    /// Replaces the contents of a vertex buffer, growing it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::UnknownBuffer`] for a dead handle and
    /// [`crate::RenderError::GraphicsResourceExhausted`] if growing fails.
    fn update_vertex_buffer(&mut self, buffer: BufferId, vertices: &[TerrainVertex]) -> RenderResult<()>;

    /// Creates an index buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::GraphicsResourceExhausted`] if the
    /// buffer cannot be allocated.
    fn create_index_buffer(&mut self, indices: IndexData<'_>) -> RenderResult<BufferId>;

    /// Releases a buffer. Unknown handles are ignored.
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Creates an RGBA8 texture.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::GraphicsResourceExhausted`] if the
    /// texture cannot be allocated.
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> RenderResult<TextureId>;

    /// Releases a texture. Unknown handles are ignored.
    fn delete_texture(&mut self, texture: TextureId);

    /// Largest supported texture width or height.
    fn max_texture_dimension(&self) -> u32;

    /// Current pass state.
    fn pass_state(&self) -> PassState;

    /// Applies a pass state.
    fn set_pass_state(&mut self, state: PassState);

    /// Binds the texture sampled by following draws.
    fn bind_texture(&mut self, texture: TextureId);

    /// Binds the index buffer used by following draws.
    fn bind_index_buffer(&mut self, buffer: BufferId);

    /// Binds the vertex buffer used by following draws.
    fn bind_vertex_buffer(&mut self, buffer: BufferId);

    /// Issues an indexed triangle-list draw.
    fn draw_indexed(&mut self, draw: IndexedDraw);
}

/// Applies a pass state for the lifetime of the guard.
///
/// The guard dereferences to the backend, so a pass issues its commands
/// through it. Dropping the guard restores the state that was active when
/// it was pushed, even if the pass changed it in between.
pub struct ScopedState<'a, B: GraphicsBackend + ?Sized> {
    backend: &'a mut B,
    previous: PassState,
}

impl<'a, B: GraphicsBackend + ?Sized> ScopedState<'a, B> {
    /// Saves the current state and applies `state`.
    pub fn push(backend: &'a mut B, state: PassState) -> Self {
        let previous = backend.pass_state();
        if previous != state {
            backend.set_pass_state(state);
        }
        Self { backend, previous }
    }

    /// Changes face culling, leaving the rest of the state untouched.
    pub fn set_face_culling(&mut self, face_culling: bool) {
        let current = self.backend.pass_state();
        if current.face_culling != face_culling {
            self.backend.set_pass_state(current.with_face_culling(face_culling));
        }
    }
}

impl<B: GraphicsBackend + ?Sized> Deref for ScopedState<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.backend
    }
}

impl<B: GraphicsBackend + ?Sized> DerefMut for ScopedState<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: GraphicsBackend + ?Sized> Drop for ScopedState<'_, B> {
    fn drop(&mut self) {
        if self.backend.pass_state() != self.previous {
            self.backend.set_pass_state(self.previous);
        }
    }
}
