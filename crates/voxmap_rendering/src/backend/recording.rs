//! A backend that records commands instead of talking to a GPU.
//!
//! Used by tests and benchmarks to check the exact command stream, and to
//! simulate running out of GPU memory.

use std::collections::HashMap;

use super::{BufferId, GraphicsBackend, IndexData, IndexedDraw, PassState, TextureId};
use crate::error::{RenderError, RenderResult, ResourceKind};
use crate::mesh::TerrainVertex;

/// A draw together with the state it was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    /// Draw arguments.
    pub draw: IndexedDraw,
    /// Pass state at the time of the draw.
    pub state: PassState,
    /// Bound texture.
    pub texture: Option<TextureId>,
    /// Bound vertex buffer.
    pub vertex_buffer: Option<BufferId>,
    /// Bound index buffer.
    pub index_buffer: Option<BufferId>,
}

/// A recorded backend command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Vertex buffer created.
    CreateVertexBuffer {
        /// New handle.
        buffer: BufferId,
        /// Vertex count.
        vertices: usize,
    },
    /// Vertex buffer contents replaced.
    UpdateVertexBuffer {
        /// Target handle.
        buffer: BufferId,
        /// Vertex count.
        vertices: usize,
    },
    /// Index buffer created.
    CreateIndexBuffer {
        /// New handle.
        buffer: BufferId,
        /// Index count.
        indices: usize,
    },
    /// Buffer released.
    DeleteBuffer(BufferId),
    /// Texture created.
    CreateTexture {
        /// New handle.
        texture: TextureId,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Texture released.
    DeleteTexture(TextureId),
    /// Pass state applied.
    SetPassState(PassState),
    /// Texture bound.
    BindTexture(TextureId),
    /// Index buffer bound.
    BindIndexBuffer(BufferId),
    /// Vertex buffer bound.
    BindVertexBuffer(BufferId),
    /// Indexed draw.
    Draw(DrawRecord),
}

/// In-memory [`GraphicsBackend`].
#[derive(Debug)]
pub struct RecordingBackend {
    commands: Vec<Command>,
    state: PassState,
    next_handle: u32,
    buffers: HashMap<BufferId, usize>,
    textures: HashMap<TextureId, usize>,
    bound_texture: Option<TextureId>,
    bound_vertex_buffer: Option<BufferId>,
    bound_index_buffer: Option<BufferId>,
    memory_budget: Option<usize>,
    used_bytes: usize,
    max_texture_dimension: u32,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    /// Creates a backend with unlimited memory and 4096px textures.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            state: PassState::DEFAULT,
            next_handle: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            bound_texture: None,
            bound_vertex_buffer: None,
            bound_index_buffer: None,
            memory_budget: None,
            used_bytes: 0,
            max_texture_dimension: 4096,
        }
    }

    /// Limits the total bytes of live buffers and textures.
    #[must_use]
    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Sets the largest supported texture dimension.
    #[must_use]
    pub fn with_max_texture_dimension(mut self, dimension: u32) -> Self {
        self.max_texture_dimension = dimension;
        self
    }

    /// Changes the memory limit; `None` removes it.
    pub fn set_memory_budget(&mut self, bytes: Option<usize>) {
        self.memory_budget = bytes;
    }

    /// All commands recorded so far.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns and clears the recorded commands.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Clears the recorded commands. Live resources are kept.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Recorded draws, in issue order.
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> + '_ {
        self.commands.iter().filter_map(|command| match command {
            Command::Draw(record) => Some(record),
            _ => None,
        })
    }

    /// Number of live buffers.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live textures.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Bytes held by live resources.
    #[must_use]
    pub const fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Returns true if the buffer handle is live.
    #[must_use]
    pub fn is_live_buffer(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    fn reserve(&mut self, kind: ResourceKind, bytes: usize) -> RenderResult<()> {
        if let Some(budget) = self.memory_budget {
            if self.used_bytes + bytes > budget {
                return Err(RenderError::GraphicsResourceExhausted { kind, bytes });
            }
        }
        self.used_bytes += bytes;
        Ok(())
    }

    fn next_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_vertex_buffer(&mut self, vertices: &[TerrainVertex]) -> RenderResult<BufferId> {
        let bytes = std::mem::size_of_val(vertices);
        self.reserve(ResourceKind::VertexBuffer, bytes)?;

        let buffer = BufferId(self.next_handle());
        self.buffers.insert(buffer, bytes);
        self.commands.push(Command::CreateVertexBuffer {
            buffer,
            vertices: vertices.len(),
        });
        Ok(buffer)
    }

    fn update_vertex_buffer(&mut self, buffer: BufferId, vertices: &[TerrainVertex]) -> RenderResult<()> {
        let old = *self.buffers.get(&buffer).ok_or(RenderError::UnknownBuffer(buffer.0))?;
        let bytes = std::mem::size_of_val(vertices);
        if bytes > old {
            self.reserve(ResourceKind::VertexBuffer, bytes - old)?;
        } else {
            self.used_bytes -= old - bytes;
        }

        self.buffers.insert(buffer, bytes);
        self.commands.push(Command::UpdateVertexBuffer {
            buffer,
            vertices: vertices.len(),
        });
        Ok(())
    }

    fn create_index_buffer(&mut self, indices: IndexData<'_>) -> RenderResult<BufferId> {
        let bytes = indices.byte_len();
        self.reserve(ResourceKind::IndexBuffer, bytes)?;

        let buffer = BufferId(self.next_handle());
        self.buffers.insert(buffer, bytes);
        self.commands.push(Command::CreateIndexBuffer {
            buffer,
            indices: indices.len(),
        });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(bytes) = self.buffers.remove(&buffer) {
            self.used_bytes -= bytes;
            self.commands.push(Command::DeleteBuffer(buffer));
        }
        if self.bound_vertex_buffer == Some(buffer) {
            self.bound_vertex_buffer = None;
        }
        if self.bound_index_buffer == Some(buffer) {
            self.bound_index_buffer = None;
        }
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> RenderResult<TextureId> {
        let bytes = rgba.len();
        if width > self.max_texture_dimension || height > self.max_texture_dimension {
            return Err(RenderError::GraphicsResourceExhausted {
                kind: ResourceKind::Texture,
                bytes,
            });
        }
        self.reserve(ResourceKind::Texture, bytes)?;

        let texture = TextureId(self.next_handle());
        self.textures.insert(texture, bytes);
        self.commands.push(Command::CreateTexture {
            texture,
            width,
            height,
        });
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(bytes) = self.textures.remove(&texture) {
            self.used_bytes -= bytes;
            self.commands.push(Command::DeleteTexture(texture));
        }
        if self.bound_texture == Some(texture) {
            self.bound_texture = None;
        }
    }

    fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    fn pass_state(&self) -> PassState {
        self.state
    }

    fn set_pass_state(&mut self, state: PassState) {
        self.state = state;
        self.commands.push(Command::SetPassState(state));
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.bound_texture = Some(texture);
        self.commands.push(Command::BindTexture(texture));
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.bound_index_buffer = Some(buffer);
        self.commands.push(Command::BindIndexBuffer(buffer));
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId) {
        self.bound_vertex_buffer = Some(buffer);
        self.commands.push(Command::BindVertexBuffer(buffer));
    }

    fn draw_indexed(&mut self, draw: IndexedDraw) {
        self.commands.push(Command::Draw(DrawRecord {
            draw,
            state: self.state,
            texture: self.bound_texture,
            vertex_buffer: self.bound_vertex_buffer,
            index_buffer: self.bound_index_buffer,
        }));
    }
}
