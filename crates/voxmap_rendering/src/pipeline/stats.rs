//! Rendering statistics.

use crate::backend::IndexedDraw;

/// Statistics from a render frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Number of draw calls.
    pub draw_calls: u32,
    /// Number of indices submitted.
    pub indices_drawn: u64,
    /// Chunks with geometry inside the frustum.
    pub chunks_drawn: u32,
    /// Chunks with geometry outside the frustum.
    pub chunks_culled: u32,
    /// Chunks rebuilt this frame.
    pub rebuilds: u32,
    /// Chunk parts released this frame.
    pub releases: u32,
    /// Chunks still waiting for their first build.
    pub pending_chunks: u32,
    /// Chunks whose upload failed this frame.
    pub failures: u32,
}

impl RenderStats {
    /// Accounts one draw call.
    #[inline]
    pub fn record_draw(&mut self, draw: &IndexedDraw) {
        self.draw_calls += 1;
        self.indices_drawn += u64::from(draw.index_count);
    }

    /// Triangles submitted.
    #[inline]
    #[must_use]
    pub const fn triangles(&self) -> u64 {
        self.indices_drawn / 3
    }

    /// Returns true if draw calls are under `budget`.
    #[inline]
    #[must_use]
    pub const fn draw_calls_ok(&self, budget: u32) -> bool {
        self.draw_calls < budget
    }
}
