//! Index ranges of a chunk part and the draw-call index window.
//!
//! Every part is drawn with one shared quad index buffer holding the
//! pattern `0 1 2 2 3 0` for consecutive quads, so index `i` always refers
//! to vertex `i / 6 * 4 + pattern[i % 6]`. A part only owns vertices; its
//! ranges are offsets into that shared index sequence.

use voxmap_core::Face;

use crate::backend::IndexedDraw;
use crate::config::IndexFormat;

/// Vertices per quad.
pub const QUAD_VERTICES: u32 = 4;

/// Indices per quad.
pub const QUAD_INDICES: u32 = 6;

/// Vertices addressable by a 16-bit index.
pub const MAX_U16_VERTICES: u32 = 1 << 16;

/// Indices covering [`MAX_U16_VERTICES`] vertices of quads.
pub const MAX_U16_INDICES: u32 = MAX_U16_VERTICES / QUAD_VERTICES * QUAD_INDICES;

/// Most quads a single chunk part can hold: six faces per block.
pub const MAX_PART_QUADS: u32 = 16 * 16 * 16 * 6;

/// A contiguous run of indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DrawRange {
    /// First index.
    pub offset: u32,
    /// Number of indices.
    pub count: u32,
}

impl DrawRange {
    /// Creates a range.
    #[inline]
    #[must_use]
    pub const fn new(offset: u32, count: u32) -> Self {
        Self { offset, count }
    }

    /// One past the last index.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.offset + self.count
    }

    /// Returns true if the range holds no indices.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Joins two adjacent ranges.
    #[inline]
    #[must_use]
    pub fn merge(self, next: Self) -> Self {
        debug_assert_eq!(self.end(), next.offset, "merged ranges must be adjacent");
        Self {
            offset: self.offset,
            count: self.count + next.count,
        }
    }
}

/// Per-category index ranges of one chunk part.
///
/// Layout in the buffer: sprites first, then the faces in [`Face::ALL`]
/// order, so the two faces of an axis are always adjacent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PartRanges {
    /// Sprite quads.
    pub sprite: DrawRange,
    /// Face quads, indexed by [`Face::index`].
    pub faces: [DrawRange; 6],
    /// Set when the part does not fit one draw call of the index window.
    pub big: bool,
}

impl PartRanges {
    /// Lays out ranges for the given quad counts.
    #[must_use]
    pub fn from_quad_counts(sprite_quads: u32, face_quads: [u32; 6], window: IndexWindow) -> Self {
        let sprite = DrawRange::new(0, sprite_quads * QUAD_INDICES);
        let mut offset = sprite.end();
        let mut faces = [DrawRange::default(); 6];
        for (range, quads) in faces.iter_mut().zip(face_quads) {
            *range = DrawRange::new(offset, quads * QUAD_INDICES);
            offset = range.end();
        }

        Self {
            sprite,
            faces,
            big: offset > window.max_indices,
        }
    }

    /// Range of one face.
    #[inline]
    #[must_use]
    pub const fn face(&self, face: Face) -> DrawRange {
        self.faces[face.index()]
    }

    /// Total indices.
    #[inline]
    #[must_use]
    pub const fn index_count(&self) -> u32 {
        self.faces[5].end()
    }

    /// Total vertices.
    #[inline]
    #[must_use]
    pub const fn vertex_count(&self) -> u32 {
        self.index_count() / QUAD_INDICES * QUAD_VERTICES
    }

    /// Returns true if the part holds no geometry.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.index_count() == 0
    }

    /// Checks that the ranges start at 0, are contiguous, hold whole quads
    /// and describe exactly `vertex_count` vertices.
    #[must_use]
    pub fn is_consistent(&self, vertex_count: usize) -> bool {
        let mut expected = 0;
        for range in std::iter::once(&self.sprite).chain(&self.faces) {
            if range.offset != expected || range.count % QUAD_INDICES != 0 {
                return false;
            }
            expected = range.end();
        }
        vertex_count == self.vertex_count() as usize
    }
}

/// Largest block of indices one draw call can address.
///
/// With 16-bit indices the shared index buffer covers 65536 vertices; a
/// part beyond that is drawn in slices, each re-based with a base vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
    /// Vertices addressable by one draw.
    pub max_vertices: u32,
    /// Indices in the shared index buffer.
    pub max_indices: u32,
}

impl IndexWindow {
    /// 16-bit indices.
    pub const U16: Self = Self {
        max_vertices: MAX_U16_VERTICES,
        max_indices: MAX_U16_INDICES,
    };

    /// 32-bit indices sized for the largest possible part.
    pub const U32: Self = Self {
        max_vertices: MAX_PART_QUADS * QUAD_VERTICES,
        max_indices: MAX_PART_QUADS * QUAD_INDICES,
    };

    /// Window for an index format.
    #[inline]
    #[must_use]
    pub const fn for_format(format: IndexFormat) -> Self {
        match format {
            IndexFormat::U16 => Self::U16,
            IndexFormat::U32 => Self::U32,
        }
    }

    /// Draw calls covering `range`, splitting it wherever it crosses a
    /// window boundary.
    #[inline]
    #[must_use]
    pub fn draws(self, range: DrawRange) -> WindowedDraws {
        WindowedDraws {
            window: self,
            next: range.offset,
            end: range.end(),
        }
    }

    /// Draw call for a range known to lie inside the first window.
    #[inline]
    #[must_use]
    pub const fn single(range: DrawRange) -> IndexedDraw {
        IndexedDraw {
            index_count: range.count,
            first_index: range.offset,
            base_vertex: 0,
        }
    }
}

/// Iterator returned by [`IndexWindow::draws`].
#[derive(Debug, Clone)]
pub struct WindowedDraws {
    window: IndexWindow,
    next: u32,
    end: u32,
}

impl Iterator for WindowedDraws {
    type Item = IndexedDraw;

    fn next(&mut self) -> Option<IndexedDraw> {
        if self.next >= self.end {
            return None;
        }
        let slice = self.next / self.window.max_indices;
        let slice_start = slice * self.window.max_indices;
        let stop = self.end.min(slice_start + self.window.max_indices);

        let draw = IndexedDraw {
            index_count: stop - self.next,
            first_index: self.next - slice_start,
            base_vertex: slice * self.window.max_vertices,
        };
        self.next = stop;
        Some(draw)
    }
}

/// Builds the shared quad index pattern for `quads` quads.
pub fn quad_indices<T>(quads: u32, mut convert: impl FnMut(u32) -> T) -> Vec<T> {
    let mut out = Vec::with_capacity((quads * QUAD_INDICES) as usize);
    for quad in 0..quads {
        let base = quad * QUAD_VERTICES;
        for offset in [0, 1, 2, 2, 3, 0] {
            out.push(convert(base + offset));
        }
    }
    out
}
