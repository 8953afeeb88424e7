//! Batched terrain draws.
//!
//! Draws are grouped by atlas layer so each layer texture is bound once per
//! pass. Inside a layer every chunk part is drawn with the shared quad index
//! buffer: one draw per axis when both faces of that axis can be seen, one
//! per face otherwise.

use tracing::debug;
use voxmap_core::Face;

use crate::atlas::TerrainAtlas1D;
use crate::backend::{BufferId, GraphicsBackend, IndexData, PassState, ScopedState};
use crate::chunk::{ChunkPart, ChunkStore, FaceMask};
use crate::config::IndexFormat;
use crate::error::RenderResult;
use crate::mesh::{quad_indices, DrawRange, IndexWindow, MeshPass, QUAD_INDICES};
use crate::pipeline::RenderStats;

/// Face pairs of each axis, negative face first.
const AXIS_PAIRS: [(Face, Face); 3] = [
    (Face::Left, Face::Right),
    (Face::Front, Face::Back),
    (Face::Bottom, Face::Top),
];

/// Issues the draws of the opaque and translucent terrain passes.
#[derive(Debug)]
pub struct BatchRenderer {
    format: IndexFormat,
    window: IndexWindow,
    index_buffer: Option<BufferId>,
}

impl BatchRenderer {
    /// Creates a renderer for an index format. Call [`Self::init`] before
    /// drawing.
    #[must_use]
    pub const fn new(format: IndexFormat) -> Self {
        Self {
            format,
            window: IndexWindow::for_format(format),
            index_buffer: None,
        }
    }

    /// Index window every part range is drawn through.
    #[inline]
    #[must_use]
    pub const fn window(&self) -> IndexWindow {
        self.window
    }

    /// The shared quad index buffer, once created.
    #[inline]
    #[must_use]
    pub const fn index_buffer(&self) -> Option<BufferId> {
        self.index_buffer
    }

    /// Creates the shared quad index buffer covering one index window.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the buffer cannot be created.
    pub fn init<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> RenderResult<()> {
        if self.index_buffer.is_some() {
            return Ok(());
        }

        let quads = self.window.max_indices / QUAD_INDICES;
        let buffer = match self.format {
            IndexFormat::U16 => {
                #[allow(clippy::cast_possible_truncation)]
                let indices = quad_indices(quads, |index| index as u16);
                backend.create_index_buffer(IndexData::U16(&indices))?
            }
            IndexFormat::U32 => {
                let indices = quad_indices(quads, |index| index);
                backend.create_index_buffer(IndexData::U32(&indices))?
            }
        };

        debug!(format = ?self.format, quads, "Created shared quad index buffer");
        self.index_buffer = Some(buffer);
        Ok(())
    }

    /// Releases the shared index buffer.
    pub fn dispose<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(buffer) = self.index_buffer.take() {
            backend.delete_buffer(buffer);
        }
    }

    /// Draws the normal parts of every visible chunk in `order`.
    pub fn render_normal<B: GraphicsBackend + ?Sized>(
        &self,
        backend: &mut B,
        store: &ChunkStore,
        order: &[usize],
        atlas: &TerrainAtlas1D,
        stats: &mut RenderStats,
    ) {
        let Some(indices) = self.ready() else {
            return;
        };

        let mut pass = ScopedState::push(backend, PassState::OPAQUE);
        pass.bind_index_buffer(indices);

        for layer in 0..store.layer_count() {
            if store.used(MeshPass::Normal, layer) == 0 {
                continue;
            }
            let Some(texture) = atlas.texture(layer) else {
                continue;
            };
            pass.bind_texture(texture);

            for (part, draw) in visible_parts(store, order, MeshPass::Normal, layer) {
                pass.bind_vertex_buffer(part.buffer);

                if !part.ranges.sprite.is_empty() {
                    pass.set_face_culling(true);
                    self.draw_range(&mut *pass, part, part.ranges.sprite, stats);
                }
                for (neg, pos) in AXIS_PAIRS {
                    match (draw.contains(neg), draw.contains(pos)) {
                        (true, true) => {
                            let merged = part.ranges.face(neg).merge(part.ranges.face(pos));
                            if !merged.is_empty() {
                                pass.set_face_culling(true);
                                self.draw_range(&mut *pass, part, merged, stats);
                            }
                        }
                        (true, false) => self.draw_face(&mut pass, part, neg, stats),
                        (false, true) => self.draw_face(&mut pass, part, pos, stats),
                        (false, false) => {}
                    }
                }
            }
        }
    }

    /// Draws the translucent parts of every visible chunk in `order`.
    ///
    /// A depth-only sub-pass first lays down the nearest translucent
    /// surface, then the colour sub-pass blends only that surface. With
    /// `all_faces` set (camera inside a liquid) every face is drawn
    /// regardless of the chunk's face flags.
    pub fn render_translucent<B: GraphicsBackend + ?Sized>(
        &self,
        backend: &mut B,
        store: &ChunkStore,
        order: &[usize],
        atlas: &TerrainAtlas1D,
        all_faces: bool,
        stats: &mut RenderStats,
    ) {
        let Some(indices) = self.ready() else {
            return;
        };
        backend.bind_index_buffer(indices);

        {
            let mut pass = ScopedState::push(&mut *backend, PassState::TRANSLUCENT_DEPTH);
            for layer in 0..store.layer_count() {
                if store.used(MeshPass::Translucent, layer) == 0 {
                    continue;
                }
                self.draw_translucent_layer(&mut pass, store, order, layer, all_faces, stats);
            }
        }

        let mut pass = ScopedState::push(backend, PassState::TRANSLUCENT_COLOUR);
        for layer in 0..store.layer_count() {
            if store.used(MeshPass::Translucent, layer) == 0 {
                continue;
            }
            let Some(texture) = atlas.texture(layer) else {
                continue;
            };
            pass.bind_texture(texture);
            self.draw_translucent_layer(&mut pass, store, order, layer, all_faces, stats);
        }
    }

    fn ready(&self) -> Option<BufferId> {
        if self.index_buffer.is_none() {
            debug!("Terrain draw skipped: shared index buffer not created");
        }
        self.index_buffer
    }

    fn draw_translucent_layer<B: GraphicsBackend + ?Sized>(
        &self,
        pass: &mut ScopedState<'_, B>,
        store: &ChunkStore,
        order: &[usize],
        layer: usize,
        all_faces: bool,
        stats: &mut RenderStats,
    ) {
        for (part, draw) in visible_parts(store, order, MeshPass::Translucent, layer) {
            let draw = if all_faces { FaceMask::ALL } else { draw };
            pass.bind_vertex_buffer(part.buffer);

            self.draw_range(&mut **pass, part, part.ranges.sprite, stats);
            for (neg, pos) in AXIS_PAIRS {
                let range = match (draw.contains(neg), draw.contains(pos)) {
                    (true, true) => part.ranges.face(neg).merge(part.ranges.face(pos)),
                    (true, false) => part.ranges.face(neg),
                    (false, true) => part.ranges.face(pos),
                    (false, false) => continue,
                };
                self.draw_range(&mut **pass, part, range, stats);
            }
        }
    }

    fn draw_face<B: GraphicsBackend + ?Sized>(
        &self,
        pass: &mut ScopedState<'_, B>,
        part: &ChunkPart,
        face: Face,
        stats: &mut RenderStats,
    ) {
        let range = part.ranges.face(face);
        if !range.is_empty() {
            pass.set_face_culling(false);
            self.draw_range(&mut **pass, part, range, stats);
        }
    }

    fn draw_range<B: GraphicsBackend + ?Sized>(
        &self,
        backend: &mut B,
        part: &ChunkPart,
        range: DrawRange,
        stats: &mut RenderStats,
    ) {
        if range.is_empty() {
            return;
        }
        if part.ranges.big {
            for draw in self.window.draws(range) {
                backend.draw_indexed(draw);
                stats.record_draw(&draw);
            }
        } else {
            let draw = IndexWindow::single(range);
            backend.draw_indexed(draw);
            stats.record_draw(&draw);
        }
    }
}

/// Parts of `pass` in `layer` of the visible chunks, in `order`.
fn visible_parts<'a>(
    store: &'a ChunkStore,
    order: &'a [usize],
    pass: MeshPass,
    layer: usize,
) -> impl Iterator<Item = (&'a ChunkPart, FaceMask)> + 'a {
    order.iter().filter_map(move |&index| {
        let chunk = store.get(index).filter(|chunk| chunk.visible)?;
        chunk.part(pass, layer).map(|part| (part, chunk.draw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::TerrainAtlas2D;
    use crate::backend::{Command, IndexedDraw, RecordingBackend};
    use crate::chunk::ChunkCoord;
    use crate::mesh::{ChunkMeshData, PartMesh, PartRanges, TerrainVertex, MAX_U16_INDICES, MAX_U16_VERTICES};

    fn part(sprite: u32, faces: [u32; 6], window: IndexWindow) -> PartMesh {
        let ranges = PartRanges::from_quad_counts(sprite, faces, window);
        PartMesh {
            vertices: vec![TerrainVertex::default(); ranges.vertex_count() as usize],
            ranges,
        }
    }

    struct Scene {
        backend: RecordingBackend,
        store: ChunkStore,
        atlas: TerrainAtlas1D,
        batch: BatchRenderer,
    }

    fn scene(normal: Option<PartMesh>, translucent: Option<PartMesh>) -> Scene {
        let mut backend = RecordingBackend::new();
        let atlas2d = TerrainAtlas2D::solid_tiles(16, 1, |_| [255; 4]);
        let atlas = TerrainAtlas1D::build(&atlas2d, &mut backend).unwrap();
        let mut store = ChunkStore::new([16, 16, 16], atlas.layer_count());
        let mut batch = BatchRenderer::new(IndexFormat::U16);
        batch.init(&mut backend).unwrap();

        let mut mesh = ChunkMeshData::empty(ChunkCoord::default(), store.layer_count());
        mesh.normal[0] = normal;
        mesh.translucent[0] = translucent;
        store.apply_mesh(&mut backend, 0, &mesh).unwrap();
        backend.clear_commands();

        Scene {
            backend,
            store,
            atlas,
            batch,
        }
    }

    fn set_draw(store: &mut ChunkStore, mask: FaceMask) {
        store.get_mut(0).unwrap().draw = mask;
    }

    #[test]
    fn test_index_buffer_covers_window() {
        let mut backend = RecordingBackend::new();
        let mut batch = BatchRenderer::new(IndexFormat::U16);
        batch.init(&mut backend).unwrap();
        batch.init(&mut backend).unwrap();

        assert_eq!(
            backend.commands(),
            &[Command::CreateIndexBuffer {
                buffer: batch.index_buffer().unwrap(),
                indices: MAX_U16_INDICES as usize,
            }]
        );

        batch.dispose(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_all_faces_visible_merges_pairs() {
        let mut s = scene(Some(part(0, [1; 6], IndexWindow::U16)), None);
        let mut stats = RenderStats::default();

        s.batch.render_normal(&mut s.backend, &s.store, &[0], &s.atlas, &mut stats);

        let draws: Vec<_> = s.backend.draws().collect();
        assert_eq!(draws.len(), 3);
        assert!(draws.iter().all(|d| d.state.face_culling && d.draw.index_count == 12));
        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.indices_drawn, 36);
    }

    #[test]
    fn test_single_face_disables_culling() {
        let mut s = scene(Some(part(0, [1; 6], IndexWindow::U16)), None);
        let mask = FaceMask::NONE.with(Face::Right).with(Face::Top);
        set_draw(&mut s.store, mask);
        let mut stats = RenderStats::default();

        s.batch.render_normal(&mut s.backend, &s.store, &[0], &s.atlas, &mut stats);

        let draws: Vec<_> = s.backend.draws().map(|d| (d.draw, d.state.face_culling)).collect();
        assert_eq!(
            draws,
            vec![
                (
                    IndexedDraw {
                        index_count: 6,
                        first_index: 6,
                        base_vertex: 0,
                    },
                    false
                ),
                (
                    IndexedDraw {
                        index_count: 6,
                        first_index: 30,
                        base_vertex: 0,
                    },
                    false
                ),
            ]
        );
    }

    #[test]
    fn test_sprites_drawn_with_culling() {
        let mut s = scene(Some(part(4, [0; 6], IndexWindow::U16)), None);
        let mut stats = RenderStats::default();

        s.batch.render_normal(&mut s.backend, &s.store, &[0], &s.atlas, &mut stats);

        let draws: Vec<_> = s.backend.draws().collect();
        assert_eq!(draws.len(), 1);
        assert!(draws[0].state.face_culling);
        assert_eq!(draws[0].draw.index_count, 24);
    }

    #[test]
    fn test_hidden_chunk_is_skipped() {
        let mut s = scene(Some(part(0, [1; 6], IndexWindow::U16)), None);
        s.store.get_mut(0).unwrap().visible = false;
        let mut stats = RenderStats::default();

        s.batch.render_normal(&mut s.backend, &s.store, &[0], &s.atlas, &mut stats);
        assert_eq!(s.backend.draws().count(), 0);
    }

    #[test]
    fn test_big_part_splits_at_window() {
        // Left holds a full window of quads, Right one more quad
        let quads = MAX_U16_INDICES / QUAD_INDICES;
        let mut s = scene(Some(part(0, [quads, 1, 0, 0, 0, 0], IndexWindow::U16)), None);
        let mut stats = RenderStats::default();

        s.batch.render_normal(&mut s.backend, &s.store, &[0], &s.atlas, &mut stats);

        let draws: Vec<_> = s.backend.draws().map(|d| d.draw).collect();
        assert_eq!(
            draws,
            vec![
                IndexedDraw {
                    index_count: MAX_U16_INDICES,
                    first_index: 0,
                    base_vertex: 0,
                },
                IndexedDraw {
                    index_count: 6,
                    first_index: 0,
                    base_vertex: MAX_U16_VERTICES,
                },
            ]
        );
    }

    #[test]
    fn test_translucent_depth_then_colour() {
        let mut s = scene(None, Some(part(0, [1; 6], IndexWindow::U16)));
        let mut stats = RenderStats::default();

        s.batch.render_translucent(&mut s.backend, &s.store, &[0], &s.atlas, false, &mut stats);

        let draws: Vec<_> = s.backend.draws().collect();
        assert_eq!(draws.len(), 6);
        assert!(draws[..3].iter().all(|d| d.state == PassState::TRANSLUCENT_DEPTH));
        assert!(draws[3..].iter().all(|d| d.state == PassState::TRANSLUCENT_COLOUR));
        assert!(draws.iter().all(|d| !d.state.face_culling));
        assert_eq!(s.backend.pass_state(), PassState::DEFAULT);
    }

    #[test]
    fn test_submerged_camera_draws_all_faces() {
        let mut s = scene(None, Some(part(0, [1; 6], IndexWindow::U16)));
        set_draw(&mut s.store, FaceMask::NONE.with(Face::Top));
        let mut stats = RenderStats::default();

        s.batch.render_translucent(&mut s.backend, &s.store, &[0], &s.atlas, false, &mut stats);
        assert_eq!(stats.indices_drawn, 12);

        let mut stats = RenderStats::default();
        s.batch.render_translucent(&mut s.backend, &s.store, &[0], &s.atlas, true, &mut stats);
        assert_eq!(stats.indices_drawn, 72);
    }

    #[test]
    fn test_state_restored_after_passes() {
        let mut s = scene(Some(part(1, [1; 6], IndexWindow::U16)), Some(part(0, [1; 6], IndexWindow::U16)));
        let mut stats = RenderStats::default();

        s.batch.render_normal(&mut s.backend, &s.store, &[0], &s.atlas, &mut stats);
        assert_eq!(s.backend.pass_state(), PassState::DEFAULT);
        s.batch.render_translucent(&mut s.backend, &s.store, &[0], &s.atlas, false, &mut stats);
        assert_eq!(s.backend.pass_state(), PassState::DEFAULT);
    }
}
