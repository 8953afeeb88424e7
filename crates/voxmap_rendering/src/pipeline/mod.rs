//! Render pipeline orchestration.
//!
//! [`MapRenderer`] ties the terrain subsystems together: block edits feed
//! the update scheduler, the sorter decides visibility and order every
//! frame, and the batch renderer issues the opaque and translucent passes.

mod camera;
mod stats;

pub use camera::{Camera, Projection};
pub use stats::RenderStats;

use std::sync::Arc;

use tracing::debug;
use voxmap_core::{BlockChange, BlockRegistry, CollideType, World};

use crate::atlas::{TerrainAtlas1D, TerrainAtlas2D};
use crate::backend::GraphicsBackend;
use crate::batch::BatchRenderer;
use crate::chunk::ChunkStore;
use crate::config::RendererConfig;
use crate::culling::{ChunkSorter, FrustumCuller};
use crate::error::RenderResult;
use crate::mesh::MeshTables;
use crate::scheduler::{ChunkFailure, SchedulerReport, UpdateScheduler};

/// Terrain renderer for one map.
///
/// Owns the graphics backend; every method must be called on the thread
/// owning the graphics context.
pub struct MapRenderer<B: GraphicsBackend> {
    config: RendererConfig,
    backend: B,
    registry: BlockRegistry,
    atlas: TerrainAtlas1D,
    tables: Arc<MeshTables>,
    store: ChunkStore,
    sorter: ChunkSorter,
    culler: FrustumCuller,
    batch: BatchRenderer,
    scheduler: UpdateScheduler,
    projection: Projection,
    submerged: bool,
    failures: Vec<ChunkFailure>,
    stats: RenderStats,
}

impl<B: GraphicsBackend> MapRenderer<B> {
    /// Creates a renderer with no map loaded.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::InvalidConfig`] for a bad
    /// configuration, or the error of uploading the atlas or the shared
    /// index buffer.
    pub fn new(
        config: RendererConfig,
        mut backend: B,
        registry: BlockRegistry,
        atlas: &TerrainAtlas2D,
    ) -> RenderResult<Self> {
        config.validate()?;

        let mut atlas = TerrainAtlas1D::build_capped(atlas, &mut backend, config.max_texture_dimension)?;
        let mut batch = BatchRenderer::new(config.index_format);
        if let Err(err) = batch.init(&mut backend) {
            atlas.dispose(&mut backend);
            return Err(err);
        }

        let tables = Arc::new(MeshTables::new(&registry, *atlas.layout()));
        let scheduler = match UpdateScheduler::new(&config, Arc::clone(&tables)) {
            Ok(scheduler) => scheduler,
            Err(err) => {
                batch.dispose(&mut backend);
                atlas.dispose(&mut backend);
                return Err(err);
            }
        };

        Ok(Self {
            sorter: ChunkSorter::new(config.resort_distance, config.sort_chunks_per_frame),
            config,
            backend,
            registry,
            atlas,
            tables,
            store: ChunkStore::default(),
            culler: FrustumCuller::new(),
            batch,
            scheduler,
            projection: Projection::default(),
            submerged: false,
            failures: Vec::new(),
            stats: RenderStats::default(),
        })
    }

    /// The graphics backend.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The graphics backend, mutably.
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The configuration in use.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Chunk state of the current map.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// The uploaded atlas.
    #[inline]
    #[must_use]
    pub const fn atlas(&self) -> &TerrainAtlas1D {
        &self.atlas
    }

    /// The chunk sorter.
    #[inline]
    #[must_use]
    pub const fn sorter(&self) -> &ChunkSorter {
        &self.sorter
    }

    /// Statistics of the last frame.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Upload failures of the last update.
    #[inline]
    #[must_use]
    pub fn failures(&self) -> &[ChunkFailure] {
        &self.failures
    }

    /// Returns true if the camera's head block was a liquid at the last
    /// update.
    #[inline]
    #[must_use]
    pub const fn is_submerged(&self) -> bool {
        self.submerged
    }

    /// Sets the projection used for frustum culling.
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    /// Starts rendering a new map. Every chunk is pending until built.
    pub fn on_new_map(&mut self, world: &World) {
        self.store.release_all(&mut self.backend);
        let layers = self.atlas.used_layers(self.registry.max_texture_id());
        self.store = ChunkStore::new(world.dims(), layers);
        self.sorter.reset();
        self.scheduler.clear();
        self.failures.clear();
        debug!(dims = ?world.dims(), chunks = self.store.len(), layers, "New map");
    }

    /// Queues the chunks touched by one block edit.
    pub fn on_block_changed(&mut self, change: &BlockChange) {
        self.scheduler.on_block_changed(&mut self.store, change);
    }

    /// Queues every edit the world recorded since the last call. Returns
    /// the number of edits seen.
    pub fn process_changes(&mut self, world: &World) -> usize {
        let changes = world.take_changes();
        for change in &changes {
            self.scheduler.on_block_changed(&mut self.store, change);
        }
        changes.len()
    }

    /// Per-frame update: visibility, draw order and chunk rebuilds.
    pub fn update(&mut self, world: &World, camera: &Camera) {
        self.stats = RenderStats::default();
        let eye = camera.position;

        self.culler.update(&camera.view_projection(&self.projection));
        ChunkSorter::update_visibility(&mut self.store, eye, &self.culler);
        self.sorter.update_order(&self.store, eye);

        let [hx, hy, hz] = camera.head_block();
        let head = world.block_at(hx, hy, hz);
        self.submerged = self.registry.collide_type(head) == CollideType::Liquid;

        let report = self
            .scheduler
            .run_frame(world, &mut self.store, &mut self.backend, self.sorter.opaque_order());
        self.record(report);
    }

    /// Draws the opaque terrain pass.
    pub fn render_normal(&mut self) {
        self.batch.render_normal(
            &mut self.backend,
            &self.store,
            self.sorter.opaque_order(),
            &self.atlas,
            &mut self.stats,
        );
    }

    /// Draws the translucent terrain pass. Call after every opaque object
    /// is drawn.
    pub fn render_translucent(&mut self) {
        self.batch.render_translucent(
            &mut self.backend,
            &self.store,
            self.sorter.translucent_order(),
            &self.atlas,
            self.submerged,
            &mut self.stats,
        );
    }

    /// Runs a whole frame: edits, update and both passes.
    pub fn render_frame(&mut self, world: &World, camera: &Camera) -> RenderStats {
        self.process_changes(world);
        self.update(world, camera);
        self.render_normal();
        self.render_translucent();
        self.stats
    }

    /// Waits for every rebuild running on mesh workers and uploads the
    /// results.
    pub fn finish_rebuilds(&mut self) {
        let report = self.scheduler.finish(&mut self.store, &mut self.backend);
        self.record(report);
    }

    /// Replaces the terrain atlas and rebuilds every chunk.
    ///
    /// # Errors
    ///
    /// Returns the upload error; the previous atlas stays in use.
    pub fn set_atlas(&mut self, atlas: &TerrainAtlas2D) -> RenderResult<()> {
        let next = TerrainAtlas1D::build_capped(atlas, &mut self.backend, self.config.max_texture_dimension)?;
        self.atlas.dispose(&mut self.backend);
        self.atlas = next;
        self.refresh();
        Ok(())
    }

    /// Replaces the block table and rebuilds every chunk.
    pub fn set_registry(&mut self, registry: BlockRegistry) {
        self.registry = registry;
        self.refresh();
    }

    /// Releases every chunk part and marks every chunk pending, so the map
    /// is rebuilt with the current atlas and block table.
    pub fn refresh(&mut self) {
        self.tables = Arc::new(MeshTables::new(&self.registry, *self.atlas.layout()));
        self.scheduler.set_tables(Arc::clone(&self.tables));
        self.scheduler.clear();

        let layers = self.atlas.used_layers(self.registry.max_texture_id());
        self.store.reset(&mut self.backend, layers);
        self.failures.clear();
        debug!(chunks = self.store.len(), layers, "Refreshed chunk meshes");
    }

    /// Releases every buffer and texture owned by the renderer.
    pub fn dispose(&mut self) {
        self.scheduler.clear();
        self.store.release_all(&mut self.backend);
        self.store = ChunkStore::default();
        self.sorter.reset();
        self.atlas.dispose(&mut self.backend);
        self.batch.dispose(&mut self.backend);
    }

    /// Consumes the renderer, returning the backend. Call
    /// [`Self::dispose`] first to release GPU resources.
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn record(&mut self, report: SchedulerReport) {
        self.stats.rebuilds += report.rebuilt;
        self.stats.releases += report.released;
        self.stats.failures += u32::try_from(report.failures.len()).unwrap_or(u32::MAX);
        self.failures = report.failures;

        let (mut drawn, mut culled, mut pending) = (0, 0, 0);
        for chunk in self.store.iter() {
            pending += u32::from(chunk.is_pending());
            if !chunk.has_parts() {
                continue;
            }
            if chunk.visible {
                drawn += 1;
            } else {
                culled += 1;
            }
        }
        self.stats.chunks_drawn = drawn;
        self.stats.chunks_culled = culled;
        self.stats.pending_chunks = pending;
    }
}

impl<B: GraphicsBackend + std::fmt::Debug> std::fmt::Debug for MapRenderer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapRenderer")
            .field("backend", &self.backend)
            .field("chunks", &self.store.len())
            .field("layers", &self.store.layer_count())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
