//! Incremental chunk rebuilds.
//!
//! Block edits queue the chunks they touch; every frame a bounded number of
//! queued chunks is rebuilt, oldest edit first, then chunks never built yet,
//! nearest first. Meshes are built inline or on [`MeshWorker`] threads and
//! always uploaded on the render thread.

mod worker;

pub use worker::{MeshJob, MeshResult, MeshWorker};

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use voxmap_core::{BlockChange, World, WorldView};

use crate::backend::GraphicsBackend;
use crate::chunk::{ChunkCoord, ChunkStore, CHUNK_SIZE};
use crate::config::RendererConfig;
use crate::error::{RenderError, RenderResult};
use crate::mesh::{ChunkMeshBuilder, ChunkMeshData, ChunkSnapshot, IndexWindow, MeshTables};

/// A chunk whose rebuild could not be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// Upload error.
    pub error: RenderError,
}

/// What one [`UpdateScheduler::run_frame`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Chunks whose new mesh was applied.
    pub rebuilt: u32,
    /// Chunk parts released.
    pub released: u32,
    /// Worker results dropped because a newer rebuild was started.
    pub discarded: u32,
    /// Chunks left without geometry because their upload failed.
    pub failures: Vec<ChunkFailure>,
}

/// Schedules chunk rebuilds within a per-frame budget.
#[derive(Debug)]
pub struct UpdateScheduler {
    queue: VecDeque<usize>,
    builder: ChunkMeshBuilder,
    worker: Option<MeshWorker>,
    max_per_frame: usize,
    next_generation: u64,
}

impl UpdateScheduler {
    /// Creates a scheduler, starting mesh workers if configured.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::WorkerSpawn`] if a worker thread cannot be
    /// started.
    pub fn new(config: &RendererConfig, tables: Arc<MeshTables>) -> RenderResult<Self> {
        let window = IndexWindow::for_format(config.index_format);
        let worker = if config.mesh_workers > 0 {
            Some(MeshWorker::new(config.mesh_workers, Arc::clone(&tables), window)?)
        } else {
            None
        };

        Ok(Self {
            queue: VecDeque::new(),
            builder: ChunkMeshBuilder::new(tables, window),
            worker,
            max_per_frame: config.max_rebuilds_per_frame.max(1),
            next_generation: 1,
        })
    }

    /// Switches to new mesh tables. Callers must also reset the store so
    /// every chunk is rebuilt with them.
    pub fn set_tables(&mut self, tables: Arc<MeshTables>) {
        if let Some(worker) = &self.worker {
            worker.set_tables(Arc::clone(&tables));
        }
        self.builder = ChunkMeshBuilder::new(tables, self.builder.window());
    }

    /// Drops every queued rebuild. Results of rebuilds already running are
    /// discarded when they arrive.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Chunks waiting in the edit queue.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Rebuilds running on mesh workers.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.worker.as_ref().map_or(0, MeshWorker::in_flight)
    }

    /// Queues the chunks affected by a block edit: the owning chunk, plus
    /// each neighbour the edited block touches. Returns the number of
    /// chunks newly queued.
    pub fn on_block_changed(&mut self, store: &mut ChunkStore, change: &BlockChange) -> usize {
        let coord = ChunkCoord::from_block(change.x, change.y, change.z);
        let local = [change.x, change.y, change.z].map(|v| v & (CHUNK_SIZE - 1));

        let mut queued = usize::from(self.enqueue(store, coord));
        for (axis, &value) in local.iter().enumerate() {
            let step = if value == 0 {
                -1
            } else if value == CHUNK_SIZE - 1 {
                1
            } else {
                continue;
            };
            let mut delta = [0; 3];
            delta[axis] = step;
            queued += usize::from(self.enqueue(store, coord.offset(delta[0], delta[1], delta[2])));
        }

        trace!(x = change.x, y = change.y, z = change.z, queued, "Block changed");
        queued
    }

    /// Queues one chunk. Returns false if it is outside the map or already
    /// queued.
    pub fn enqueue(&mut self, store: &mut ChunkStore, coord: ChunkCoord) -> bool {
        let Some(index) = store.index_of(coord) else {
            return false;
        };
        let Some(chunk) = store.get_mut(index) else {
            return false;
        };
        if chunk.queued {
            return false;
        }
        chunk.queued = true;
        self.queue.push_back(index);
        true
    }

    /// Applies finished worker results, then starts up to the frame budget
    /// of rebuilds: queued edits first, then pending chunks in `order`
    /// (chunk indices, nearest first).
    pub fn run_frame<B: GraphicsBackend + ?Sized>(
        &mut self,
        world: &World,
        store: &mut ChunkStore,
        backend: &mut B,
        order: &[usize],
    ) -> SchedulerReport {
        let mut report = SchedulerReport::default();

        if let Some(worker) = &mut self.worker {
            for result in worker.try_results() {
                apply_result(store, backend, result, &mut report);
            }
        }

        let view = world.read();
        let mut started = 0;
        while started < self.max_per_frame {
            let Some(index) = self.queue.pop_front() else {
                break;
            };
            if let Some(chunk) = store.get_mut(index) {
                chunk.queued = false;
                self.start(&view, store, backend, index, &mut report);
                started += 1;
            }
        }

        for &index in order {
            if started >= self.max_per_frame {
                break;
            }
            let Some(chunk) = store.get(index) else {
                continue;
            };
            if chunk.pending && !chunk.queued && chunk.in_flight.is_none() {
                self.start(&view, store, backend, index, &mut report);
                started += 1;
            }
        }

        if started > 0 {
            debug!(
                started,
                rebuilt = report.rebuilt,
                queued = self.queue.len(),
                in_flight = self.in_flight(),
                "Chunk rebuilds"
            );
        }
        report
    }

    /// Waits for every rebuild running on workers and applies the results.
    pub fn finish<B: GraphicsBackend + ?Sized>(&mut self, store: &mut ChunkStore, backend: &mut B) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        if let Some(worker) = &mut self.worker {
            while let Some(result) = worker.wait_result() {
                apply_result(store, backend, result, &mut report);
            }
        }
        report
    }

    fn start<B: GraphicsBackend + ?Sized>(
        &mut self,
        view: &WorldView<'_>,
        store: &mut ChunkStore,
        backend: &mut B,
        index: usize,
        report: &mut SchedulerReport,
    ) {
        let generation = self.next_generation;
        self.next_generation += 1;
        let Some(chunk) = store.get_mut(index) else {
            return;
        };
        chunk.generation = generation;
        chunk.in_flight = None;
        let coord = chunk.coord;

        let snapshot = ChunkSnapshot::capture(view, coord);
        if snapshot.is_all_air() {
            let empty = ChunkMeshData::empty(coord, store.layer_count());
            apply_mesh(store, backend, index, &empty, report);
            return;
        }

        let snapshot = match &mut self.worker {
            Some(worker) => {
                let job = MeshJob {
                    index,
                    generation,
                    snapshot,
                };
                match worker.submit(job) {
                    Ok(()) => {
                        chunk.in_flight = Some(generation);
                        return;
                    }
                    Err(job) => {
                        warn!("Mesh workers stopped, building on the render thread");
                        self.worker = None;
                        job.snapshot
                    }
                }
            }
            None => snapshot,
        };

        let mesh = self.builder.build(&snapshot);
        apply_mesh(store, backend, index, &mesh, report);
    }
}

fn apply_result<B: GraphicsBackend + ?Sized>(
    store: &mut ChunkStore,
    backend: &mut B,
    result: MeshResult,
    report: &mut SchedulerReport,
) {
    let current = store
        .get_mut(result.index)
        .filter(|chunk| chunk.generation == result.generation && chunk.in_flight == Some(result.generation));
    let Some(chunk) = current else {
        trace!(index = result.index, generation = result.generation, "Discarded stale mesh");
        report.discarded += 1;
        return;
    };
    chunk.in_flight = None;
    apply_mesh(store, backend, result.index, &result.mesh, report);
}

fn apply_mesh<B: GraphicsBackend + ?Sized>(
    store: &mut ChunkStore,
    backend: &mut B,
    index: usize,
    mesh: &ChunkMeshData,
    report: &mut SchedulerReport,
) {
    match store.apply_mesh(backend, index, mesh) {
        Ok(outcome) => {
            report.rebuilt += 1;
            report.released += outcome.released;
            if let Some(chunk) = store.get_mut(index) {
                chunk.exhaustion_logged = false;
            }
        }
        Err(error) => {
            if let Some(chunk) = store.get_mut(index) {
                if !chunk.exhaustion_logged {
                    warn!(chunk = ?chunk.coord, %error, "Chunk upload failed, chunk will not be drawn");
                    chunk.exhaustion_logged = true;
                }
            }
            report.failures.push(ChunkFailure {
                coord: mesh.coord,
                error,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::AtlasLayout;
    use crate::backend::RecordingBackend;
    use crate::mesh::MeshPass;
    use voxmap_core::{BlockId, BlockRegistry};

    fn tables() -> Arc<MeshTables> {
        let layout = AtlasLayout::compute(16, 256, 4096).unwrap();
        Arc::new(MeshTables::new(&BlockRegistry::classic(), layout))
    }

    fn config(max_rebuilds_per_frame: usize, mesh_workers: usize) -> RendererConfig {
        RendererConfig {
            max_rebuilds_per_frame,
            mesh_workers,
            ..RendererConfig::default()
        }
    }

    fn change(x: i32, y: i32, z: i32) -> BlockChange {
        BlockChange {
            x,
            y,
            z,
            old: BlockId::AIR,
            new: BlockId::STONE,
        }
    }

    #[test]
    fn test_interior_edit_queues_one_chunk() {
        let mut store = ChunkStore::new([48, 48, 48], 1);
        let mut scheduler = UpdateScheduler::new(&config(4, 0), tables()).unwrap();

        assert_eq!(scheduler.on_block_changed(&mut store, &change(20, 20, 20)), 1);
        assert_eq!(scheduler.queued(), 1);
    }

    #[test]
    fn test_boundary_edit_queues_neighbours() {
        let mut store = ChunkStore::new([48, 48, 48], 1);
        let mut scheduler = UpdateScheduler::new(&config(4, 0), tables()).unwrap();

        // Local (0, 15, 7) of chunk (1, 1, 1): -X and +Y neighbours too
        assert_eq!(scheduler.on_block_changed(&mut store, &change(16, 31, 23)), 3);
        // A corner on the map edge has no neighbour outside
        assert_eq!(scheduler.on_block_changed(&mut store, &change(0, 0, 0)), 1);
    }

    #[test]
    fn test_repeated_edits_coalesce() {
        let mut store = ChunkStore::new([32, 16, 16], 1);
        let mut scheduler = UpdateScheduler::new(&config(4, 0), tables()).unwrap();

        scheduler.on_block_changed(&mut store, &change(5, 5, 5));
        scheduler.on_block_changed(&mut store, &change(6, 5, 5));
        assert_eq!(scheduler.queued(), 1);
    }

    #[test]
    fn test_budget_limits_rebuilds() {
        let world = World::generate(64, 16, 16, |_, y, _| if y == 0 { BlockId::STONE } else { BlockId::AIR }).unwrap();
        let mut store = ChunkStore::new(world.dims(), 1);
        let mut backend = RecordingBackend::new();
        let mut scheduler = UpdateScheduler::new(&config(3, 0), tables()).unwrap();
        let order: Vec<_> = (0..store.len()).collect();

        let report = scheduler.run_frame(&world, &mut store, &mut backend, &order);
        assert_eq!(report.rebuilt, 3);
        assert_eq!(store.pending_count(), 1);

        let report = scheduler.run_frame(&world, &mut store, &mut backend, &order);
        assert_eq!(report.rebuilt, 1);
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.used(MeshPass::Normal, 0), 4);
    }

    #[test]
    fn test_edits_before_pending_chunks() {
        let world = World::generate(32, 16, 16, |_, _, _| BlockId::STONE).unwrap();
        let mut store = ChunkStore::new(world.dims(), 1);
        let mut backend = RecordingBackend::new();
        let mut scheduler = UpdateScheduler::new(&config(1, 0), tables()).unwrap();

        scheduler.on_block_changed(&mut store, &change(20, 5, 5));
        let report = scheduler.run_frame(&world, &mut store, &mut backend, &[0, 1]);

        assert_eq!(report.rebuilt, 1);
        assert!(store.get(0).unwrap().is_pending());
        assert!(!store.get(1).unwrap().is_pending());
    }

    #[test]
    fn test_all_air_chunk_releases_parts() {
        let world = World::generate(16, 16, 16, |x, y, z| {
            if (x, y, z) == (3, 3, 3) {
                BlockId::STONE
            } else {
                BlockId::AIR
            }
        })
        .unwrap();
        let mut store = ChunkStore::new(world.dims(), 1);
        let mut backend = RecordingBackend::new();
        let mut scheduler = UpdateScheduler::new(&config(4, 0), tables()).unwrap();

        scheduler.run_frame(&world, &mut store, &mut backend, &[0]);
        assert_eq!(backend.live_buffers(), 1);

        let edit = world.set_block(3, 3, 3, BlockId::AIR).unwrap().unwrap();
        scheduler.on_block_changed(&mut store, &edit);
        let report = scheduler.run_frame(&world, &mut store, &mut backend, &[0]);

        assert_eq!(report.released, 1);
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_exhaustion_reported() {
        let world = World::generate(16, 16, 16, |_, y, _| if y < 8 { BlockId::STONE } else { BlockId::AIR }).unwrap();
        let mut store = ChunkStore::new(world.dims(), 1);
        let mut backend = RecordingBackend::new().with_memory_budget(64);
        let mut scheduler = UpdateScheduler::new(&config(4, 0), tables()).unwrap();

        let report = scheduler.run_frame(&world, &mut store, &mut backend, &[0]);

        assert_eq!(report.rebuilt, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].coord, ChunkCoord::new(0, 0, 0));
        assert!(matches!(
            report.failures[0].error,
            RenderError::GraphicsResourceExhausted { .. }
        ));
        assert!(!store.get(0).unwrap().has_parts());
        assert!(!store.get(0).unwrap().is_pending());
    }

    #[test]
    fn test_worker_rebuilds_match_inline() {
        let world = World::generate(32, 16, 16, |x, y, z| {
            if (x + y + z) % 3 == 0 {
                BlockId::STONE
            } else {
                BlockId::AIR
            }
        })
        .unwrap();
        let order = [0, 1];

        let mut inline_store = ChunkStore::new(world.dims(), 1);
        let mut inline_backend = RecordingBackend::new();
        let mut inline = UpdateScheduler::new(&config(4, 0), tables()).unwrap();
        inline.run_frame(&world, &mut inline_store, &mut inline_backend, &order);

        let mut store = ChunkStore::new(world.dims(), 1);
        let mut backend = RecordingBackend::new();
        let mut threaded = UpdateScheduler::new(&config(4, 2), tables()).unwrap();
        let report = threaded.run_frame(&world, &mut store, &mut backend, &order);
        assert_eq!(report.rebuilt, 0);
        assert_eq!(threaded.in_flight(), 2);

        let report = threaded.finish(&mut store, &mut backend);
        assert_eq!(report.rebuilt, 2);
        for index in order {
            let expected = inline_store.get(index).unwrap().part(MeshPass::Normal, 0).map(|p| p.content_hash);
            let actual = store.get(index).unwrap().part(MeshPass::Normal, 0).map(|p| p.content_hash);
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_superseded_result_is_discarded() {
        let world = World::generate(16, 16, 16, |_, y, _| if y == 0 { BlockId::STONE } else { BlockId::AIR }).unwrap();
        let mut store = ChunkStore::new(world.dims(), 1);
        let mut backend = RecordingBackend::new();
        let mut scheduler = UpdateScheduler::new(&config(4, 0), tables()).unwrap();
        scheduler.run_frame(&world, &mut store, &mut backend, &[0]);
        let before = store.get(0).unwrap().part(MeshPass::Normal, 0).copied();

        let generation = store.get(0).unwrap().generation();
        store.get_mut(0).unwrap().in_flight = Some(generation + 1);
        let stale = MeshResult {
            index: 0,
            generation,
            mesh: ChunkMeshData::empty(ChunkCoord::default(), 1),
        };
        let mut report = SchedulerReport::default();
        apply_result(&mut store, &mut backend, stale, &mut report);

        assert_eq!(report.discarded, 1);
        assert_eq!(report.rebuilt, 0);
        assert_eq!(store.get(0).unwrap().part(MeshPass::Normal, 0).copied(), before);
    }
}
