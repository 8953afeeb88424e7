//! Background mesh workers.
//!
//! Workers only ever see a [`ChunkSnapshot`] and the shared mesh tables, so
//! meshing never touches the world or the GPU. Results come back over a
//! channel and are applied on the render thread.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{RenderError, RenderResult};
use crate::mesh::{ChunkMeshBuilder, ChunkMeshData, ChunkSnapshot, IndexWindow, MeshTables};

/// A chunk to mesh.
#[derive(Debug)]
pub struct MeshJob {
    /// Linear chunk index.
    pub index: usize,
    /// Generation the job was requested at.
    pub generation: u64,
    /// Blocks of the chunk and its border.
    pub snapshot: ChunkSnapshot,
}

/// A finished mesh.
#[derive(Debug)]
pub struct MeshResult {
    /// Linear chunk index.
    pub index: usize,
    /// Generation the job was requested at.
    pub generation: u64,
    /// Built mesh.
    pub mesh: ChunkMeshData,
}

/// A pool of mesh threads fed through a job channel.
pub struct MeshWorker {
    jobs: Option<Sender<MeshJob>>,
    results: Receiver<MeshResult>,
    tables: Arc<RwLock<Arc<MeshTables>>>,
    threads: Vec<JoinHandle<()>>,
    in_flight: usize,
}

impl MeshWorker {
    /// Starts `threads` mesh threads.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::WorkerSpawn`] if a thread cannot be started.
    /// Threads already started are shut down.
    pub fn new(threads: usize, tables: Arc<MeshTables>, window: IndexWindow) -> RenderResult<Self> {
        let (job_tx, job_rx) = unbounded::<MeshJob>();
        let (result_tx, result_rx) = unbounded();
        let tables = Arc::new(RwLock::new(tables));

        let mut worker = Self {
            jobs: Some(job_tx),
            results: result_rx,
            tables,
            threads: Vec::with_capacity(threads),
            in_flight: 0,
        };

        for id in 0..threads.max(1) {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let shared = Arc::clone(&worker.tables);

            let handle = std::thread::Builder::new()
                .name(format!("mesh-worker-{id}"))
                .spawn(move || run(&jobs, &results, &shared, window))
                .map_err(|err| RenderError::WorkerSpawn(err.to_string()))?;
            worker.threads.push(handle);
        }

        debug!(threads = worker.threads.len(), "Mesh workers started");
        Ok(worker)
    }

    /// Replaces the tables used by jobs picked up from now on.
    pub fn set_tables(&self, tables: Arc<MeshTables>) {
        *self.tables.write() = tables;
    }

    /// Number of threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Jobs submitted whose result was not collected yet.
    #[inline]
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Queues a job.
    ///
    /// # Errors
    ///
    /// Hands the job back if the workers are gone.
    pub fn submit(&mut self, job: MeshJob) -> Result<(), MeshJob> {
        let Some(jobs) = &self.jobs else {
            return Err(job);
        };
        jobs.send(job).map_err(|err| err.into_inner())?;
        self.in_flight += 1;
        Ok(())
    }

    /// Collects every finished result without blocking.
    pub fn try_results(&mut self) -> Vec<MeshResult> {
        let results: Vec<_> = self.results.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(results.len());
        results
    }

    /// Waits for one result.
    ///
    /// Returns `None` if nothing is in flight or the workers are gone.
    pub fn wait_result(&mut self) -> Option<MeshResult> {
        if self.in_flight == 0 {
            return None;
        }
        let result = self.results.recv().ok()?;
        self.in_flight -= 1;
        Some(result)
    }
}

impl Drop for MeshWorker {
    fn drop(&mut self) {
        // Closing the job channel ends every worker loop
        self.jobs = None;
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for MeshWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshWorker")
            .field("threads", &self.threads.len())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

fn run(
    jobs: &Receiver<MeshJob>,
    results: &Sender<MeshResult>,
    shared: &RwLock<Arc<MeshTables>>,
    window: IndexWindow,
) {
    let mut builder = ChunkMeshBuilder::new(Arc::clone(&*shared.read()), window);

    for job in jobs {
        let tables = Arc::clone(&*shared.read());
        if !Arc::ptr_eq(&tables, builder.tables()) {
            builder = ChunkMeshBuilder::new(tables, window);
        }

        let mesh = builder.build(&job.snapshot);
        trace!(index = job.index, generation = job.generation, "Meshed chunk");
        let result = MeshResult {
            index: job.index,
            generation: job.generation,
            mesh,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}
