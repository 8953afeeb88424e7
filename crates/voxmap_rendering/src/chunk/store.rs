//! Every chunk of the map, with their uploaded parts.

use tracing::trace;

use super::coord::{ChunkCoord, CHUNK_SIZE};
use super::info::{ChunkInfo, ChunkPart};
use crate::backend::GraphicsBackend;
use crate::error::RenderResult;
use crate::mesh::{ChunkMeshData, MeshPass, PartMesh};

const PASSES: [MeshPass; 2] = [MeshPass::Normal, MeshPass::Translucent];

/// What [`ChunkStore::apply_mesh`] did with the parts of a chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Parts whose vertex data was uploaded.
    pub uploaded: u32,
    /// Parts left untouched because their data did not change.
    pub reused: u32,
    /// Parts released because they became empty.
    pub released: u32,
}

/// The chunk grid of a map.
///
/// Chunks are addressed by a linear index in Y-Z-X order; that index is
/// also the stable tie-break when sorting chunks by distance.
#[derive(Debug, Default)]
pub struct ChunkStore {
    dims: [usize; 3],
    chunks: Vec<ChunkInfo>,
    layer_count: usize,
    normal_used: Vec<u32>,
    translucent_used: Vec<u32>,
}

impl ChunkStore {
    /// Creates the chunk grid covering a world of `world_dims` blocks.
    /// Every chunk starts pending.
    #[must_use]
    pub fn new(world_dims: [usize; 3], layer_count: usize) -> Self {
        let size = CHUNK_SIZE as usize;
        let dims = world_dims.map(|extent| extent.div_ceil(size));

        let mut chunks = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
        for y in 0..dims[1] {
            for z in 0..dims[2] {
                for x in 0..dims[0] {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let coord = ChunkCoord::new(x as i32, y as i32, z as i32);
                    chunks.push(ChunkInfo::new(coord, layer_count));
                }
            }
        }

        Self {
            dims,
            chunks,
            layer_count,
            normal_used: vec![0; layer_count],
            translucent_used: vec![0; layer_count],
        }
    }

    /// Chunks along X, Y and Z.
    #[inline]
    #[must_use]
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Number of chunks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if there are no chunks (no map loaded).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Atlas layers per pass.
    #[inline]
    #[must_use]
    pub const fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Linear index of a chunk, or `None` outside the map.
    #[must_use]
    pub fn index_of(&self, coord: ChunkCoord) -> Option<usize> {
        let [cx, cy, cz] = self.dims;
        let x = usize::try_from(coord.x).ok().filter(|&x| x < cx)?;
        let y = usize::try_from(coord.y).ok().filter(|&y| y < cy)?;
        let z = usize::try_from(coord.z).ok().filter(|&z| z < cz)?;
        Some((y * cz + z) * cx + x)
    }

    /// Chunk at a linear index.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ChunkInfo> {
        self.chunks.get(index)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut ChunkInfo> {
        self.chunks.get_mut(index)
    }

    /// Every chunk in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChunkInfo> {
        self.chunks.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, ChunkInfo> {
        self.chunks.iter_mut()
    }

    /// Chunks holding a part of `pass` in `layer`.
    #[inline]
    #[must_use]
    pub fn used(&self, pass: MeshPass, layer: usize) -> u32 {
        let counts = match pass {
            MeshPass::Normal => &self.normal_used,
            MeshPass::Translucent => &self.translucent_used,
        };
        counts.get(layer).copied().unwrap_or(0)
    }

    /// Chunks not yet built.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.pending).count()
    }

    /// Total vertex-buffer parts alive.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.normal_used.iter().chain(&self.translucent_used).map(|&n| n as usize).sum()
    }

    /// Replaces the parts of a chunk with a freshly built mesh.
    ///
    /// Parts whose vertex data is unchanged keep their buffer untouched;
    /// changed parts are rewritten in place; emptied parts are released.
    ///
    /// # Errors
    ///
    /// Returns the backend error if a buffer cannot be created or grown.
    /// The chunk is left without any part so it is skipped when drawing.
    pub fn apply_mesh<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        index: usize,
        mesh: &ChunkMeshData,
    ) -> RenderResult<ApplyOutcome> {
        let Some(chunk) = self.chunks.get_mut(index) else {
            return Ok(ApplyOutcome::default());
        };
        chunk.pending = false;

        let mut outcome = ApplyOutcome::default();
        let mut failure = None;
        'passes: for pass in PASSES {
            let counts = match pass {
                MeshPass::Normal => &mut self.normal_used,
                MeshPass::Translucent => &mut self.translucent_used,
            };
            for (layer, slot) in chunk.parts_mut(pass).iter_mut().enumerate() {
                let built = mesh.part(pass, layer).filter(|part| is_well_formed(part));
                if let Err(err) = apply_part(backend, slot, &mut counts[layer], built, &mut outcome) {
                    failure = Some(err);
                    break 'passes;
                }
            }
        }
        if let Some(err) = failure {
            self.release_chunk(backend, index);
            return Err(err);
        }

        trace!(
            chunk = ?mesh.coord,
            uploaded = outcome.uploaded,
            reused = outcome.reused,
            released = outcome.released,
            "Applied chunk mesh"
        );
        Ok(outcome)
    }

    /// Releases every part of a chunk. Returns the number of parts released.
    pub fn release_chunk<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B, index: usize) -> u32 {
        let Some(chunk) = self.chunks.get_mut(index) else {
            return 0;
        };

        let mut released = 0;
        for pass in PASSES {
            let counts = match pass {
                MeshPass::Normal => &mut self.normal_used,
                MeshPass::Translucent => &mut self.translucent_used,
            };
            for (layer, slot) in chunk.parts_mut(pass).iter_mut().enumerate() {
                if let Some(part) = slot.take() {
                    backend.delete_buffer(part.buffer);
                    counts[layer] -= 1;
                    released += 1;
                }
            }
        }

        if released > 0 {
            trace!(chunk = ?chunk.coord, released, "Released chunk parts");
        }
        released
    }

    /// Releases every part of every chunk.
    pub fn release_all<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        for index in 0..self.chunks.len() {
            self.release_chunk(backend, index);
        }
    }

    /// Releases everything, resizes the part slots to `layer_count` and
    /// marks every chunk pending again.
    pub fn reset<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B, layer_count: usize) {
        self.release_all(backend);
        self.layer_count = layer_count;
        self.normal_used = vec![0; layer_count];
        self.translucent_used = vec![0; layer_count];
        for chunk in &mut self.chunks {
            chunk.normal_parts = vec![None; layer_count];
            chunk.translucent_parts = vec![None; layer_count];
            chunk.pending = true;
            chunk.queued = false;
            chunk.exhaustion_logged = false;
            chunk.generation = 0;
            chunk.in_flight = None;
        }
    }
}

/// Checks a built part before upload.
///
/// Ranges that disagree with the vertex data are a builder bug: debug
/// builds stop here, release builds drop the part.
fn is_well_formed(part: &PartMesh) -> bool {
    let consistent = part.ranges.is_consistent(part.vertices.len());
    debug_assert!(consistent, "chunk part ranges do not match its vertex data");
    consistent && !part.ranges.is_empty()
}

fn apply_part<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    slot: &mut Option<ChunkPart>,
    used: &mut u32,
    built: Option<&PartMesh>,
    outcome: &mut ApplyOutcome,
) -> RenderResult<()> {
    match (slot.as_mut(), built) {
        (None, None) => {}
        (Some(part), None) => {
            backend.delete_buffer(part.buffer);
            *slot = None;
            *used -= 1;
            outcome.released += 1;
        }
        (Some(part), Some(mesh)) => {
            let hash = mesh.content_hash();
            if part.content_hash == hash && part.ranges == mesh.ranges {
                outcome.reused += 1;
            } else {
                backend.update_vertex_buffer(part.buffer, &mesh.vertices)?;
                part.ranges = mesh.ranges;
                part.content_hash = hash;
                outcome.uploaded += 1;
            }
        }
        (None, Some(mesh)) => {
            let buffer = backend.create_vertex_buffer(&mesh.vertices)?;
            *slot = Some(ChunkPart {
                buffer,
                ranges: mesh.ranges,
                content_hash: mesh.content_hash(),
            });
            *used += 1;
            outcome.uploaded += 1;
        }
    }
    Ok(())
}
