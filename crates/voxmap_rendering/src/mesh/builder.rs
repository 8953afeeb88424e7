//! Chunk mesh builder.
//!
//! Turns a [`ChunkSnapshot`] into per-layer vertex data. Within a part the
//! quads are grouped by category (sprites, then each face direction) so
//! the batch renderer can draw any face direction, or both faces of an
//! axis, with a single contiguous index range.
//!
//! Building is a pure function of the snapshot: the same blocks always give
//! the same vertices in the same order.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::Arc;

use voxmap_core::Face;

use super::ranges::{IndexWindow, PartRanges, QUAD_VERTICES};
use super::snapshot::ChunkSnapshot;
use super::tables::{BlockShape, FaceTexture, MeshPass, MeshTables};
use super::vertex::{face_colour, TerrainVertex, WHITE};
use crate::atlas::UvRect;
use crate::chunk::{ChunkCoord, CHUNK_SIZE};

/// Quad categories in buffer order: sprites, then [`Face::ALL`].
const CATEGORIES: usize = 7;

/// Category slot of sprite quads.
const SPRITE_SLOT: usize = 0;

/// Corners of each face, CCW seen from outside. `true` picks the box max.
const FACE_CORNERS: [[[bool; 3]; 4]; 6] = [
    // Left (-X)
    [[false, false, false], [false, false, true], [false, true, true], [false, true, false]],
    // Right (+X)
    [[true, false, false], [true, true, false], [true, true, true], [true, false, true]],
    // Front (-Z)
    [[false, false, false], [false, true, false], [true, true, false], [true, false, false]],
    // Back (+Z)
    [[false, false, true], [true, false, true], [true, true, true], [false, true, true]],
    // Bottom (-Y)
    [[false, false, false], [true, false, false], [true, false, true], [false, false, true]],
    // Top (+Y)
    [[false, true, false], [false, true, true], [true, true, true], [true, true, false]],
];

/// Distance of sprite quads from the cell edge.
const SPRITE_INSET: f32 = 2.5 / 16.0;

/// Vertex data and ranges of one chunk part.
#[derive(Debug, Clone, PartialEq)]
pub struct PartMesh {
    /// Quad vertices, four per quad.
    pub vertices: Vec<TerrainVertex>,
    /// Category ranges into the shared quad index sequence.
    pub ranges: PartRanges,
}

impl PartMesh {
    /// Size of the vertex data in bytes.
    #[inline]
    #[must_use]
    pub fn byte_size(&self) -> usize {
        std::mem::size_of_val(self.vertices.as_slice())
    }

    /// Hash of the vertex bytes, used to skip re-uploading identical data.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(bytemuck::cast_slice(&self.vertices));
        hasher.finish()
    }
}

/// Mesh of one chunk: an optional part per atlas layer and pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMeshData {
    /// The chunk.
    pub coord: ChunkCoord,
    /// Opaque parts, indexed by atlas layer.
    pub normal: Vec<Option<PartMesh>>,
    /// Translucent parts, indexed by atlas layer.
    pub translucent: Vec<Option<PartMesh>>,
}

impl ChunkMeshData {
    /// An empty mesh with `layers` slots per pass.
    #[must_use]
    pub fn empty(coord: ChunkCoord, layers: usize) -> Self {
        Self {
            coord,
            normal: vec![None; layers],
            translucent: vec![None; layers],
        }
    }

    /// Returns true if no part holds geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts().next().is_none()
    }

    /// Total vertex bytes over every part.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.parts().map(|(_, _, part)| part.byte_size()).sum()
    }

    /// Total indices over every part.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.parts().map(|(_, _, part)| part.ranges.index_count()).sum()
    }

    /// Part for a pass and layer.
    #[must_use]
    pub fn part(&self, pass: MeshPass, layer: usize) -> Option<&PartMesh> {
        let parts = match pass {
            MeshPass::Normal => &self.normal,
            MeshPass::Translucent => &self.translucent,
        };
        parts.get(layer).and_then(Option::as_ref)
    }

    /// Every present part with its pass and layer.
    pub fn parts(&self) -> impl Iterator<Item = (MeshPass, usize, &PartMesh)> + '_ {
        let normal = self
            .normal
            .iter()
            .enumerate()
            .filter_map(|(layer, part)| part.as_ref().map(|part| (MeshPass::Normal, layer, part)));
        let translucent = self
            .translucent
            .iter()
            .enumerate()
            .filter_map(|(layer, part)| part.as_ref().map(|part| (MeshPass::Translucent, layer, part)));
        normal.chain(translucent)
    }
}

/// Per-layer quad buckets of one pass.
type LayerBuckets = Vec<[Vec<TerrainVertex>; CATEGORIES]>;

/// Builds chunk meshes, reusing its scratch buffers between chunks.
#[derive(Debug)]
pub struct ChunkMeshBuilder {
    tables: Arc<MeshTables>,
    window: IndexWindow,
    normal: LayerBuckets,
    translucent: LayerBuckets,
}

impl ChunkMeshBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(tables: Arc<MeshTables>, window: IndexWindow) -> Self {
        let layers = tables.layer_count();
        Self {
            tables,
            window,
            normal: (0..layers).map(|_| Default::default()).collect(),
            translucent: (0..layers).map(|_| Default::default()).collect(),
        }
    }

    /// Index window the part ranges are laid out for.
    #[inline]
    #[must_use]
    pub const fn window(&self) -> IndexWindow {
        self.window
    }

    /// The tables this builder meshes with.
    #[must_use]
    pub fn tables(&self) -> &Arc<MeshTables> {
        &self.tables
    }

    /// Builds the mesh of one chunk.
    pub fn build(&mut self, snapshot: &ChunkSnapshot) -> ChunkMeshData {
        let coord = snapshot.coord();
        if snapshot.is_all_air() {
            return ChunkMeshData::empty(coord, self.tables.layer_count());
        }

        for bucket in self.normal.iter_mut().chain(self.translucent.iter_mut()) {
            bucket.iter_mut().for_each(Vec::clear);
        }

        let tables = &*self.tables;
        #[allow(clippy::cast_precision_loss)]
        let origin = coord.origin().map(|v| v as f32);

        for y in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let block = snapshot.get(x, y, z);
                    #[allow(clippy::cast_precision_loss)]
                    let base = [origin[0] + x as f32, origin[1] + y as f32, origin[2] + z as f32];

                    match tables.shape(block) {
                        BlockShape::Air => {}
                        BlockShape::Sprite { texture } => {
                            let quads = &mut self.normal[texture.layer][SPRITE_SLOT];
                            emit_sprite(quads, base, texture.uv);
                        }
                        BlockShape::Cuboid {
                            min,
                            max,
                            textures,
                            full_bright,
                            pass,
                        } => {
                            let buckets = match pass {
                                MeshPass::Normal => &mut self.normal,
                                MeshPass::Translucent => &mut self.translucent,
                            };
                            for face in Face::ALL {
                                let axis = face.axis();
                                let on_boundary = if face.is_positive() {
                                    max[axis] >= 1.0
                                } else {
                                    min[axis] <= 0.0
                                };
                                if on_boundary {
                                    let [dx, dy, dz] = face.offset();
                                    let neighbour = snapshot.get(x + dx, y + dy, z + dz);
                                    if tables.occludes(block, neighbour) {
                                        continue;
                                    }
                                }

                                let FaceTexture { layer, uv } = textures[face.index()];
                                let quads = &mut buckets[layer][1 + face.index()];
                                emit_face(quads, face, base, *min, *max, uv, face_colour(face, *full_bright));
                            }
                        }
                    }
                }
            }
        }

        ChunkMeshData {
            coord,
            normal: collect_parts(&self.normal, self.window),
            translucent: collect_parts(&self.translucent, self.window),
        }
    }
}

/// Concatenates each layer's buckets into a part.
fn collect_parts(buckets: &LayerBuckets, window: IndexWindow) -> Vec<Option<PartMesh>> {
    buckets
        .iter()
        .map(|categories| {
            let total: usize = categories.iter().map(Vec::len).sum();
            if total == 0 {
                return None;
            }

            #[allow(clippy::cast_possible_truncation)]
            let quads = |slot: usize| (categories[slot].len() as u32) / QUAD_VERTICES;
            let ranges = PartRanges::from_quad_counts(
                quads(SPRITE_SLOT),
                [quads(1), quads(2), quads(3), quads(4), quads(5), quads(6)],
                window,
            );

            let mut vertices = Vec::with_capacity(total);
            for category in categories {
                vertices.extend_from_slice(category);
            }
            Some(PartMesh { vertices, ranges })
        })
        .collect()
}

/// Appends one face of a box.
fn emit_face(
    out: &mut Vec<TerrainVertex>,
    face: Face,
    base: [f32; 3],
    min: [f32; 3],
    max: [f32; 3],
    uv: UvRect,
    colour: [u8; 4],
) {
    for corner in FACE_CORNERS[face.index()] {
        let local = [0, 1, 2].map(|axis| if corner[axis] { max[axis] } else { min[axis] });
        // Side faces take V from the height so textures stay upright
        let (fu, fv) = match face.axis() {
            0 => (local[2], 1.0 - local[1]),
            2 => (local[0], 1.0 - local[1]),
            _ => (local[0], local[2]),
        };
        out.push(TerrainVertex {
            position: [base[0] + local[0], base[1] + local[1], base[2] + local[2]],
            uv: uv.at(fu, fv),
            colour,
        });
    }
}

/// Appends the two diagonal quads of a sprite, each in both windings.
fn emit_sprite(out: &mut Vec<TerrainVertex>, base: [f32; 3], uv: UvRect) {
    let lo = SPRITE_INSET;
    let hi = 1.0 - SPRITE_INSET;
    let diagonals = [[(lo, lo), (hi, hi)], [(lo, hi), (hi, lo)]];

    for [(x0, z0), (x1, z1)] in diagonals {
        let quad = [
            ([x0, 0.0, z0], [0.0, 1.0]),
            ([x1, 0.0, z1], [1.0, 1.0]),
            ([x1, 1.0, z1], [1.0, 0.0]),
            ([x0, 1.0, z0], [0.0, 0.0]),
        ];
        let vertex = |(local, frac): ([f32; 3], [f32; 2])| TerrainVertex {
            position: [base[0] + local[0], base[1] + local[1], base[2] + local[2]],
            uv: uv.at(frac[0], frac[1]),
            colour: WHITE,
        };
        out.extend(quad.iter().copied().map(vertex));
        out.extend(quad.iter().rev().copied().map(vertex));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::AtlasLayout;
    use voxmap_core::{BlockId, BlockRegistry};

    fn builder() -> ChunkMeshBuilder {
        let layout = AtlasLayout::compute(16, 256, 4096).unwrap();
        let tables = Arc::new(MeshTables::new(&BlockRegistry::classic(), layout));
        ChunkMeshBuilder::new(tables, IndexWindow::U16)
    }

    fn single(block: BlockId) -> ChunkSnapshot {
        ChunkSnapshot::from_fn(ChunkCoord::default(), |x, y, z| {
            if (x, y, z) == (8, 8, 8) {
                block
            } else {
                BlockId::AIR
            }
        })
    }

    fn normal(mesh: &ChunkMeshData) -> &PartMesh {
        mesh.part(MeshPass::Normal, 0).unwrap()
    }

    #[test]
    fn test_all_air_chunk_is_empty() {
        let mesh = builder().build(&ChunkSnapshot::from_fn(ChunkCoord::default(), |_, _, _| BlockId::AIR));
        assert!(mesh.is_empty());
        assert_eq!(mesh.byte_size(), 0);
    }

    #[test]
    fn test_lone_cube_has_six_faces() {
        let mesh = builder().build(&single(BlockId::STONE));
        let part = normal(&mesh);

        assert_eq!(part.ranges.index_count(), 36);
        assert_eq!(part.vertices.len(), 24);
        for face in Face::ALL {
            assert_eq!(part.ranges.face(face).count, 6);
        }
        assert!(part.ranges.is_consistent(part.vertices.len()));
    }

    #[test]
    fn test_buried_cube_has_no_faces() {
        // 3x3x3 stone, the centre block is fully enclosed
        let snapshot = ChunkSnapshot::from_fn(ChunkCoord::default(), |x, y, z| {
            if (7..=9).contains(&x) && (7..=9).contains(&y) && (7..=9).contains(&z) {
                BlockId::STONE
            } else {
                BlockId::AIR
            }
        });
        let mesh = builder().build(&snapshot);

        // Only the outer surface: 9 quads per side
        assert_eq!(normal(&mesh).ranges.index_count(), 6 * 9 * 6);
    }

    #[test]
    fn test_faces_are_wound_outwards() {
        let mesh = builder().build(&single(BlockId::STONE));
        let part = normal(&mesh);

        for face in Face::ALL {
            let first_vertex = (part.ranges.face(face).offset / 6 * 4) as usize;
            let v = &part.vertices[first_vertex..first_vertex + 3];
            let e1 = [0, 1, 2].map(|i| v[1].position[i] - v[0].position[i]);
            let e2 = [0, 1, 2].map(|i| v[2].position[i] - v[0].position[i]);
            let normal = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            let expected = face.offset().map(|c| c as f32);
            assert_eq!(normal, expected, "{face:?}");
        }
    }

    #[test]
    fn test_sprite_ignores_neighbours() {
        let snapshot = ChunkSnapshot::from_fn(ChunkCoord::default(), |x, y, z| {
            if (x, y, z) == (8, 8, 8) {
                BlockId::SAPLING
            } else if (7..=9).contains(&x) && (7..=9).contains(&y) && (7..=9).contains(&z) {
                BlockId::STONE
            } else {
                BlockId::AIR
            }
        });
        let mesh = builder().build(&snapshot);
        let part = normal(&mesh);

        assert_eq!(part.ranges.sprite.count, 4 * 6);
        assert_eq!(part.vertices[0].colour, WHITE);
    }

    #[test]
    fn test_water_goes_to_translucent_part() {
        let mesh = builder().build(&single(BlockId::WATER));

        assert!(mesh.part(MeshPass::Normal, 0).is_none());
        let part = mesh.part(MeshPass::Translucent, 0).unwrap();
        assert_eq!(part.ranges.index_count(), 36);
    }

    #[test]
    fn test_water_surface_against_stone() {
        // Water above stone: the stone top is visible through water,
        // the water bottom is hidden by the stone
        let snapshot = ChunkSnapshot::from_fn(ChunkCoord::default(), |x, y, z| match (x, y, z) {
            (8, 8, 8) => BlockId::WATER,
            (8, 7, 8) => BlockId::STONE,
            _ => BlockId::AIR,
        });
        let mesh = builder().build(&snapshot);

        let water = mesh.part(MeshPass::Translucent, 0).unwrap();
        assert_eq!(water.ranges.face(Face::Bottom).count, 0);
        let stone = mesh.part(MeshPass::Normal, 0).unwrap();
        assert_eq!(stone.ranges.face(Face::Top).count, 6);
    }

    #[test]
    fn test_slab_top_is_always_emitted() {
        let snapshot = ChunkSnapshot::from_fn(ChunkCoord::default(), |x, y, z| match (x, y, z) {
            (8, 8, 8) => BlockId::SLAB,
            (8, 9, 8) => BlockId::STONE,
            _ => BlockId::AIR,
        });
        let mesh = builder().build(&snapshot);
        let part = normal(&mesh);

        // Slab top (y = 8.5) plus stone top; stone bottom faces the slab
        assert_eq!(part.ranges.face(Face::Top).count, 12);
        assert_eq!(part.ranges.face(Face::Bottom).count, 12);
    }

    #[test]
    fn test_face_shading() {
        let mesh = builder().build(&single(BlockId::STONE));
        let part = normal(&mesh);
        let colour_of = |face: Face| part.vertices[(part.ranges.face(face).offset / 6 * 4) as usize].colour;

        assert_eq!(colour_of(Face::Top), WHITE);
        assert_eq!(colour_of(Face::Bottom), face_colour(Face::Bottom, false));

        let lava = builder().build(&single(BlockId::LAVA));
        let lava = normal(&lava);
        assert_eq!(lava.vertices[(lava.ranges.face(Face::Bottom).offset / 6 * 4) as usize].colour, WHITE);
    }

    #[test]
    fn test_build_is_deterministic() {
        let snapshot = ChunkSnapshot::from_fn(ChunkCoord::new(1, 0, 2), |x, y, z| {
            BlockId(((x * 7 + y * 13 + z * 3).rem_euclid(50)) as u8)
        });
        let mut builder = builder();
        let first = builder.build(&snapshot);
        let second = builder.build(&snapshot);

        assert_eq!(first, second);
    }
}
