//! # Terrain Render Tests
//!
//! Drives a whole [`MapRenderer`] against a [`RecordingBackend`] and checks
//! the draw stream it produces.

use std::sync::Arc;

use voxmap_core::{BlockChange, BlockId, BlockRegistry, World};
use voxmap_rendering::backend::{Command, DrawRecord};
use voxmap_rendering::mesh::{IndexWindow, MAX_U16_INDICES, MAX_U16_VERTICES};
use voxmap_rendering::{
    AtlasLayout, Camera, ChunkCoord, ChunkMeshBuilder, ChunkSnapshot, GraphicsBackend, IndexFormat, MapRenderer,
    MeshPass, MeshTables, PassState, RecordingBackend, RendererConfig, TerrainAtlas2D,
};

fn renderer_with(config: RendererConfig) -> MapRenderer<RecordingBackend> {
    let atlas = TerrainAtlas2D::solid_tiles(16, 16, |tile| [tile as u8, 128, 64, 255]);
    MapRenderer::new(config, RecordingBackend::new(), BlockRegistry::classic(), &atlas).unwrap()
}

fn renderer() -> MapRenderer<RecordingBackend> {
    renderer_with(RendererConfig::default())
}

/// Camera at `position` looking along +X.
fn looking_east(position: [f32; 3]) -> Camera {
    Camera::new(position, std::f32::consts::FRAC_PI_2, 0.0)
}

fn draws(renderer: &MapRenderer<RecordingBackend>) -> Vec<DrawRecord> {
    renderer.backend().draws().copied().collect()
}

/// Builds every pending chunk.
fn build_all(renderer: &mut MapRenderer<RecordingBackend>, world: &World, camera: &Camera) {
    for _ in 0..64 {
        renderer.render_frame(world, camera);
        if renderer.store().pending_count() == 0 {
            break;
        }
    }
    renderer.finish_rebuilds();
    assert_eq!(renderer.store().pending_count(), 0);
}

/// Test: an all-air map uploads nothing and draws nothing.
#[test]
fn test_all_air_map_creates_no_parts() {
    let world = World::new(32, 16, 16).unwrap();
    let mut renderer = renderer();
    renderer.on_new_map(&world);

    let camera = looking_east([-4.0, 8.0, 8.0]);
    build_all(&mut renderer, &world, &camera);

    assert_eq!(renderer.store().part_count(), 0);
    assert!(!renderer
        .backend()
        .commands()
        .iter()
        .any(|c| matches!(c, Command::CreateVertexBuffer { .. })));
    assert!(draws(&renderer).is_empty());
}

/// Test: a 3x3x3 cube only shows its outer surface.
#[test]
fn test_buried_block_emits_no_faces() {
    let layout = AtlasLayout::compute(16, 256, 4096).unwrap();
    let tables = Arc::new(MeshTables::new(&BlockRegistry::classic(), layout));
    let mut builder = ChunkMeshBuilder::new(tables, IndexWindow::U16);

    let snapshot = ChunkSnapshot::from_fn(ChunkCoord::default(), |x, y, z| {
        let inside = |v: i32| (4..7).contains(&v);
        if inside(x) && inside(y) && inside(z) {
            BlockId::STONE
        } else {
            BlockId::AIR
        }
    });
    let mesh = builder.build(&snapshot);

    // 6 sides of 3x3 quads
    assert_eq!(mesh.index_count(), 6 * 9 * 6);
}

/// Test: both translucent sub-passes draw exactly the translucent geometry.
#[test]
fn test_translucent_sub_passes_draw_geometry_total() {
    let world = World::generate(16, 16, 16, |_, y, _| if y < 8 { BlockId::WATER } else { BlockId::AIR }).unwrap();
    let mut renderer = renderer();
    renderer.on_new_map(&world);

    // Head inside the water: every face is drawn
    let camera = looking_east([8.0, 4.5, 8.0]);
    build_all(&mut renderer, &world, &camera);
    assert!(renderer.is_submerged());

    let geometry = renderer
        .store()
        .get(0)
        .unwrap()
        .part(MeshPass::Translucent, 0)
        .unwrap()
        .ranges
        .index_count();

    renderer.backend_mut().clear_commands();
    renderer.render_frame(&world, &camera);

    let total = |state: PassState| -> u32 {
        draws(&renderer)
            .iter()
            .filter(|d| d.state == state)
            .map(|d| d.draw.index_count)
            .sum()
    };
    assert_eq!(total(PassState::TRANSLUCENT_DEPTH), geometry);
    assert_eq!(total(PassState::TRANSLUCENT_COLOUR), geometry);
}

/// Test: rebuilding unchanged blocks reuses every buffer.
#[test]
fn test_identical_rebuild_reuses_buffers() {
    let world = World::generate(16, 16, 16, |x, y, z| if (x + y + z) % 2 == 0 { BlockId::STONE } else { BlockId::AIR })
        .unwrap();
    let mut renderer = renderer();
    renderer.on_new_map(&world);
    let camera = looking_east([-4.0, 8.0, 8.0]);
    build_all(&mut renderer, &world, &camera);

    let before = *renderer.store().get(0).unwrap().part(MeshPass::Normal, 0).unwrap();
    renderer.backend_mut().clear_commands();

    renderer.on_block_changed(&BlockChange {
        x: 4,
        y: 4,
        z: 4,
        old: BlockId::STONE,
        new: BlockId::STONE,
    });
    let stats = renderer.render_frame(&world, &camera);

    assert_eq!(stats.rebuilds, 1);
    let after = *renderer.store().get(0).unwrap().part(MeshPass::Normal, 0).unwrap();
    assert_eq!(after, before);
    assert!(!renderer.backend().commands().iter().any(|c| matches!(
        c,
        Command::CreateVertexBuffer { .. } | Command::UpdateVertexBuffer { .. } | Command::DeleteBuffer(_)
    )));
}

/// Test: translucent chunks are drawn farthest first.
#[test]
fn test_translucent_back_to_front() {
    let world = World::generate(48, 16, 16, |_, y, _| if y < 4 { BlockId::WATER } else { BlockId::AIR }).unwrap();
    let mut renderer = renderer();
    renderer.on_new_map(&world);

    // Chunk centres are 10, 26 and 42 blocks away
    let camera = looking_east([-2.0, 8.0, 8.0]);
    build_all(&mut renderer, &world, &camera);
    assert_eq!(renderer.sorter().translucent_order(), &[2, 1, 0]);

    renderer.backend_mut().clear_commands();
    renderer.render_frame(&world, &camera);

    let buffer_of = |index: usize| {
        renderer
            .store()
            .get(index)
            .unwrap()
            .part(MeshPass::Translucent, 0)
            .unwrap()
            .buffer
    };
    let mut order: Vec<_> = draws(&renderer)
        .iter()
        .filter(|d| d.state == PassState::TRANSLUCENT_COLOUR)
        .filter_map(|d| d.vertex_buffer)
        .collect();
    order.dedup();
    assert_eq!(order, vec![buffer_of(2), buffer_of(1), buffer_of(0)]);
}

/// Test: a part over 65536 vertices is drawn through two index windows.
#[test]
fn test_big_part_is_split_at_ceiling() {
    // Slabs never occlude each other, so every slab keeps all six faces
    let world = World::generate(16, 16, 16, |_, _, _| BlockId::SLAB).unwrap();
    let mut renderer = renderer();
    renderer.on_new_map(&world);

    let camera = looking_east([8.0, 8.25, 8.0]);
    build_all(&mut renderer, &world, &camera);

    let part = *renderer.store().get(0).unwrap().part(MeshPass::Normal, 0).unwrap();
    assert!(part.ranges.big);
    assert!(part.ranges.vertex_count() > MAX_U16_VERTICES);

    renderer.backend_mut().clear_commands();
    renderer.render_frame(&world, &camera);

    let opaque: Vec<_> = draws(&renderer)
        .into_iter()
        .filter(|d| d.state.alpha_test)
        .map(|d| d.draw)
        .collect();
    assert!(opaque.iter().all(|d| d.first_index + d.index_count <= MAX_U16_INDICES));
    assert!(opaque.iter().any(|d| d.base_vertex == MAX_U16_VERTICES));
    assert_eq!(opaque.iter().map(|d| d.index_count).sum::<u32>(), part.ranges.index_count());
}

/// Test: 32-bit indices draw the same part without any split.
#[test]
fn test_wide_indices_never_split() {
    let world = World::generate(16, 16, 16, |_, _, _| BlockId::SLAB).unwrap();
    let mut renderer = renderer_with(RendererConfig {
        index_format: IndexFormat::U32,
        ..RendererConfig::default()
    });
    renderer.on_new_map(&world);

    let camera = looking_east([8.0, 8.25, 8.0]);
    build_all(&mut renderer, &world, &camera);
    assert!(!renderer.store().get(0).unwrap().part(MeshPass::Normal, 0).unwrap().ranges.big);

    renderer.backend_mut().clear_commands();
    renderer.render_frame(&world, &camera);

    let opaque: Vec<_> = draws(&renderer).into_iter().filter(|d| d.state.alpha_test).collect();
    assert_eq!(opaque.len(), 3);
    assert!(opaque.iter().all(|d| d.draw.base_vertex == 0));
}

/// Test: placing a block against another removes the shared face from both
/// chunks.
#[test]
fn test_adjacent_blocks_hide_shared_face() {
    let world = World::generate(32, 16, 16, |x, y, z| {
        if (x, y, z) == (15, 5, 5) {
            BlockId::STONE
        } else {
            BlockId::AIR
        }
    })
    .unwrap();
    let mut renderer = renderer();
    renderer.on_new_map(&world);
    let camera = looking_east([-4.0, 8.0, 8.0]);
    build_all(&mut renderer, &world, &camera);

    let indices = |renderer: &MapRenderer<RecordingBackend>, index: usize| {
        renderer
            .store()
            .get(index)
            .unwrap()
            .part(MeshPass::Normal, 0)
            .map_or(0, |p| p.ranges.index_count())
    };
    assert_eq!(indices(&renderer, 0), 36);
    assert_eq!(indices(&renderer, 1), 0);

    world.set_block(16, 5, 5, BlockId::STONE).unwrap();
    renderer.render_frame(&world, &camera);

    // Five faces each, the +X face of one and the -X face of the other gone
    assert_eq!(indices(&renderer, 0), 30);
    assert_eq!(indices(&renderer, 1), 30);
}

/// Test: the passes leave the default pass state behind.
#[test]
fn test_pass_state_restored() {
    let world = World::generate(16, 16, 16, |_, y, _| match y {
        0..=3 => BlockId::STONE,
        4..=5 => BlockId::WATER,
        6 => BlockId::SAPLING,
        _ => BlockId::AIR,
    })
    .unwrap();
    let mut renderer = renderer();
    renderer.on_new_map(&world);
    let camera = looking_east([-4.0, 10.0, 8.0]);
    build_all(&mut renderer, &world, &camera);

    renderer.render_frame(&world, &camera);
    assert!(!draws(&renderer).is_empty());
    assert_eq!(renderer.backend().pass_state(), PassState::DEFAULT);
}

/// Test: a chunk that cannot be uploaded is reported once and skipped.
#[test]
fn test_exhausted_chunk_is_skipped() {
    let world = World::generate(16, 16, 16, |_, y, _| if y < 2 { BlockId::STONE } else { BlockId::AIR }).unwrap();
    let mut renderer = renderer();
    renderer.on_new_map(&world);

    // Only a few bytes left after the atlas and index buffer
    let used = renderer.backend().used_bytes();
    renderer.backend_mut().set_memory_budget(Some(used + 64));

    let camera = looking_east([-4.0, 8.0, 8.0]);
    let stats = renderer.render_frame(&world, &camera);
    assert_eq!(stats.failures, 1);
    assert_eq!(renderer.failures()[0].coord, ChunkCoord::new(0, 0, 0));
    assert_eq!(renderer.store().pending_count(), 0);
    assert!(draws(&renderer).is_empty());

    // Not retried every frame
    let stats = renderer.render_frame(&world, &camera);
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.chunks_drawn, 0);

    // An edit retries once memory is available again
    renderer.backend_mut().set_memory_budget(None);
    world.set_block(3, 3, 3, BlockId::STONE).unwrap();
    let stats = renderer.render_frame(&world, &camera);
    assert_eq!(stats.rebuilds, 1);
    assert_eq!(stats.chunks_drawn, 1);
}

/// Test: mesh workers produce the same parts as inline builds.
#[test]
fn test_workers_match_inline_builds() {
    let world = World::generate(32, 32, 32, |x, y, z| {
        if y < 10 + (x + z) % 5 {
            BlockId::STONE
        } else if y < 14 {
            BlockId::WATER
        } else {
            BlockId::AIR
        }
    })
    .unwrap();
    let camera = looking_east([-4.0, 20.0, 16.0]);

    let mut inline = renderer();
    inline.on_new_map(&world);
    build_all(&mut inline, &world, &camera);

    let mut threaded = renderer_with(RendererConfig {
        mesh_workers: 2,
        ..RendererConfig::default()
    });
    threaded.on_new_map(&world);
    build_all(&mut threaded, &world, &camera);

    for index in 0..inline.store().len() {
        for pass in [MeshPass::Normal, MeshPass::Translucent] {
            let expected = inline.store().get(index).unwrap().part(pass, 0).map(|p| (p.ranges, p.content_hash));
            let actual = threaded.store().get(index).unwrap().part(pass, 0).map(|p| (p.ranges, p.content_hash));
            assert_eq!(actual, expected, "chunk {index} {pass:?}");
        }
    }
}
