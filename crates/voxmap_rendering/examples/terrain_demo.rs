//! # Terrain Demo
//!
//! Builds a small map, walks the camera across it and prints what the
//! renderer did each frame:
//!
//! ```text
//! 1. Every chunk starts pending and is built within the frame budget
//! 2. The camera moves, chunks re-sort once it crosses the resort distance
//! 3. A block edit on a chunk border rebuilds both chunks
//! 4. The camera dives under water and the translucent pass draws every face
//! ```
//!
//! Run with: `cargo run --example terrain_demo -p voxmap_rendering`

use voxmap_core::{BlockId, BlockRegistry, World};
use voxmap_rendering::{Camera, MapRenderer, RecordingBackend, RendererConfig, TerrainAtlas2D};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let world = World::generate(96, 48, 96, |x, y, z| {
        let height = 18 + (x / 4 + z / 6) % 6;
        if y < height {
            BlockId::STONE
        } else if y == height && (x + 3 * z) % 17 == 0 {
            BlockId::SAPLING
        } else if y < 22 {
            BlockId::WATER
        } else {
            BlockId::AIR
        }
    })?;

    let atlas = TerrainAtlas2D::solid_tiles(16, 16, |tile| [(tile * 7) as u8, 160, 90, 255]);
    let mut renderer = MapRenderer::new(
        RendererConfig::default(),
        RecordingBackend::new(),
        BlockRegistry::classic(),
        &atlas,
    )?;
    renderer.on_new_map(&world);

    println!("chunks: {}", renderer.store().len());
    println!();
    println!("frame  drawn  culled  pending  rebuilds  draws  triangles");

    let mut camera = Camera::new([8.0, 32.0, 8.0], 2.4, -0.4);
    for frame in 0..40 {
        if frame == 24 {
            // Edit on the x = 32 chunk border
            world.set_block(32, 30, 40, BlockId::STONE)?;
        }
        if frame == 32 {
            camera.position = [48.0, 21.5, 48.0];
        } else {
            camera.position[0] += 1.5;
            camera.position[2] += 1.5;
        }

        renderer.backend_mut().clear_commands();
        let stats = renderer.render_frame(&world, &camera);
        println!(
            "{frame:>5}  {:>5}  {:>6}  {:>7}  {:>8}  {:>5}  {:>9}{}",
            stats.chunks_drawn,
            stats.chunks_culled,
            stats.pending_chunks,
            stats.rebuilds,
            stats.draw_calls,
            stats.triangles(),
            if renderer.is_submerged() { "  (submerged)" } else { "" },
        );
    }

    renderer.dispose();
    println!();
    println!("live buffers after dispose: {}", renderer.backend().live_buffers());
    Ok(())
}
