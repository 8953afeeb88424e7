//! Terrain vertex format and face shading.

use bytemuck::{Pod, Zeroable};
use voxmap_core::Face;

/// Terrain vertex: position, texture coordinate and packed colour.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Texture coordinate inside the atlas layer.
    pub uv: [f32; 2],
    /// RGBA colour multiplier.
    pub colour: [u8; 4],
}

#[cfg(feature = "wgpu")]
impl TerrainVertex {
    /// Vertex attributes for wgpu pipelines.
    pub const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,  // position
        1 => Float32x2,  // uv
        2 => Unorm8x4,   // colour
    ];

    /// Vertex buffer layout descriptor.
    #[must_use]
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Unscaled white.
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Brightness of each face, indexed by [`Face::index`].
const FACE_SHADES: [u8; 6] = [
    153, // left   0.6
    153, // right  0.6
    204, // front  0.8
    204, // back   0.8
    127, // bottom 0.5
    255, // top    1.0
];

/// Vertex colour for a face of a normally lit or full-bright block.
#[inline]
#[must_use]
pub const fn face_colour(face: Face, full_bright: bool) -> [u8; 4] {
    if full_bright {
        return WHITE;
    }
    let shade = FACE_SHADES[face.index()];
    [shade, shade, shade, 255]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<TerrainVertex>(), 24);
        let verts = [TerrainVertex::default(); 2];
        let bytes: &[u8] = bytemuck::cast_slice(&verts);
        assert_eq!(bytes.len(), 48);
    }

    #[test]
    fn test_face_colours() {
        assert_eq!(face_colour(Face::Top, false), WHITE);
        assert_eq!(face_colour(Face::Bottom, false), [127, 127, 127, 255]);
        assert_eq!(face_colour(Face::Left, false)[0], 153);
        assert_eq!(face_colour(Face::Back, false)[0], 204);
        assert_eq!(face_colour(Face::Bottom, true), WHITE);
    }
}
