//! Per-chunk render metadata.

use voxmap_core::Face;

use super::coord::ChunkCoord;
use crate::backend::BufferId;
use crate::culling::Aabb;
use crate::mesh::{MeshPass, PartRanges};

/// Set of face directions, one bit per [`Face::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FaceMask(u8);

impl FaceMask {
    /// No faces.
    pub const NONE: Self = Self(0);
    /// Every face.
    pub const ALL: Self = Self(0b11_1111);

    /// Adds a face.
    #[inline]
    #[must_use]
    pub const fn with(self, face: Face) -> Self {
        Self(self.0 | 1 << face.index())
    }

    /// Returns true if the face is in the set.
    #[inline]
    #[must_use]
    pub const fn contains(self, face: Face) -> bool {
        self.0 & (1 << face.index()) != 0
    }

    /// Faces of a box that can face a camera at `eye`.
    ///
    /// A face direction is possible when some plane of that direction
    /// inside the box lies in front of the camera: left faces need the eye
    /// left of the box's max X, right faces need it right of the min X.
    #[must_use]
    pub fn facing(eye: [f32; 3], bounds: &Aabb) -> Self {
        let mut mask = Self::NONE;
        for face in Face::ALL {
            let axis = face.axis();
            let visible = if face.is_positive() {
                eye[axis] > bounds.min[axis]
            } else {
                eye[axis] < bounds.max[axis]
            };
            if visible {
                mask = mask.with(face);
            }
        }
        mask
    }
}

/// An uploaded chunk part: one vertex buffer and its category ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPart {
    /// Vertex buffer owned by this part.
    pub buffer: BufferId,
    /// Index ranges into the shared quad index buffer.
    pub ranges: PartRanges,
    /// Hash of the uploaded vertex bytes.
    pub content_hash: u64,
}

/// Render state of one chunk.
#[derive(Debug, Clone)]
pub struct ChunkInfo {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// World-space centre.
    pub centre: [f32; 3],
    /// World-space bounds.
    pub bounds: Aabb,
    /// Inside the view frustum this frame.
    pub visible: bool,
    /// Face directions that may face the camera this frame.
    pub draw: FaceMask,

    pub(crate) normal_parts: Vec<Option<ChunkPart>>,
    pub(crate) translucent_parts: Vec<Option<ChunkPart>>,

    /// Latest rebuild started, 0 if none; results of older rebuilds are
    /// discarded.
    pub(crate) generation: u64,
    /// Generation of the rebuild running on a mesh worker.
    pub(crate) in_flight: Option<u64>,
    /// Never built since the map loaded or was refreshed.
    pub(crate) pending: bool,
    /// Waiting in the edit queue.
    pub(crate) queued: bool,
    /// Resource exhaustion was already reported for this chunk.
    pub(crate) exhaustion_logged: bool,
}

impl ChunkInfo {
    /// Creates metadata for an unbuilt chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord, layers: usize) -> Self {
        Self {
            coord,
            centre: coord.centre(),
            bounds: coord.bounds(),
            visible: true,
            draw: FaceMask::ALL,
            normal_parts: vec![None; layers],
            translucent_parts: vec![None; layers],
            generation: 0,
            in_flight: None,
            pending: true,
            queued: false,
            exhaustion_logged: false,
        }
    }

    /// Part of a pass in an atlas layer.
    #[inline]
    #[must_use]
    pub fn part(&self, pass: MeshPass, layer: usize) -> Option<&ChunkPart> {
        self.parts(pass).get(layer).and_then(Option::as_ref)
    }

    /// Every part slot of a pass, indexed by atlas layer.
    #[inline]
    #[must_use]
    pub fn parts(&self, pass: MeshPass) -> &[Option<ChunkPart>] {
        match pass {
            MeshPass::Normal => &self.normal_parts,
            MeshPass::Translucent => &self.translucent_parts,
        }
    }

    pub(crate) fn parts_mut(&mut self, pass: MeshPass) -> &mut [Option<ChunkPart>] {
        match pass {
            MeshPass::Normal => &mut self.normal_parts,
            MeshPass::Translucent => &mut self.translucent_parts,
        }
    }

    /// Returns true if the chunk owns any part.
    #[must_use]
    pub fn has_parts(&self) -> bool {
        self.normal_parts.iter().chain(&self.translucent_parts).any(Option::is_some)
    }

    /// Returns true if the chunk owns a translucent part.
    #[must_use]
    pub fn has_translucent_parts(&self) -> bool {
        self.translucent_parts.iter().any(Option::is_some)
    }

    /// Returns true if the chunk has not been built yet.
    #[inline]
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Latest rebuild started.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_mask_bits() {
        let mask = FaceMask::NONE.with(Face::Left).with(Face::Top);
        assert!(mask.contains(Face::Left));
        assert!(mask.contains(Face::Top));
        assert!(!mask.contains(Face::Right));
        assert!(Face::ALL.iter().all(|&face| FaceMask::ALL.contains(face)));
    }

    #[test]
    fn test_camera_outside_box() {
        let bounds = Aabb::new([0.0; 3], [16.0; 3]);
        // Camera to the right (+X), above (+Y), centred in Z
        let mask = FaceMask::facing([20.0, 30.0, 8.0], &bounds);

        assert!(mask.contains(Face::Right));
        assert!(!mask.contains(Face::Left));
        assert!(mask.contains(Face::Top));
        assert!(!mask.contains(Face::Bottom));
        assert!(mask.contains(Face::Front));
        assert!(mask.contains(Face::Back));
    }

    #[test]
    fn test_camera_inside_box_sees_everything() {
        let bounds = Aabb::new([0.0; 3], [16.0; 3]);
        assert_eq!(FaceMask::facing([8.0, 8.0, 8.0], &bounds), FaceMask::ALL);
    }
}
