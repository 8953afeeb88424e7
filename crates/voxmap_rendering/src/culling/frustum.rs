//! View frustum tests for chunk bounds.
//!
//! The six clip planes are pulled straight out of the view-projection
//! matrix, so the culler never needs the camera's angles or field of view.

use bytemuck::{Pod, Zeroable};

/// A clip plane: points with `normal · p + offset >= 0` are inside.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Plane {
    /// Unit normal pointing into the frustum.
    pub normal: [f32; 3],
    /// Offset along the normal.
    pub offset: f32,
}

impl Plane {
    /// Builds a plane from raw coefficients, scaling the normal to unit
    /// length. Degenerate planes are kept as given.
    #[must_use]
    pub fn from_coefficients(x: f32, y: f32, z: f32, w: f32) -> Self {
        let len = (x * x + y * y + z * z).sqrt();
        let scale = if len > f32::EPSILON { 1.0 / len } else { 1.0 };
        Self {
            normal: [x * scale, y * scale, z * scale],
            offset: w * scale,
        }
    }

    /// Signed distance of a point; negative is outside.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, p: [f32; 3]) -> f32 {
        self.normal[0] * p[0] + self.normal[1] * p[1] + self.normal[2] * p[2] + self.offset
    }
}

/// The six clip planes of a camera.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near and far.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the planes of a column-major (`m[column][row]`)
    /// view-projection matrix.
    ///
    /// The near plane is taken as `w + z`, which for a `0..1` depth range
    /// sits slightly behind the real one and never rejects a visible box.
    #[must_use]
    pub fn from_view_projection(m: &[[f32; 4]; 4]) -> Self {
        let row = |r: usize| [m[0][r], m[1][r], m[2][r], m[3][r]];
        let w = row(3);
        let side = |r: usize, sign: f32| {
            let v = row(r);
            Plane::from_coefficients(
                w[0] + sign * v[0],
                w[1] + sign * v[1],
                w[2] + sign * v[2],
                w[3] + sign * v[3],
            )
        };

        Self {
            planes: [
                side(0, 1.0),
                side(0, -1.0),
                side(1, 1.0),
                side(1, -1.0),
                side(2, 1.0),
                side(2, -1.0),
            ],
        }
    }

    /// Returns true if any part of `bounds` may be inside.
    ///
    /// Each plane is tested against the box corner furthest along its
    /// normal; a box is rejected only when that corner is outside.
    #[must_use]
    pub fn intersects(&self, bounds: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let corner = [0, 1, 2].map(|axis| {
                if plane.normal[axis] >= 0.0 {
                    bounds.max[axis]
                } else {
                    bounds.min[axis]
                }
            });
            plane.signed_distance(corner) >= 0.0
        })
    }
}

/// Axis-aligned box in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl Aabb {
    /// Creates a box from its corners.
    #[must_use]
    pub const fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// Cube with its minimum corner at `origin`.
    #[must_use]
    pub fn cube(origin: [f32; 3], size: f32) -> Self {
        Self {
            min: origin,
            max: origin.map(|v| v + size),
        }
    }

    /// Midpoint of the box.
    #[must_use]
    pub fn centre(&self) -> [f32; 3] {
        [0, 1, 2].map(|axis| (self.min[axis] + self.max[axis]) * 0.5)
    }

    /// Returns true if `p` is inside or on the box.
    #[must_use]
    pub fn contains(&self, p: [f32; 3]) -> bool {
        (0..3).all(|axis| self.min[axis] <= p[axis] && p[axis] <= self.max[axis])
    }
}

/// Frustum test against the latest camera.
///
/// Until the first [`FrustumCuller::update`] every box passes.
#[derive(Debug, Clone, Default)]
pub struct FrustumCuller {
    frustum: Option<Frustum>,
}

impl FrustumCuller {
    /// Creates a culler that accepts everything.
    #[must_use]
    pub const fn new() -> Self {
        Self { frustum: None }
    }

    /// Rebuilds the planes from a view-projection matrix.
    pub fn update(&mut self, view_projection: &[[f32; 4]; 4]) {
        self.frustum = Some(Frustum::from_view_projection(view_projection));
    }

    /// Current frustum, if one was set.
    #[must_use]
    pub const fn frustum(&self) -> Option<&Frustum> {
        self.frustum.as_ref()
    }

    /// Returns true if the box may be visible.
    #[inline]
    #[must_use]
    pub fn test_aabb(&self, bounds: &Aabb) -> bool {
        self.frustum.as_ref().map_or(true, |frustum| frustum.intersects(bounds))
    }
}
