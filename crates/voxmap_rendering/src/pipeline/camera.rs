//! Player head camera.
//!
//! Matrices are column-major `m[column][row]` with a right-handed view
//! space and a `0..1` depth range.

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: 70.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 512.0,
        }
    }
}

impl Projection {
    /// Projection matrix.
    #[must_use]
    pub fn matrix(&self) -> [[f32; 4]; 4] {
        let f = 1.0 / (self.fov_y / 2.0).tan();
        let a = self.far / (self.near - self.far);
        let b = (self.near * self.far) / (self.near - self.far);
        [
            [f / self.aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, a, -1.0],
            [0.0, 0.0, b, 0.0],
        ]
    }
}

/// Position and orientation of the player's head.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    /// Eye position in world space.
    pub position: [f32; 3],
    /// Rotation about +Y in radians; 0 looks towards -Z.
    pub yaw: f32,
    /// Rotation above the horizon in radians.
    pub pitch: f32,
}

/// Pitch limit keeping the view direction away from straight up or down.
const MAX_PITCH: f32 = 89.9 * std::f32::consts::PI / 180.0;

impl Camera {
    /// Creates a camera.
    #[must_use]
    pub fn new(position: [f32; 3], yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch: pitch.clamp(-MAX_PITCH, MAX_PITCH),
        }
    }

    /// Unit view direction.
    #[must_use]
    pub fn forward(&self) -> [f32; 3] {
        let pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = pitch.sin_cos();
        [sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch]
    }

    /// Block position containing the eye.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn head_block(&self) -> [i32; 3] {
        self.position.map(|v| v.floor() as i32)
    }

    /// View matrix.
    #[must_use]
    pub fn view_matrix(&self) -> [[f32; 4]; 4] {
        let eye = self.position;
        let f = self.forward();
        let r = normalize(cross(f, [0.0, 1.0, 0.0]));
        let u = cross(r, f);
        [
            [r[0], u[0], -f[0], 0.0],
            [r[1], u[1], -f[1], 0.0],
            [r[2], u[2], -f[2], 0.0],
            [-dot(r, eye), -dot(u, eye), dot(f, eye), 1.0],
        ]
    }

    /// Combined view-projection matrix, as used for frustum culling.
    #[must_use]
    pub fn view_projection(&self, projection: &Projection) -> [[f32; 4]; 4] {
        multiply(&projection.matrix(), &self.view_matrix())
    }
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = dot(v, v).sqrt();
    if len > 0.0001 {
        v.map(|c| c / len)
    } else {
        [0.0; 3]
    }
}

/// `a * b` for column-major matrices.
fn multiply(a: &[[f32; 4]; 4], b: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut result = [[0.0; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            for k in 0..4 {
                result[col][row] += a[k][row] * b[col][k];
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::{Aabb, FrustumCuller};

    fn transform(m: &[[f32; 4]; 4], p: [f32; 3]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (row, value) in out.iter_mut().enumerate() {
            *value = m[0][row] * p[0] + m[1][row] * p[1] + m[2][row] * p[2] + m[3][row];
        }
        out
    }

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::new([0.0; 3], 0.0, 0.0);
        let f = camera.forward();
        assert!(f[0].abs() < 1e-6 && f[1].abs() < 1e-6);
        assert!((f[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let camera = Camera::new([0.0; 3], 0.0, 3.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
        assert!(camera.forward()[1] < 1.0);
    }

    #[test]
    fn test_view_moves_eye_to_origin() {
        let camera = Camera::new([3.0, 4.0, 5.0], 0.7, 0.2);
        let p = transform(&camera.view_matrix(), camera.position);
        assert!(p[0].abs() < 1e-4 && p[1].abs() < 1e-4 && p[2].abs() < 1e-4);
    }

    #[test]
    fn test_head_block_floors() {
        let camera = Camera::new([1.5, -0.5, 16.0], 0.0, 0.0);
        assert_eq!(camera.head_block(), [1, -1, 16]);
    }

    #[test]
    fn test_frustum_from_camera() {
        let camera = Camera::new([8.0, 8.0, 40.0], 0.0, 0.0);
        let mut culler = FrustumCuller::new();
        culler.update(&camera.view_projection(&Projection::default()));

        // In front (towards -Z) and behind the camera
        assert!(culler.test_aabb(&Aabb::cube([0.0; 3], 16.0)));
        assert!(!culler.test_aabb(&Aabb::cube([0.0, 0.0, 64.0], 16.0)));
    }
}
