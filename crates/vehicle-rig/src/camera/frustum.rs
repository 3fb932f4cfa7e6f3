//! Perspective frustum implied by the camera's zoom.

use glam::Mat4;

/// Symmetric perspective frustum, in view space at the near plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub near: f32,
    pub far: f32,
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Frustum {
    /// Frustum for a Y tangent (half-height over distance) and aspect ratio.
    #[must_use]
    pub fn perspective(y_tangent: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        let top = near * y_tangent;
        let right = top * aspect_ratio;
        Self {
            near,
            far,
            top,
            bottom: -top,
            left: -right,
            right,
        }
    }

    /// Y tangent for a vertical field of view in radians.
    #[must_use]
    pub fn y_tangent_for_fov(vertical_fov: f32) -> f32 {
        (0.5 * vertical_fov).tan()
    }

    #[must_use]
    pub fn y_tangent(&self) -> f32 {
        self.top / self.near
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.right / self.top
    }

    /// Full vertical field of view in radians.
    #[must_use]
    pub fn vertical_fov(&self) -> f32 {
        2.0 * self.y_tangent().atan()
    }

    /// Full horizontal field of view in radians.
    #[must_use]
    pub fn horizontal_fov(&self) -> f32 {
        2.0 * (self.right / self.near).atan()
    }

    /// Right-handed projection matrix with a `[0, 1]` depth range.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.vertical_fov(), self.aspect_ratio(), self.near, self.far)
    }
}
