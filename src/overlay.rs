//! Overlay geometry
//!
//! The overlay is a flat green quad with a text label, placed five units in
//! front of the camera and spun about the Y axis by the animation phase. Its
//! placement never depends on where the marker is in the image.

use glam::{Mat4, Vec3, Vec4};

/// Quad corners in overlay space, counter-clockwise seen from the front
pub const QUAD_VERTICES: [[f32; 3]; 4] = [
    [-1.0, -1.0, 0.0],
    [1.0, -1.0, 0.0],
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
];

/// Two triangles over [`QUAD_VERTICES`]
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

pub const QUAD_COLOR: [f32; 3] = [0.5, 0.8, 0.5];

/// Where the label text starts, in overlay space
pub const LABEL_ANCHOR: Vec3 = Vec3::new(-0.5, 0.0, 0.01);

pub const LABEL_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Overlay origin in view space
pub const OVERLAY_POSITION: Vec3 = Vec3::new(0.0, 0.0, -5.0);

pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.0;

/// Overlay placement for one phase value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayPose {
    /// Unwrapped phase the pose was built from
    pub phase_degrees: f64,
    /// Rotation about Y, in `[0, 360)`
    pub angle_degrees: f32,
    /// Overlay space to view space
    pub model: Mat4,
}

impl OverlayPose {
    /// Pose for `phase` degrees of rotation. Depends on nothing else.
    pub fn at_phase(phase: f64) -> Self {
        let angle_degrees = phase.rem_euclid(360.0) as f32;
        let model = Mat4::from_translation(OVERLAY_POSITION)
            * Mat4::from_rotation_y(angle_degrees.to_radians());

        Self {
            phase_degrees: phase,
            angle_degrees,
            model,
        }
    }

    /// Overlay space to clip space for a viewport of the given aspect ratio
    pub fn mvp(&self, aspect: f32) -> Mat4 {
        projection(aspect) * self.model
    }

    /// Label anchor in window pixels (origin top-left), `None` when it falls
    /// behind the camera
    pub fn label_screen_position(&self, width: f32, height: f32) -> Option<(f32, f32)> {
        let clip = self.mvp(width / height.max(1.0)) * Vec4::from((LABEL_ANCHOR, 1.0));
        if clip.w <= f32::EPSILON {
            return None;
        }

        let ndc = clip.truncate() / clip.w;
        Some(((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height))
    }
}

/// Perspective projection with a 45 degree vertical field of view and a
/// 0..1 depth range
pub fn projection(aspect: f32) -> Mat4 {
    Mat4::perspective_rh(
        FIELD_OF_VIEW_DEGREES.to_radians(),
        aspect.max(1e-3),
        Z_NEAR,
        Z_FAR,
    )
}
