// projector.rs - world space to pixel space for the overlay layer

use crate::matrix::{mult_mat4, Mat4Array};
use glam::{Mat4, Vec3, Vec4};

/// Below this the perspective divide is treated as degenerate.
const MIN_W: f32 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    /// Pixels from the left edge.
    pub x: f32,
    /// Pixels from the top edge.
    pub y: f32,
    /// Raw NDC depth, roughly -1..1 inside the clip volume.
    pub depth: f32,
    pub valid: bool,
}

impl ScreenPoint {
    pub const INVALID: ScreenPoint = ScreenPoint {
        x: f32::NAN,
        y: f32::NAN,
        depth: f32::INFINITY,
        valid: false,
    };
}

/// Projects `world` through `projection · view` onto a `width` x `height` viewport.
///
/// Points at or behind the camera plane (w ≈ 0 or non-finite) come back as
/// [`ScreenPoint::INVALID`]. Nothing here can fail: depth outside the near/far
/// range is reported as is and left for the caller to judge.
pub fn project(
    world: Vec3,
    projection: &Mat4Array,
    view: &Mat4Array,
    width: f32,
    height: f32,
) -> ScreenPoint {
    let mvp = Mat4::from_cols_array(&mult_mat4(projection, view));
    let clip: Vec4 = mvp * world.extend(1.0);

    if !clip.w.is_finite() || clip.w.abs() < MIN_W {
        return ScreenPoint::INVALID;
    }

    let ndc = clip.truncate() / clip.w;

    ScreenPoint {
        x: (ndc.x * 0.5 + 0.5) * width,
        y: (-ndc.y * 0.5 + 0.5) * height,
        depth: ndc.z,
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::IDENTITY;

    #[test]
    fn origin_maps_to_viewport_center() {
        let p = project(Vec3::ZERO, &IDENTITY, &IDENTITY, 800.0, 600.0);
        assert!(p.valid);
        assert_eq!((p.x, p.y), (400.0, 300.0));
        assert_eq!(p.depth, 0.0);
    }

    #[test]
    fn positive_x_lands_right_and_positive_y_lands_up() {
        let right = project(Vec3::new(1.0, 0.0, 0.0), &IDENTITY, &IDENTITY, 800.0, 600.0);
        assert!(right.x > 400.0);
        assert_eq!(right.y, 300.0);

        let up = project(Vec3::new(0.0, 0.5, 0.0), &IDENTITY, &IDENTITY, 800.0, 600.0);
        assert!(up.y < 300.0);
    }

    #[test]
    fn zero_w_is_invalid_with_infinite_depth() {
        // Projection that copies -z into w; a point on the z = 0 plane has w = 0.
        let proj = Mat4::perspective_rh_gl(1.0, 1.0, 0.1, 100.0).to_cols_array();
        let p = project(Vec3::new(3.0, -2.0, 0.0), &proj, &IDENTITY, 640.0, 480.0);
        assert!(!p.valid);
        assert_eq!(p.depth, f32::INFINITY);
    }

    #[test]
    fn non_finite_w_is_invalid() {
        let mut proj = IDENTITY;
        proj[15] = f32::NAN;
        let p = project(Vec3::ZERO, &proj, &IDENTITY, 640.0, 480.0);
        assert!(!p.valid);
        assert!(p.depth.is_infinite());
    }

    #[test]
    fn far_outside_clip_range_still_returns_a_value() {
        let proj = Mat4::perspective_rh_gl(1.0, 1.0, 0.1, 100.0).to_cols_array();

        let beyond_far = project(Vec3::new(0.0, 0.0, -1.0e6), &proj, &IDENTITY, 640.0, 480.0);
        assert!(beyond_far.valid);
        assert!(beyond_far.depth > 1.0);

        let inside = project(Vec3::new(0.0, 0.0, -10.0), &proj, &IDENTITY, 640.0, 480.0);
        assert!(inside.depth > -1.0 && inside.depth < 1.0);
        assert!((inside.x - 320.0).abs() < 1e-3);
    }
}
