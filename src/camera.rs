// camera.rs - orbit camera over the map plane and the matrices built from it

use crate::matrix::Mat4Array;
use glam::{Mat4, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

/// Straight down onto the map.
pub const PITCH_MIN: f32 = FRAC_PI_2;
/// Shallowest allowed tilt (144°).
pub const PITCH_MAX: f32 = PI / 1.25;

/// Depth remap from GL clip space (z in -w..w) to wgpu (z in 0..w).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f32,
    pub max: f32,
}

impl ZoomRange {
    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { min: 0.2, max: 8.0 }
    }
}

/// The five camera scalars. Every write goes through a setter that keeps
/// zoom and pitch inside their ranges; yaw and pan are free.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    zoom: f32,
    pan_x: f32,
    pan_z: f32,
    pitch: f32,
    yaw: f32,
    zoom_range: ZoomRange,
}

impl CameraState {
    pub fn new(zoom_range: ZoomRange) -> Self {
        Self {
            zoom: zoom_range.clamp(1.0),
            pan_x: 0.0,
            pan_z: 0.0,
            pitch: PITCH_MIN,
            yaw: 0.0,
            zoom_range,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Vec2 {
        Vec2::new(self.pan_x, self.pan_z)
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Non-finite input leaves the zoom unchanged.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = self.zoom_range.clamp(zoom);
        }
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        if pitch.is_finite() {
            self.pitch = pitch.clamp(PITCH_MIN, PITCH_MAX);
        }
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        if yaw.is_finite() {
            self.yaw = yaw;
        }
    }

    pub fn set_pan(&mut self, pan: Vec2) {
        if pan.is_finite() {
            self.pan_x = pan.x;
            self.pan_z = pan.y;
        }
    }

    /// Moves the map by a screen-space delta, rotated by the current yaw so
    /// the drag follows the way the camera faces.
    pub fn pan_by_screen_delta(&mut self, delta: Vec2, sensitivity: f32) {
        let (sin, cos) = self.yaw.sin_cos();
        let dx = (delta.y * sin + delta.x * cos) * sensitivity;
        let dz = (delta.y * cos - delta.x * sin) * sensitivity;
        self.set_pan(Vec2::new(self.pan_x + dx, self.pan_z - dz));
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.zoom_range);
    }

    /// Model-view transform for this frame.
    ///
    /// World coordinates follow the map data: x east, z along the map's
    /// vertical axis, y growing downward (building tops have negative y).
    pub fn view_matrix(&self, eye_distance: f32) -> Mat4Array {
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -eye_distance))
            * Mat4::from_rotation_x(-self.pitch)
            * Mat4::from_rotation_y(self.yaw)
            * Mat4::from_scale(Vec3::splat(self.zoom))
            * Mat4::from_translation(Vec3::new(self.pan_x, 0.0, self.pan_z));
        view.to_cols_array()
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(ZoomRange::default())
    }
}

/// Perspective frame shared by the renderer and the label pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lens {
    pub fov_y: f32,
    pub width: f32,
    pub height: f32,
}

impl Lens {
    /// Distance at which one world unit spans one pixel at zoom 1, so a drag
    /// of n pixels pans n / zoom units.
    pub fn eye_distance(&self) -> f32 {
        (self.height.max(1.0) * 0.5) / (self.fov_y * 0.5).tan()
    }

    /// GL-convention projection (NDC depth in -1..1).
    pub fn projection_matrix(&self) -> Mat4Array {
        let eye = self.eye_distance();
        let aspect = self.width.max(1.0) / self.height.max(1.0);
        Mat4::perspective_rh_gl(self.fov_y, aspect, eye / 10.0, eye * 10.0).to_cols_array()
    }
}
