// viewer.rs - everything the UI and the render tick share about the map view

use crate::camera::{CameraState, Lens};
use crate::config::Settings;
use crate::gesture::GestureController;
use crate::input::InputRouter;
use crate::labels::{visibility_pass, FrameView, Label, LabelPlacement};

pub struct MapViewer {
    pub camera: CameraState,
    pub gestures: GestureController,
    pub input: InputRouter,
    pub labels: Vec<Label>,
    /// Output of this frame's visibility pass, parallel to `labels`.
    pub placements: Vec<LabelPlacement>,
    pub fov_deg: f32,
    pub show_labels: bool,
    pub is_fullscreen: bool,
}

impl MapViewer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            camera: CameraState::new(settings.zoom_range()),
            gestures: GestureController::new(settings.gestures()),
            input: InputRouter::default(),
            labels: Vec::new(),
            placements: Vec::new(),
            fov_deg: settings.fov_deg,
            show_labels: settings.show_labels,
            is_fullscreen: false,
        }
    }

    pub fn lens(&self, width: u32, height: u32) -> Lens {
        Lens {
            fov_y: self.fov_deg.to_radians(),
            width: width as f32,
            height: height as f32,
        }
    }

    /// Snapshot of the camera for this frame. Built once per tick; gestures
    /// arriving later only show up in the next one.
    pub fn frame_view(&self, lens: &Lens) -> FrameView {
        FrameView {
            projection: lens.projection_matrix(),
            view: self.camera.view_matrix(lens.eye_distance()),
            width: lens.width,
            height: lens.height,
            zoom: self.camera.zoom(),
        }
    }

    pub fn update_labels(&mut self, frame: &FrameView) {
        visibility_pass(&self.labels, frame, &mut self.placements);
    }

    pub fn visible_label_count(&self) -> usize {
        if !self.show_labels {
            return 0;
        }
        self.placements.iter().filter(|p| p.visible).count()
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset();
    }
}
