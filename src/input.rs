// input.rs - winit window events routed into the gesture controller

use crate::camera::CameraState;
use crate::gesture::GestureController;
use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

/// Trackpad pixels per wheel line.
const PIXELS_PER_LINE: f32 = 20.0;

/// Active touch contacts in the order they went down.
#[derive(Debug, Default)]
pub struct TouchTracker {
    contacts: Vec<(u64, Vec2)>,
}

impl TouchTracker {
    pub fn begin(&mut self, id: u64, position: Vec2) {
        match self.contacts.iter_mut().find(|(cid, _)| *cid == id) {
            Some(entry) => entry.1 = position,
            None => self.contacts.push((id, position)),
        }
    }

    /// Returns false for a contact that was never seen going down.
    pub fn update(&mut self, id: u64, position: Vec2) -> bool {
        match self.contacts.iter_mut().find(|(cid, _)| *cid == id) {
            Some(entry) => {
                entry.1 = position;
                true
            }
            None => false,
        }
    }

    pub fn end(&mut self, id: u64) {
        self.contacts.retain(|(cid, _)| *cid != id);
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.contacts.iter().map(|(_, p)| *p).collect()
    }
}

#[derive(Debug, Default)]
pub struct InputRouter {
    touches: TouchTracker,
    cursor: Vec2,
    rotate_held: bool,
    /// Trackpad scroll not yet worth a whole zoom step, in lines.
    pending_scroll: f32,
}

impl InputRouter {
    /// Feeds one window event to the controller. Returns true when the event
    /// was pointer input for the map.
    pub fn handle(
        &mut self,
        event: &WindowEvent<'_>,
        gestures: &mut GestureController,
        camera: &mut CameraState,
        viewport: Vec2,
    ) -> bool {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.rotate_held = modifiers.shift();
                false
            }
            WindowEvent::Touch(touch) => {
                let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                self.touch(touch.id, touch.phase, position, gestures, camera);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                gestures.pointer_move(self.cursor, self.rotate_held, camera);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                gestures.pointer_up();
                false
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                match state {
                    ElementState::Pressed => gestures.pointer_down(self.cursor),
                    ElementState::Released => gestures.pointer_up(),
                }
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = self.scroll_steps(delta);
                for _ in 0..steps.unsigned_abs() {
                    gestures.wheel(steps.signum() as f32, self.cursor, viewport, camera);
                }
                true
            }
            _ => false,
        }
    }

    /// Called for events the UI consumed. Releases still reach the map so no
    /// contact or drag outlives the finger or button that started it.
    pub fn handle_consumed(
        &mut self,
        event: &WindowEvent<'_>,
        gestures: &mut GestureController,
        camera: &mut CameraState,
    ) {
        match event {
            WindowEvent::Touch(touch) if matches!(touch.phase, TouchPhase::Ended | TouchPhase::Cancelled) => {
                let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                self.touch(touch.id, touch.phase, position, gestures, camera);
            }
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => gestures.pointer_up(),
            _ => {}
        }
    }

    fn touch(
        &mut self,
        id: u64,
        phase: TouchPhase,
        position: Vec2,
        gestures: &mut GestureController,
        camera: &mut CameraState,
    ) {
        match phase {
            TouchPhase::Started => {
                self.touches.begin(id, position);
                gestures.touch_start(&self.touches.positions(), camera);
            }
            TouchPhase::Moved => {
                if self.touches.update(id, position) {
                    gestures.touch_move(&self.touches.positions(), camera);
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.end(id);
                gestures.touch_end(&self.touches.positions(), camera);
            }
        }
    }

    /// Whole zoom steps for one wheel event; positive zooms out. A mouse
    /// notch is one step whatever its size, trackpad pixels add up until
    /// they make a line.
    fn scroll_steps(&mut self, delta: &MouseScrollDelta) -> i32 {
        // winit reports scrolling away from the user as positive.
        match delta {
            MouseScrollDelta::LineDelta(_, y) => {
                self.pending_scroll = 0.0;
                if *y == 0.0 || !y.is_finite() {
                    0
                } else {
                    -y.signum() as i32
                }
            }
            MouseScrollDelta::PixelDelta(pos) => {
                let lines = -(pos.y as f32) / PIXELS_PER_LINE;
                if !lines.is_finite() {
                    return 0;
                }
                self.pending_scroll += lines;
                let whole = self.pending_scroll.trunc();
                self.pending_scroll -= whole;
                whole as i32
            }
        }
    }
}
