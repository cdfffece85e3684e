// gesture.rs - pointer / touch / wheel input turned into camera moves
//
// Touch drives an explicit Idle → Panning → Pinching machine. The mouse path
// runs beside it and is shut off for as long as any finger is down, so
// platform-synthesized mouse events never drive the camera twice.

use crate::camera::CameraState;
use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Contacts closer than this cannot give a stable distance or angle.
const MIN_PINCH_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSettings {
    /// Fraction of the zoom changed per wheel step.
    pub zoom_speed: f32,
    /// Radians per pixel for modifier-drag rotation.
    pub rotate_speed: f32,
    /// Multiplier on the change of the two-finger angle.
    pub pinch_rotate_gain: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            zoom_speed: 0.1,
            rotate_speed: 0.01,
            pinch_rotate_gain: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanSession {
    start_pan: Vec2,
    start_pointer: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchSession {
    start_pan: Vec2,
    start_zoom: f32,
    start_distance: f32,
    start_midpoint: Vec2,
    start_angle: f32,
    last_midpoint: Vec2,
    last_angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Panning(PanSession),
    Pinching(PinchSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    None,
    Pan,
    Pinch,
}

impl GestureMode {
    fn for_contacts(count: usize) -> Self {
        match count {
            0 => GestureMode::None,
            1 => GestureMode::Pan,
            _ => GestureMode::Pinch,
        }
    }
}

impl GestureState {
    pub fn mode(&self) -> GestureMode {
        match self {
            GestureState::Idle => GestureMode::None,
            GestureState::Panning(_) => GestureMode::Pan,
            GestureState::Pinching(_) => GestureMode::Pinch,
        }
    }
}

#[derive(Debug, Default)]
pub struct GestureController {
    settings: GestureSettings,
    state: GestureState,
    touch_active: bool,
    mouse_last: Option<Vec2>,
}

impl GestureController {
    pub fn new(settings: GestureSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn touch_active(&self) -> bool {
        self.touch_active
    }

    // ---- touch ----

    /// A contact went down. `contacts` holds every active contact, oldest first.
    pub fn touch_start(&mut self, contacts: &[Vec2], camera: &mut CameraState) {
        if contacts.is_empty() {
            return;
        }
        self.touch_active = true;
        self.mouse_last = None;
        self.rebaseline(contacts, camera);
    }

    pub fn touch_move(&mut self, contacts: &[Vec2], camera: &mut CameraState) {
        if contacts.is_empty() {
            return;
        }
        if !self.touch_active || GestureMode::for_contacts(contacts.len()) != self.state.mode() {
            // Missed a start/end event; pick up from where the camera is now.
            self.touch_active = true;
            self.rebaseline(contacts, camera);
            return;
        }

        match &mut self.state {
            GestureState::Idle => {}
            GestureState::Panning(session) => {
                let delta = contacts[0] - session.start_pointer;
                camera.set_pan(session.start_pan);
                let sensitivity = 1.0 / camera.zoom();
                camera.pan_by_screen_delta(delta, sensitivity);
            }
            GestureState::Pinching(session) => {
                update_pinch(session, contacts[0], contacts[1], camera, &self.settings);
            }
        }
    }

    /// A contact lifted. `contacts` holds the ones still down.
    pub fn touch_end(&mut self, contacts: &[Vec2], camera: &mut CameraState) {
        if contacts.is_empty() {
            if self.touch_active {
                self.log_leaving(GestureMode::None);
            }
            self.state = GestureState::Idle;
            self.touch_active = false;
            return;
        }
        self.rebaseline(contacts, camera);
    }

    /// Starts a fresh session for the current contact count from the camera
    /// as it is now, so switching gestures never makes the map jump.
    fn rebaseline(&mut self, contacts: &[Vec2], camera: &CameraState) {
        let next = match contacts {
            [] => GestureState::Idle,
            [only] => GestureState::Panning(PanSession {
                start_pan: camera.pan(),
                start_pointer: *only,
            }),
            [a, b, ..] => GestureState::Pinching(PinchSession::at(*a, *b, camera)),
        };
        if next.mode() != self.state.mode() {
            self.log_leaving(next.mode());
        }
        self.state = next;
    }

    fn log_leaving(&self, next: GestureMode) {
        if let GestureState::Pinching(session) = &self.state {
            log::debug!(
                "pinch ended: twist {:.3} rad, midpoint drift {:?}",
                session.twist(),
                session.drift()
            );
        }
        log::debug!("gesture {:?} -> {:?}", self.state.mode(), next);
    }

    // ---- mouse ----

    pub fn pointer_down(&mut self, position: Vec2) {
        if self.touch_active {
            return;
        }
        self.mouse_last = Some(position);
    }

    /// Plain drag pans; drag with the rotate modifier held orbits the camera.
    pub fn pointer_move(&mut self, position: Vec2, rotate_modifier: bool, camera: &mut CameraState) {
        if self.touch_active {
            return;
        }
        let Some(last) = self.mouse_last else {
            return;
        };
        let delta = position - last;
        self.mouse_last = Some(position);

        if rotate_modifier {
            let k = self.settings.rotate_speed;
            camera.set_yaw(camera.yaw() - delta.x * k);
            camera.set_pitch(camera.pitch() - delta.y * k);
        } else {
            let sensitivity = 1.0 / camera.zoom();
            camera.pan_by_screen_delta(delta, sensitivity);
        }
    }

    pub fn pointer_up(&mut self) {
        self.mouse_last = None;
    }

    /// Zooms toward or away from `pointer`. A positive `delta` zooms out.
    pub fn wheel(&mut self, delta: f32, pointer: Vec2, viewport: Vec2, camera: &mut CameraState) {
        if self.touch_active || delta == 0.0 || !delta.is_finite() {
            return;
        }
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return;
        }

        let old_zoom = camera.zoom();
        camera.set_zoom(old_zoom * (1.0 - delta.signum() * self.settings.zoom_speed));
        let new_zoom = camera.zoom();
        let zoom_delta = new_zoom - old_zoom;
        if zoom_delta == 0.0 {
            return;
        }

        // Keep the point under the cursor roughly in place; the correction is
        // damped as the zoom grows.
        let normalized = (pointer - viewport * 0.5) / viewport;
        let smoothing = 1.0 / new_zoom.powf(1.5);
        let correction = -normalized * viewport * zoom_delta * smoothing;
        camera.pan_by_screen_delta(correction, 1.0);
    }
}

impl PinchSession {
    fn at(a: Vec2, b: Vec2, camera: &CameraState) -> Self {
        let midpoint = (a + b) * 0.5;
        let angle = contact_angle(a, b);
        Self {
            start_pan: camera.pan(),
            start_zoom: camera.zoom(),
            start_distance: a.distance(b),
            start_midpoint: midpoint,
            start_angle: angle,
            last_midpoint: midpoint,
            last_angle: angle,
        }
    }

    /// Total turn of the contact pair since the session started.
    pub fn twist(&self) -> f32 {
        wrap_angle(self.last_angle - self.start_angle)
    }

    pub fn drift(&self) -> Vec2 {
        self.last_midpoint - self.start_midpoint
    }
}

fn update_pinch(
    session: &mut PinchSession,
    a: Vec2,
    b: Vec2,
    camera: &mut CameraState,
    settings: &GestureSettings,
) {
    let distance = a.distance(b);
    let midpoint = (a + b) * 0.5;
    let angle = contact_angle(a, b);

    if session.start_distance < MIN_PINCH_DISTANCE {
        // Fingers started on top of each other; wait until they separate and
        // measure from there.
        if distance >= MIN_PINCH_DISTANCE {
            session.start_distance = distance;
            session.start_zoom = camera.zoom();
            session.start_angle = angle;
            session.last_angle = angle;
        }
    } else {
        camera.set_zoom(session.start_zoom * (distance / session.start_distance));

        let turn = wrap_angle(angle - session.last_angle);
        camera.set_yaw(camera.yaw() + turn * settings.pinch_rotate_gain);
        session.last_angle = angle;
    }

    camera.set_pan(session.start_pan);
    let sensitivity = 1.0 / camera.zoom();
    camera.pan_by_screen_delta(midpoint - session.start_midpoint, sensitivity);
    session.last_midpoint = midpoint;
}

fn contact_angle(a: Vec2, b: Vec2) -> f32 {
    let d = b - a;
    d.y.atan2(d.x)
}

/// Maps an angle difference into (-π, π] so atan2 wrap-around is not read as
/// a full turn.
fn wrap_angle(mut a: f32) -> f32 {
    while a > PI {
        a -= TAU;
    }
    while a <= -PI {
        a += TAU;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{ZoomRange, PITCH_MAX, PITCH_MIN};

    const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

    fn setup() -> (GestureController, CameraState) {
        (GestureController::default(), CameraState::default())
    }

    fn assert_close(a: Vec2, b: Vec2) {
        assert!((a - b).length() < 1e-3, "{a:?} != {b:?}");
    }

    #[test]
    fn single_contact_drag_pans() {
        let (mut g, mut cam) = setup();
        g.touch_start(&[Vec2::new(100.0, 100.0)], &mut cam);
        g.touch_move(&[Vec2::new(120.0, 90.0)], &mut cam);
        assert_close(cam.pan(), Vec2::new(20.0, 10.0));
        assert!(matches!(g.state(), GestureState::Panning(_)));

        g.touch_end(&[], &mut cam);
        assert_eq!(*g.state(), GestureState::Idle);
        assert!(!g.touch_active());
    }

    #[test]
    fn pan_there_and_back_restores_offset() {
        for yaw in [0.0, 0.4, 2.0, -3.1] {
            let (mut g, mut cam) = setup();
            cam.set_yaw(yaw);
            cam.set_zoom(1.7);
            cam.set_pan(Vec2::new(5.0, -8.0));

            g.touch_start(&[Vec2::new(50.0, 50.0)], &mut cam);
            g.touch_move(&[Vec2::new(130.0, 20.0)], &mut cam);
            g.touch_end(&[], &mut cam);
            g.touch_start(&[Vec2::new(130.0, 20.0)], &mut cam);
            g.touch_move(&[Vec2::new(50.0, 50.0)], &mut cam);
            g.touch_end(&[], &mut cam);
            assert_close(cam.pan(), Vec2::new(5.0, -8.0));

            g.pointer_down(Vec2::new(10.0, 10.0));
            g.pointer_move(Vec2::new(70.0, -15.0), false, &mut cam);
            g.pointer_move(Vec2::new(10.0, 10.0), false, &mut cam);
            g.pointer_up();
            assert_close(cam.pan(), Vec2::new(5.0, -8.0));
        }
    }

    #[test]
    fn pinch_scales_zoom_by_distance_ratio() {
        let (mut g, mut cam) = setup();
        g.touch_start(&[Vec2::new(0.0, 0.0)], &mut cam);
        g.touch_start(&[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)], &mut cam);
        assert!(matches!(g.state(), GestureState::Pinching(_)));

        g.touch_move(&[Vec2::new(-25.0, 0.0), Vec2::new(125.0, 0.0)], &mut cam);
        assert!((cam.zoom() - 1.5).abs() < 1e-5);
        // Midpoint and angle unchanged: no pan, no turn.
        assert_close(cam.pan(), Vec2::ZERO);
        assert_eq!(cam.yaw(), 0.0);
    }

    #[test]
    fn pinch_zoom_is_clamped() {
        let (mut g, mut cam) = setup();
        g.touch_start(&[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)], &mut cam);
        g.touch_move(&[Vec2::new(0.0, 0.0), Vec2::new(1000.0, 0.0)], &mut cam);
        assert_eq!(cam.zoom(), ZoomRange::default().max);
        g.touch_move(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)], &mut cam);
        assert_eq!(cam.zoom(), ZoomRange::default().min);
    }

    #[test]
    fn pinch_twist_turns_yaw_with_gain() {
        let (mut g, mut cam) = setup();
        g.touch_start(&[Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0)], &mut cam);
        // Rotate the pair a quarter turn about its midpoint.
        g.touch_move(&[Vec2::new(0.0, -50.0), Vec2::new(0.0, 50.0)], &mut cam);
        assert!((cam.yaw() - FRAC_PI_2_GAIN).abs() < 1e-4);
        assert!((cam.zoom() - 1.0).abs() < 1e-5);
        let GestureState::Pinching(session) = g.state() else {
            panic!("expected pinch, got {:?}", g.state());
        };
        assert!((session.twist() - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
        assert_eq!(session.drift(), Vec2::ZERO);
    }

    const FRAC_PI_2_GAIN: f32 = std::f32::consts::FRAC_PI_2 * 1.2;

    #[test]
    fn twist_across_the_atan2_seam_is_small() {
        let (mut g, mut cam) = setup();
        // Angle just under +π, then just over -π.
        g.touch_start(&[Vec2::new(50.0, -1.0), Vec2::new(-50.0, 1.0)], &mut cam);
        g.touch_move(&[Vec2::new(50.0, 1.0), Vec2::new(-50.0, -1.0)], &mut cam);
        assert!(cam.yaw().abs() < 0.1);
    }

    #[test]
    fn pinch_after_pan_with_coincident_contacts_does_not_jump() {
        let (mut g, mut cam) = setup();
        g.touch_start(&[Vec2::new(100.0, 100.0)], &mut cam);
        g.touch_move(&[Vec2::new(160.0, 130.0)], &mut cam);
        let pan = cam.pan();
        let zoom = cam.zoom();

        let here = Vec2::new(160.0, 130.0);
        g.touch_start(&[here, here], &mut cam);
        g.touch_move(&[here, here], &mut cam);
        assert_close(cam.pan(), pan);
        assert_eq!(cam.zoom(), zoom);
        assert_eq!(cam.yaw(), 0.0);

        // Separating symmetrically measures zoom from the first usable spread.
        g.touch_move(&[here - Vec2::new(20.0, 0.0), here + Vec2::new(20.0, 0.0)], &mut cam);
        assert_eq!(cam.zoom(), zoom);
        g.touch_move(&[here - Vec2::new(40.0, 0.0), here + Vec2::new(40.0, 0.0)], &mut cam);
        assert!((cam.zoom() - 2.0 * zoom).abs() < 1e-4);
        assert_close(cam.pan(), pan);
    }

    #[test]
    fn lifting_one_finger_continues_as_pan_without_jump() {
        let (mut g, mut cam) = setup();
        g.touch_start(&[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)], &mut cam);
        g.touch_move(&[Vec2::new(10.0, 10.0), Vec2::new(160.0, 10.0)], &mut cam);
        let pan = cam.pan();
        let zoom = cam.zoom();

        g.touch_end(&[Vec2::new(160.0, 10.0)], &mut cam);
        assert!(matches!(g.state(), GestureState::Panning(_)));
        g.touch_move(&[Vec2::new(160.0, 10.0)], &mut cam);
        assert_close(cam.pan(), pan);
        assert_eq!(cam.zoom(), zoom);

        g.touch_move(&[Vec2::new(160.0 + 15.0 * zoom, 10.0)], &mut cam);
        assert_close(cam.pan(), pan + Vec2::new(15.0, 0.0));
    }

    #[test]
    fn empty_events_are_ignored() {
        let (mut g, mut cam) = setup();
        let before = cam.clone();
        g.touch_move(&[], &mut cam);
        g.touch_start(&[], &mut cam);
        assert_eq!(cam, before);
        assert_eq!(*g.state(), GestureState::Idle);
        assert!(!g.touch_active());

        g.wheel(0.0, Vec2::ZERO, VIEWPORT, &mut cam);
        g.wheel(f32::NAN, Vec2::ZERO, VIEWPORT, &mut cam);
        g.pointer_move(Vec2::new(50.0, 50.0), false, &mut cam);
        assert_eq!(cam, before);
    }

    #[test]
    fn mouse_is_ignored_while_touching() {
        let (mut g, mut cam) = setup();
        g.touch_start(&[Vec2::new(10.0, 10.0)], &mut cam);
        let before = cam.clone();

        g.pointer_down(Vec2::new(10.0, 10.0));
        g.pointer_move(Vec2::new(90.0, 90.0), false, &mut cam);
        g.wheel(-1.0, Vec2::new(400.0, 300.0), VIEWPORT, &mut cam);
        assert_eq!(cam, before);

        g.touch_end(&[], &mut cam);
        g.pointer_down(Vec2::new(10.0, 10.0));
        g.pointer_move(Vec2::new(30.0, 10.0), false, &mut cam);
        assert_close(cam.pan(), Vec2::new(20.0, 0.0));
    }

    #[test]
    fn modifier_drag_rotates_and_clamps_pitch() {
        let (mut g, mut cam) = setup();
        g.pointer_down(Vec2::ZERO);
        g.pointer_move(Vec2::new(10.0, 0.0), true, &mut cam);
        assert!((cam.yaw() + 0.1).abs() < 1e-6);
        assert_eq!(cam.pan(), Vec2::ZERO);

        for i in 1..50 {
            g.pointer_move(Vec2::new(10.0, -500.0 * i as f32), true, &mut cam);
            assert!(cam.pitch() >= PITCH_MIN && cam.pitch() <= PITCH_MAX);
        }
        assert_eq!(cam.pitch(), PITCH_MAX);

        for i in 1..50 {
            g.pointer_move(Vec2::new(10.0, 500.0 * i as f32), true, &mut cam);
            assert!(cam.pitch() >= PITCH_MIN && cam.pitch() <= PITCH_MAX);
        }
        assert_eq!(cam.pitch(), PITCH_MIN);
    }

    #[test]
    fn wheel_zoom_stays_in_range() {
        let (mut g, mut cam) = setup();
        let center = VIEWPORT * 0.5;
        for _ in 0..200 {
            g.wheel(-1.0, center, VIEWPORT, &mut cam);
            assert!(cam.zoom() <= ZoomRange::default().max);
        }
        assert_eq!(cam.zoom(), ZoomRange::default().max);
        for _ in 0..200 {
            g.wheel(3.0, center, VIEWPORT, &mut cam);
            assert!(cam.zoom() >= ZoomRange::default().min);
        }
        assert_eq!(cam.zoom(), ZoomRange::default().min);
        // Centred zooming never pans.
        assert_eq!(cam.pan(), Vec2::ZERO);
    }

    #[test]
    fn wheel_zoom_pulls_toward_the_cursor() {
        let (mut g, mut cam) = setup();
        g.wheel(-1.0, Vec2::new(600.0, 300.0), VIEWPORT, &mut cam);
        assert!((cam.zoom() - 1.1).abs() < 1e-6);
        // Cursor right of centre: content shifts left so that spot stays put.
        assert!(cam.pan().x < 0.0);
        assert!(cam.pan().y.abs() < 1e-6);
        // Close to the exact correction 200 * (1/1.1 - 1).
        assert!((cam.pan().x - 200.0 * (1.0 / 1.1 - 1.0)).abs() < 3.0);
    }
}
