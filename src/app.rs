use std::time::{Duration, Instant};

use glam::{Mat4, Vec2, Vec3};
use log::debug;

use crate::camera::Camera;
use crate::config::PipelineStages;
use crate::input::{InputState, KeyCode, MouseTracker, Toggle};
use crate::lights::FrameLights;
use crate::scene::{DrawItem, Room};

/// Where the camera starts.
pub const CAMERA_START: Vec3 = Vec3::new(0.0, 1.0, 12.0);

pub const SPOTLIGHT_KEY: KeyCode = KeyCode::L;
pub const EFFECT_KEY: KeyCode = KeyCode::E;
pub const EXIT_KEY: KeyCode = KeyCode::Escape;

/// Full-screen effect applied by the composite pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostEffect {
    PassThrough,
    Grayscale,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub view: Mat4,
    pub projection: Mat4,
    pub lights: FrameLights,
    pub draws: Vec<DrawItem>,
    /// `None` when the post-process stage is disabled.
    pub effect: Option<PostEffect>,
}

/// Interactive state of the viewer, mutated only by the event loop.
#[derive(Debug)]
pub struct Viewer {
    pub camera: Camera,
    room: Room,
    stages: PipelineStages,
    input: InputState,
    mouse: MouseTracker,
    spotlight: Toggle,
    grayscale: Toggle,
    exit_requested: bool,
}

impl Viewer {
    pub fn new(stages: PipelineStages) -> Self {
        Self {
            camera: Camera::new(CAMERA_START),
            room: Room::dining_room(),
            stages,
            input: InputState::new(),
            mouse: MouseTracker::new(),
            spotlight: Toggle::default(),
            grayscale: Toggle::default(),
            exit_requested: false,
        }
    }

    pub fn stages(&self) -> PipelineStages {
        self.stages
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn spotlight_active(&self) -> bool {
        self.stages.spotlight && self.spotlight.is_active()
    }

    pub fn effect(&self) -> Option<PostEffect> {
        self.stages.post_process.then(|| {
            if self.grayscale.is_active() {
                PostEffect::Grayscale
            } else {
                PostEffect::PassThrough
            }
        })
    }

    pub fn key_event(&mut self, key: KeyCode, pressed: bool) {
        if !pressed {
            self.input.set_key_up(key);
            return;
        }
        if !self.input.set_key_down(key) {
            return;
        }
        match key {
            EXIT_KEY => self.exit_requested = true,
            SPOTLIGHT_KEY if self.stages.spotlight => {
                let on = self.spotlight.flip();
                debug!("spotlight {}", if on { "on" } else { "off" });
            }
            EFFECT_KEY if self.stages.post_process => {
                let on = self.grayscale.flip();
                debug!("grayscale {}", if on { "on" } else { "off" });
            }
            _ => {}
        }
    }

    /// Turns the camera by a raw pointer delta in device units.
    pub fn mouse_moved(&mut self, delta: Vec2) {
        if let Some(offset) = self.mouse.motion(delta) {
            self.camera.process_mouse_movement(offset.x, offset.y, true);
        }
    }

    pub fn scrolled(&mut self, y_offset: f32) {
        self.camera.process_mouse_scroll(y_offset);
    }

    /// Drops held keys and the mouse baseline, e.g. when focus is lost.
    pub fn reset_input(&mut self) {
        self.input.clear();
        self.mouse.reset();
    }

    /// Moves the camera for every held movement key.
    pub fn update(&mut self, delta: f32) {
        let delta = delta.max(0.0);
        let movements: Vec<_> = self.input.held_movements().collect();
        for movement in movements {
            self.camera.process_keyboard(movement, delta);
        }
    }

    /// Evaluates camera, lights and model matrices for `time` seconds.
    pub fn plan_frame(&self, time: f32, aspect: f32) -> FramePlan {
        FramePlan {
            view: self.camera.view_matrix(),
            projection: self.camera.projection(aspect),
            lights: FrameLights::compute(
                &self.room.bulbs,
                time,
                &self.camera,
                self.spotlight_active(),
            ),
            draws: self.room.draw_list(time),
            effect: self.effect(),
        }
    }
}

/// Frame timing relative to start-up.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    pub fn start(now: Instant) -> Self {
        Self {
            start: now,
            last: now,
        }
    }

    /// Returns `(delta, elapsed)` in seconds and advances the clock.
    pub fn tick(&mut self, now: Instant) -> (f32, f32) {
        let delta = now.saturating_duration_since(self.last);
        self.last = now;
        (
            delta.as_secs_f32(),
            now.saturating_duration_since(self.start).as_secs_f32(),
        )
    }

    pub fn elapsed(&self) -> Duration {
        self.last.saturating_duration_since(self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::DEFAULT_SPEED;
    use crate::lights::POINT_LIGHT_COUNT;

    fn press(viewer: &mut Viewer, key: KeyCode) {
        viewer.key_event(key, true);
        viewer.key_event(key, false);
    }

    #[test]
    fn holding_w_for_one_second() {
        let mut viewer = Viewer::new(PipelineStages::all());
        viewer.key_event(KeyCode::W, true);
        viewer.update(1.0);
        let expected = CAMERA_START + Vec3::NEG_Z * DEFAULT_SPEED;
        assert!((viewer.camera.position - expected).length() < 1e-5);
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut viewer = Viewer::new(PipelineStages::all());
        viewer.key_event(KeyCode::A, true);
        viewer.key_event(KeyCode::D, true);
        viewer.update(0.5);
        assert!((viewer.camera.position - CAMERA_START).length() < 1e-5);
    }

    #[test]
    fn negative_delta_does_not_move() {
        let mut viewer = Viewer::new(PipelineStages::all());
        viewer.key_event(KeyCode::W, true);
        viewer.update(-1.0);
        assert_eq!(viewer.camera.position, CAMERA_START);
    }

    #[test]
    fn spotlight_toggle_round_trips() {
        let mut viewer = Viewer::new(PipelineStages::all());
        let off = viewer.plan_frame(0.0, 1.0).lights.spot;
        press(&mut viewer, SPOTLIGHT_KEY);
        let on = viewer.plan_frame(0.0, 1.0).lights.spot;
        assert!(on.is_lit());
        press(&mut viewer, SPOTLIGHT_KEY);
        let again = viewer.plan_frame(0.0, 1.0).lights.spot;
        assert_eq!(again, off);
    }

    #[test]
    fn key_repeat_does_not_retoggle() {
        let mut viewer = Viewer::new(PipelineStages::all());
        viewer.key_event(SPOTLIGHT_KEY, true);
        viewer.key_event(SPOTLIGHT_KEY, true);
        viewer.key_event(SPOTLIGHT_KEY, true);
        assert!(viewer.spotlight_active());
    }

    #[test]
    fn spotlight_stays_dark_when_stage_disabled() {
        let mut viewer = Viewer::new(PipelineStages::minimal());
        press(&mut viewer, SPOTLIGHT_KEY);
        assert!(!viewer.spotlight_active());
        assert!(!viewer.plan_frame(0.0, 1.0).lights.spot.is_lit());
    }

    #[test]
    fn effect_toggle_requires_post_process() {
        let mut viewer = Viewer::new(PipelineStages::all());
        assert_eq!(viewer.effect(), Some(PostEffect::PassThrough));
        press(&mut viewer, EFFECT_KEY);
        assert_eq!(viewer.effect(), Some(PostEffect::Grayscale));

        let mut direct = Viewer::new(PipelineStages::direct());
        press(&mut direct, EFFECT_KEY);
        assert_eq!(direct.effect(), None);
    }

    #[test]
    fn escape_requests_exit() {
        let mut viewer = Viewer::new(PipelineStages::all());
        assert!(!viewer.exit_requested());
        viewer.key_event(EXIT_KEY, true);
        assert!(viewer.exit_requested());
    }

    #[test]
    fn first_motion_does_not_turn_camera() {
        let mut viewer = Viewer::new(PipelineStages::all());
        let front = viewer.camera.front();
        viewer.mouse_moved(Vec2::new(300.0, 20.0));
        assert_eq!(viewer.camera.front(), front);
        viewer.mouse_moved(Vec2::new(10.0, 0.0));
        assert!(viewer.camera.yaw() > crate::camera::DEFAULT_YAW);
    }

    #[test]
    fn long_drag_keeps_turning() {
        let mut viewer = Viewer::new(PipelineStages::all());
        let mut previous = viewer.camera.yaw();
        viewer.mouse_moved(Vec2::ZERO);
        // 2000 device units to the right, far wider than the window.
        for _ in 0..50 {
            viewer.mouse_moved(Vec2::new(40.0, 0.0));
            assert!(viewer.camera.yaw() > previous);
            previous = viewer.camera.yaw();
        }
        assert!((previous - (crate::camera::DEFAULT_YAW + 200.0)).abs() < 1e-3);
    }

    #[test]
    fn focus_loss_drops_next_motion() {
        let mut viewer = Viewer::new(PipelineStages::all());
        viewer.mouse_moved(Vec2::ZERO);
        viewer.mouse_moved(Vec2::new(10.0, 0.0));
        let yaw = viewer.camera.yaw();
        viewer.reset_input();
        viewer.mouse_moved(Vec2::new(500.0, 0.0));
        assert_eq!(viewer.camera.yaw(), yaw);
    }

    #[test]
    fn frame_plan_has_bulbs_and_lights() {
        let viewer = Viewer::new(PipelineStages::all());
        let plan = viewer.plan_frame(2.0, 800.0 / 600.0);
        assert_eq!(plan.lights.points.len(), POINT_LIGHT_COUNT);
        assert_eq!(plan.view, viewer.camera.view_matrix());
        assert_eq!(plan.lights.spot.position, viewer.camera.position);
        assert!(plan.draws.len() > POINT_LIGHT_COUNT);
    }

    #[test]
    fn clock_reports_delta_and_elapsed() {
        let start = Instant::now();
        let mut clock = FrameClock::start(start);
        let (delta, elapsed) = clock.tick(start + Duration::from_millis(250));
        assert!((delta - 0.25).abs() < 1e-6);
        assert!((elapsed - 0.25).abs() < 1e-6);
        let (delta, elapsed) = clock.tick(start + Duration::from_millis(300));
        assert!((delta - 0.05).abs() < 1e-6);
        assert!((elapsed - 0.3).abs() < 1e-6);
        assert_eq!(clock.elapsed(), Duration::from_millis(300));
    }
}
