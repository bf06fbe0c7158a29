use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::camera::Movement;

/// Keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    W,
    A,
    S,
    D,
    L,
    E,
    Escape,
}

impl KeyCode {
    /// Camera translation bound to this key, if any.
    pub fn movement(self) -> Option<Movement> {
        match self {
            Self::W => Some(Movement::Forward),
            Self::S => Some(Movement::Backward),
            Self::A => Some(Movement::Left),
            Self::D => Some(Movement::Right),
            _ => None,
        }
    }
}

/// Keys currently held down.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a press and reports whether the key was previously up.
    ///
    /// Auto-repeat delivers further presses without a release in between;
    /// those return `false`.
    pub fn set_key_down(&mut self, key: KeyCode) -> bool {
        self.keys.insert(key)
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// Held movement keys in W, S, A, D order.
    pub fn held_movements(&self) -> impl Iterator<Item = Movement> + '_ {
        [KeyCode::W, KeyCode::S, KeyCode::A, KeyCode::D]
            .into_iter()
            .filter(|key| self.is_key_down(*key))
            .filter_map(KeyCode::movement)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

/// Turns raw pointer motion into look offsets.
///
/// The first motion after activation is dropped, so grabbing the cursor
/// never produces a jump.
#[derive(Debug, Default, Clone, Copy)]
pub struct MouseTracker {
    primed: bool,
}

impl MouseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a device delta to `(dx, dy)` with `dy` positive when moving up.
    pub fn motion(&mut self, delta: Vec2) -> Option<Vec2> {
        if !std::mem::replace(&mut self.primed, true) {
            return None;
        }
        Some(Vec2::new(delta.x, -delta.y))
    }

    /// Drops the next motion again.
    pub fn reset(&mut self) {
        self.primed = false;
    }
}

/// Boolean flag flipped by a key press.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    active: bool,
}

impl Toggle {
    pub fn flip(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    pub fn is_active(self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_tracks_keys() {
        let mut state = InputState::new();
        state.set_key_down(KeyCode::Escape);
        assert!(state.is_key_down(KeyCode::Escape));
        state.set_key_up(KeyCode::Escape);
        assert!(!state.is_key_down(KeyCode::Escape));
    }

    #[test]
    fn repeated_press_is_not_an_edge() {
        let mut state = InputState::new();
        let key = KeyCode::L;
        assert!(state.set_key_down(key));
        assert!(!state.set_key_down(key));
        state.set_key_up(key);
        assert!(state.set_key_down(key));
    }

    #[test]
    fn held_movements_follow_wsad_order() {
        let mut state = InputState::new();
        state.set_key_down(KeyCode::D);
        state.set_key_down(KeyCode::W);
        state.set_key_down(KeyCode::L);
        let held: Vec<_> = state.held_movements().collect();
        assert_eq!(held, vec![Movement::Forward, Movement::Right]);
    }

    #[test]
    fn first_motion_after_reset_is_dropped() {
        let mut mouse = MouseTracker::new();
        assert_eq!(mouse.motion(Vec2::new(40.0, 5.0)), None);
        assert_eq!(
            mouse.motion(Vec2::new(10.0, -10.0)),
            Some(Vec2::new(10.0, 10.0))
        );
        mouse.reset();
        assert_eq!(mouse.motion(Vec2::new(3.0, 0.0)), None);
        assert_eq!(mouse.motion(Vec2::new(3.0, 0.0)), Some(Vec2::new(3.0, 0.0)));
    }

    #[test]
    fn toggle_flips() {
        let mut toggle = Toggle::default();
        assert!(toggle.flip());
        assert!(!toggle.flip());
        assert!(!toggle.is_active());
    }
}
