//! Per-frame keyboard input resource.
//!
//! Captures the logical keys the game cares about and exposes them to systems
//! via the [`InputState`] resource. Two bindings drive movement (main and
//! secondary directions, WASD and arrows by default) plus one mode toggle.
//!
//! The resource is backend-agnostic: a polling system writes raw key-down
//! levels through [`InputState::update`], which derives the press/release
//! edges.
use bevy_ecs::prelude::*;

use crate::components::direction::Direction;
use crate::components::player::PlayerInput;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Boolean key state with edge detection.
pub struct BoolState {
    /// Whether the key is currently held.
    pub active: bool,
    /// Whether the key went down this frame.
    pub just_pressed: bool,
    /// Whether the key went up this frame.
    pub just_released: bool,
}

impl BoolState {
    /// Feed this frame's key-down level.
    pub fn set(&mut self, down: bool) {
        self.just_pressed = down && !self.active;
        self.just_released = !down && self.active;
        self.active = down;
    }
}

/// Raw key-down levels sampled from the backend for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeySample {
    pub main_up: bool,
    pub main_down: bool,
    pub main_left: bool,
    pub main_right: bool,
    pub secondary_up: bool,
    pub secondary_down: bool,
    pub secondary_left: bool,
    pub secondary_right: bool,
    pub mode_toggle: bool,
    pub mode_debug: bool,
}

/// Resource capturing the per-frame keyboard state relevant to gameplay.
#[derive(Resource, Debug, Clone, Default)]
pub struct InputState {
    pub maindirection_up: BoolState,
    pub maindirection_down: BoolState,
    pub maindirection_left: BoolState,
    pub maindirection_right: BoolState,
    // Arrow keys
    pub secondarydirection_up: BoolState,
    pub secondarydirection_down: BoolState,
    pub secondarydirection_left: BoolState,
    pub secondarydirection_right: BoolState,
    pub mode_toggle: BoolState,
    pub mode_debug: BoolState,
}

impl InputState {
    pub fn update(&mut self, keys: KeySample) {
        self.maindirection_up.set(keys.main_up);
        self.maindirection_down.set(keys.main_down);
        self.maindirection_left.set(keys.main_left);
        self.maindirection_right.set(keys.main_right);
        self.secondarydirection_up.set(keys.secondary_up);
        self.secondarydirection_down.set(keys.secondary_down);
        self.secondarydirection_left.set(keys.secondary_left);
        self.secondarydirection_right.set(keys.secondary_right);
        self.mode_toggle.set(keys.mode_toggle);
        self.mode_debug.set(keys.mode_debug);
    }

    /// Held direction. With several held, Up wins over Down, Down over Left,
    /// Left over Right.
    pub fn direction(&self) -> Option<Direction> {
        if self.maindirection_up.active || self.secondarydirection_up.active {
            Some(Direction::Up)
        } else if self.maindirection_down.active || self.secondarydirection_down.active {
            Some(Direction::Down)
        } else if self.maindirection_left.active || self.secondarydirection_left.active {
            Some(Direction::Left)
        } else if self.maindirection_right.active || self.secondarydirection_right.active {
            Some(Direction::Right)
        } else {
            None
        }
    }

    pub fn player_input(&self) -> PlayerInput {
        PlayerInput {
            direction: self.direction(),
            toggle_mode: self.mode_toggle.just_pressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolstate_default() {
        let bs = BoolState::default();
        assert!(!bs.active);
        assert!(!bs.just_pressed);
        assert!(!bs.just_released);
    }

    #[test]
    fn test_boolstate_edges() {
        let mut bs = BoolState::default();
        bs.set(true);
        assert!(bs.active && bs.just_pressed && !bs.just_released);
        bs.set(true);
        assert!(bs.active && !bs.just_pressed);
        bs.set(false);
        assert!(!bs.active && bs.just_released);
        bs.set(false);
        assert!(!bs.just_released);
    }

    #[test]
    fn test_inputstate_default_no_direction() {
        let input = InputState::default();
        assert_eq!(input.direction(), None);
        assert_eq!(input.player_input(), PlayerInput::default());
    }

    #[test]
    fn test_direction_priority() {
        let mut input = InputState::default();
        input.update(KeySample {
            main_right: true,
            secondary_left: true,
            ..Default::default()
        });
        assert_eq!(input.direction(), Some(Direction::Left));

        input.update(KeySample {
            main_right: true,
            secondary_down: true,
            main_up: true,
            ..Default::default()
        });
        assert_eq!(input.direction(), Some(Direction::Up));

        input.update(KeySample {
            secondary_right: true,
            ..Default::default()
        });
        assert_eq!(input.direction(), Some(Direction::Right));
    }

    #[test]
    fn test_mode_toggle_is_edge_triggered() {
        let mut input = InputState::default();
        let held = KeySample {
            mode_toggle: true,
            ..Default::default()
        };
        input.update(held);
        assert!(input.player_input().toggle_mode);
        input.update(held);
        assert!(!input.player_input().toggle_mode);
        input.update(KeySample::default());
        input.update(held);
        assert!(input.player_input().toggle_mode);
    }
}
