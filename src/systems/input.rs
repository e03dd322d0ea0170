//! Input polling.
//!
//! [`poll_input`] reads raylib's keyboard each frame and writes the levels into
//! [`InputState`](crate::resources::input::InputState). The debug key toggles
//! [`DebugMode`](crate::resources::debugmode::DebugMode).
use bevy_ecs::prelude::*;
use raylib::prelude::{KeyboardKey, RaylibHandle};

use crate::resources::debugmode::toggle_debug_mode;
use crate::resources::input::{InputState, KeySample};

/// Keyboard layout for the logical keys.
#[derive(Debug, Clone, Copy)]
pub struct KeyBindings {
    pub main_up: KeyboardKey,
    pub main_down: KeyboardKey,
    pub main_left: KeyboardKey,
    pub main_right: KeyboardKey,
    pub secondary_up: KeyboardKey,
    pub secondary_down: KeyboardKey,
    pub secondary_left: KeyboardKey,
    pub secondary_right: KeyboardKey,
    pub mode_toggle: KeyboardKey,
    pub mode_debug: KeyboardKey,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            main_up: KeyboardKey::KEY_W,
            main_down: KeyboardKey::KEY_S,
            main_left: KeyboardKey::KEY_A,
            main_right: KeyboardKey::KEY_D,
            secondary_up: KeyboardKey::KEY_UP,
            secondary_down: KeyboardKey::KEY_DOWN,
            secondary_left: KeyboardKey::KEY_LEFT,
            secondary_right: KeyboardKey::KEY_RIGHT,
            mode_toggle: KeyboardKey::KEY_B,
            mode_debug: KeyboardKey::KEY_F11,
        }
    }
}

/// Sample the keyboard into the world's `InputState`.
pub fn poll_input(world: &mut World, rl: &RaylibHandle, bindings: &KeyBindings) {
    let down = |key: KeyboardKey| rl.is_key_down(key);
    let sample = KeySample {
        main_up: down(bindings.main_up),
        main_down: down(bindings.main_down),
        main_left: down(bindings.main_left),
        main_right: down(bindings.main_right),
        secondary_up: down(bindings.secondary_up),
        secondary_down: down(bindings.secondary_down),
        secondary_left: down(bindings.secondary_left),
        secondary_right: down(bindings.secondary_right),
        mode_toggle: down(bindings.mode_toggle),
        mode_debug: down(bindings.mode_debug),
    };

    let debug_pressed = {
        let mut input = world.resource_mut::<InputState>();
        input.update(sample);
        input.mode_debug.just_pressed
    };
    if debug_pressed {
        toggle_debug_mode(world);
    }
}
