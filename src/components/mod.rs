//! ECS components for entities.
//!
//! Submodules overview:
//! - [`actor`] – common surface of everything drawn and collided on the map
//! - [`animatedentity`] – sprite sheets, animation clips and playback state
//! - [`boxcollider`] – hitbox size anchored at the bottom centre of a sprite
//! - [`direction`] – the four cardinal directions
//! - [`npc`] – randomly wandering non-player characters
//! - [`player`] – the keyboard-driven, grid-aligned player

pub mod actor;
pub mod animatedentity;
pub mod boxcollider;
pub mod direction;
pub mod npc;
pub mod player;
