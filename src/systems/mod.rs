//! Game systems.
//!
//! Submodules overview
//! - [`animation`] – advance animated tiles and actor sprite animations
//! - [`collision`] – rectangle checks against map collisions and actors
//! - [`input`] – read the keyboard and update [`crate::resources::input::InputState`]
//! - [`npcwander`] – advance NPC wander behaviour
//! - [`playermovement`] – apply input to the player with collision
//! - [`render`] – draw layers, actors and debug outlines in order
//! - [`time`] – update simulation time and delta

pub mod animation;
pub mod collision;
#[cfg(feature = "raylib-backend")]
pub mod input;
pub mod npcwander;
pub mod playermovement;
pub mod render;
pub mod time;
