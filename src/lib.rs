//! Tilewalker library.
//!
//! This module exposes the game's ECS components, resources and systems, plus
//! the world setup in [`game`], for use in integration tests and by the
//! binary.

pub mod components;
pub mod game;
pub mod rect;
pub mod resources;
pub mod systems;

#[cfg(test)]
mod testing;
