//! ECS resources made available to systems.
//!
//! Overview
//! - `debugmode` – presence toggles collision outlines and the FPS counter
//! - `gameconfig` – window, map and actor settings read from `config.ini`
//! - `input` – per-frame keyboard state of keys relevant to the game
//! - `mapdescription` – serde model of Tiled JSON maps and tilesets
//! - `texturestore` – texture loading seam and the raylib-backed store
//! - `tilemap` – the loaded map: layers, tilesets, animated tiles, collisions
//! - `worldtime` – simulation time and delta
pub mod debugmode;
pub mod gameconfig;
pub mod input;
pub mod mapdescription;
pub mod texturestore;
pub mod tilemap;
pub mod worldtime;
