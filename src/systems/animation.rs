//! Animation systems.
//!
//! - [`tilemap_animation_system`] advances the animated tiles of the loaded
//!   [`TileMap`].
//! - [`actor_animation_system`] advances the current animation of every
//!   player and NPC.
//!
//! Both read the scaled frame delta from [`WorldTime`] and run before movement,
//! so a frame's movement sees the animation state of that same frame.

use bevy_ecs::prelude::*;

use crate::components::actor::Actor;
use crate::components::npc::Npc;
use crate::components::player::Player;
use crate::resources::tilemap::TileMap;
use crate::resources::worldtime::WorldTime;

/// Tick the map's animated-tile cursors. No-op without a map.
pub fn tilemap_animation_system(map: Option<ResMut<TileMap>>, time: Res<WorldTime>) {
    if let Some(mut map) = map {
        map.update(time.delta);
    }
}

/// Tick every actor's sprite animation.
pub fn actor_animation_system(
    mut players: Query<&mut Player>,
    mut npcs: Query<&mut Npc>,
    time: Res<WorldTime>,
) {
    for mut player in players.iter_mut() {
        player.update_animation(time.delta);
    }
    for mut npc in npcs.iter_mut() {
        npc.update_animation(time.delta);
    }
}
