//! Player movement system.
//!
//! Builds the obstacle set for the tick (static map rectangles plus the
//! hitboxes of non-traversable NPCs) and feeds the sampled input to every
//! [`Player`].
use bevy_ecs::prelude::*;

use crate::components::actor::Actor;
use crate::components::npc::Npc;
use crate::components::player::Player;
use crate::rect::Rect;
use crate::resources::input::InputState;
use crate::resources::tilemap::TileMap;
use crate::resources::worldtime::WorldTime;
use crate::systems::collision::CollisionIndex;

pub fn player_movement_system(
    mut players: Query<&mut Player>,
    npcs: Query<&Npc>,
    map: Option<Res<TileMap>>,
    input: Res<InputState>,
    time: Res<WorldTime>,
) {
    let statics = map.as_deref().map(TileMap::collisions).unwrap_or(&[]);
    let blockers: Vec<Rect> = npcs
        .iter()
        .filter(|npc| !npc.is_traversable())
        .map(|npc| npc.hitbox())
        .collect();
    let obstacles = CollisionIndex::new(statics, blockers);
    let player_input = input.player_input();

    for mut player in players.iter_mut() {
        player.update(player_input, time.delta, &obstacles);
    }
}
