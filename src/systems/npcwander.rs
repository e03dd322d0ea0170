//! NPC wander system.
use bevy_ecs::prelude::*;

use crate::components::npc::Npc;
use crate::resources::tilemap::TileMap;
use crate::resources::worldtime::WorldTime;

/// Advance every NPC's wander cycle by the frame delta.
pub fn npc_wander_system(
    mut npcs: Query<&mut Npc>,
    map: Option<Res<TileMap>>,
    time: Res<WorldTime>,
) {
    let statics = map.as_deref().map(TileMap::collisions).unwrap_or(&[]);
    for mut npc in npcs.iter_mut() {
        npc.update(time.delta, statics);
    }
}
