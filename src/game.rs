//! World setup and the per-frame schedule.
//!
//! [`setup_world`] loads the map named by the [`GameConfig`], inserts the
//! shared resources and spawns the player and the map's NPCs.
//! [`build_schedule`] returns the update schedule, run once per frame after
//! input and time have been refreshed:
//!
//! 1. [`tilemap_animation_system`]
//! 2. [`actor_animation_system`]
//! 3. [`player_movement_system`]
//! 4. [`npc_wander_system`]
//!
//! Rendering happens outside the schedule, through
//! [`render_world`](crate::systems::render::render_world).

use std::path::{Path, PathBuf};

use bevy_ecs::prelude::*;
use log::{info, warn};

use crate::components::animatedentity::AnimatedEntity;
use crate::components::boxcollider::BoxCollider;
use crate::components::direction::Direction;
use crate::components::npc::Npc;
use crate::components::player::{MovementMode, Player, register_mode_animations};
use crate::resources::gameconfig::{ActorSizes, GameConfig};
use crate::resources::input::InputState;
use crate::resources::texturestore::TextureService;
use crate::resources::tilemap::{MapLoadError, NpcSpawn, TileMap};
use crate::resources::worldtime::WorldTime;
use crate::systems::animation::{actor_animation_system, tilemap_animation_system};
use crate::systems::npcwander::npc_wander_system;
use crate::systems::playermovement::player_movement_system;

/// Load the configured map and populate `world`.
///
/// Only map loading can fail. Actors whose sprites cannot be loaded are
/// logged; NPCs without a usable sprite are skipped.
pub fn setup_world(
    world: &mut World,
    config: &GameConfig,
    textures: &mut dyn TextureService,
) -> Result<(), MapLoadError> {
    let map = TileMap::load(&config.map_path, &config.conventions, textures)?;
    let spawn = map.spawn_position();
    let npc_spawns = map.npc_spawns().to_vec();
    let map_dir = config
        .map_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    world.insert_resource(config.clone());
    world.insert_resource(WorldTime::default());
    world.insert_resource(InputState::default());
    world.insert_resource(map);

    spawn_player(world, config, textures, spawn);

    let mut seeder = match config.npc_seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let spawned = npc_spawns
        .iter()
        .filter_map(|npc| spawn_npc(world, config, textures, npc, &map_dir, seeder.fork()))
        .count();
    info!("Spawned {} of {} NPCs", spawned, npc_spawns.len());
    Ok(())
}

fn body_for(x: f32, y: f32, sizes: &ActorSizes) -> AnimatedEntity {
    AnimatedEntity::new(
        x,
        y,
        sizes.sprite_width,
        sizes.sprite_height,
        BoxCollider::new(sizes.hitbox_width, sizes.hitbox_height),
    )
}

/// Spawn the player at `position` with every configured mode sheet.
pub fn spawn_player(
    world: &mut World,
    config: &GameConfig,
    textures: &mut dyn TextureService,
    position: (f32, f32),
) -> Entity {
    let sizes = &config.player_sizes;
    let mut body = body_for(position.0, position.1, sizes);

    let sheets = [
        (MovementMode::Walk, Some(&config.player_walk_sheet)),
        (MovementMode::Run, config.player_run_sheet.as_ref()),
        (MovementMode::Bike, config.player_bike_sheet.as_ref()),
    ];
    for (mode, path) in sheets {
        let Some(path) = path else {
            continue;
        };
        let sheet = mode.prefix();
        let registered = body
            .add_sprite_sheet(
                textures,
                sheet,
                path,
                sizes.sprite_width,
                sizes.sprite_height,
            )
            .and_then(|_| register_mode_animations(&mut body, mode, sheet));
        if let Err(e) = registered {
            warn!("Player {} sheet {}: {}", sheet, path.display(), e);
        }
    }

    let mut player = Player::new(body, config.player_speeds, config.grid_size);
    player.refresh_animation();
    info!("Player spawned at ({:.1}, {:.1})", position.0, position.1);
    world.spawn(player).id()
}

/// Spawn one NPC from its map record. Sprite paths are tried relative to the
/// map first, then as given.
pub fn spawn_npc(
    world: &mut World,
    config: &GameConfig,
    textures: &mut dyn TextureService,
    spawn: &NpcSpawn,
    map_dir: &Path,
    rng: fastrand::Rng,
) -> Option<Entity> {
    let Some(sprite) = spawn
        .sprite_path
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| config.npc_default_sprite.clone())
    else {
        warn!("NPC '{}' has no sprite, skipped", spawn.name);
        return None;
    };

    let sizes = &config.npc_sizes;
    let mut body = body_for(spawn.x, spawn.y, sizes);
    body.traversable = spawn.traversable;

    let candidates = [map_dir.join(&sprite), sprite.clone()];
    let loaded = candidates.iter().any(|path| {
        body.add_sprite_sheet(
            textures,
            "default",
            path,
            sizes.sprite_width,
            sizes.sprite_height,
        )
        .is_ok()
    });
    if !loaded {
        warn!(
            "NPC '{}' sprite {} not loaded, skipped",
            spawn.name,
            sprite.display()
        );
        return None;
    }
    if let Err(e) = register_mode_animations(&mut body, MovementMode::Walk, "default") {
        warn!("NPC '{}' animations: {}", spawn.name, e);
    }

    let facing = Direction::from_map_index(spawn.direction).unwrap_or_else(|| {
        warn!(
            "NPC '{}' has invalid direction {}, facing down",
            spawn.name, spawn.direction
        );
        Direction::Down
    });
    let mut npc = Npc::new(spawn.name.clone(), body, spawn.speed, facing, rng)
        .with_map_collision(config.npc_collide_with_map);
    npc.refresh_animation();
    Some(world.spawn(npc).id())
}

/// Per-frame update schedule, systems chained in order.
pub fn build_schedule() -> Schedule {
    let mut update = Schedule::default();
    update.add_systems(
        (
            tilemap_animation_system,
            actor_animation_system,
            player_movement_system,
            npc_wander_system,
        )
            .chain(),
    );
    update
}
