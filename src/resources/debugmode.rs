//! Debug toggle resource.
//!
//! The mere presence of this resource enables the collision/hitbox overlay
//! drawn by [`render_world`](crate::systems::render::render_world). Remove it
//! to disable.

use bevy_ecs::prelude::Resource;

/// Marker resource: when present, the renderer outlines collision geometry.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct DebugMode;

/// Insert or remove [`DebugMode`].
pub fn toggle_debug_mode(world: &mut bevy_ecs::world::World) {
    if world.remove_resource::<DebugMode>().is_none() {
        world.insert_resource(DebugMode);
        log::info!("Debug overlay enabled");
    } else {
        log::info!("Debug overlay disabled");
    }
}
