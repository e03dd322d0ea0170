//! Rendering.
//!
//! Engine code draws through the [`RenderTarget`] seam: a texture key, a
//! source rectangle inside that texture, a destination rectangle in world
//! pixels, and flip flags. Rotation is always zero.
//!
//! [`render_world`] fixes the frame's draw order:
//!
//! 1. visible tile layers not listed as overlays, in map order
//! 2. actors (player and NPCs), sorted by the bottom edge of their hitbox
//! 3. visible overlay layers, in map order
//! 4. with [`DebugMode`] present, outlines of collision rectangles and hitboxes
//!
//! With the `raylib-backend` feature, [`RaylibCanvas`] implements the seam on
//! any raylib draw handle (usually a `RaylibMode2D` with the world camera).
use bevy_ecs::prelude::*;

use crate::components::actor::Actor;
use crate::components::npc::Npc;
use crate::components::player::Player;
use crate::rect::Rect;
use crate::resources::debugmode::DebugMode;
use crate::resources::gameconfig::GameConfig;
use crate::resources::tilemap::{TileFlip, TileLayer, TileMap};

/// Draw-call sink for tiles and sprites.
pub trait RenderTarget {
    /// Whether `key` names a texture this target can draw.
    fn has_texture(&self, key: &str) -> bool;
    /// Blit `src` from texture `key` into `dst`. Unknown keys draw nothing.
    fn draw_texture(&mut self, key: &str, src: Rect, dst: Rect, flip: TileFlip);
    /// Debug outline. Targets without debug drawing ignore it.
    fn draw_outline(&mut self, _rect: Rect) {}
}

/// Draw the map and every actor in the world.
pub fn render_world(world: &mut World, target: &mut dyn RenderTarget) {
    let mut players = world.query::<&Player>();
    let mut npcs = world.query::<&Npc>();
    let world: &World = world;

    let config = world.get_resource::<GameConfig>();
    let is_overlay = |layer: &TileLayer| config.is_some_and(|c| c.is_overlay_layer(&layer.name));
    let map = world.get_resource::<TileMap>();

    if let Some(map) = map {
        map.render_layers_where(target, |layer| !is_overlay(layer));
    }

    let mut actors: Vec<&dyn Actor> = players
        .iter(world)
        .map(|p| p as &dyn Actor)
        .chain(npcs.iter(world).map(|n| n as &dyn Actor))
        .collect();
    actors.sort_by_key(|a| a.hitbox().bottom());
    for actor in &actors {
        actor.draw(target);
    }

    if let Some(map) = map {
        map.render_layers_where(target, is_overlay);
    }

    if world.contains_resource::<DebugMode>() {
        if let Some(map) = map {
            for collision in map.collisions() {
                target.draw_outline(collision.rect);
            }
        }
        for actor in &actors {
            target.draw_outline(actor.hitbox());
        }
    }
}

#[cfg(feature = "raylib-backend")]
pub use canvas::RaylibCanvas;

#[cfg(feature = "raylib-backend")]
mod canvas {
    use raylib::prelude::*;

    use super::RenderTarget;
    use crate::rect::Rect;
    use crate::resources::texturestore::TextureStore;
    use crate::resources::tilemap::TileFlip;

    /// [`RenderTarget`] drawing raylib textures from a [`TextureStore`].
    pub struct RaylibCanvas<'a, D: RaylibDraw> {
        pub d: &'a mut D,
        pub textures: &'a TextureStore,
    }

    fn to_rectangle(rect: Rect) -> Rectangle {
        Rectangle {
            x: rect.x as f32,
            y: rect.y as f32,
            width: rect.w as f32,
            height: rect.h as f32,
        }
    }

    impl<D: RaylibDraw> RenderTarget for RaylibCanvas<'_, D> {
        fn has_texture(&self, key: &str) -> bool {
            self.textures.contains(key)
        }

        fn draw_texture(&mut self, key: &str, src: Rect, dst: Rect, flip: TileFlip) {
            let Some(tex) = self.textures.get(key) else {
                return;
            };
            // Negative source extents make raylib mirror the blit.
            let mut source = to_rectangle(src);
            if flip.horizontal {
                source.width = -source.width;
            }
            if flip.vertical {
                source.height = -source.height;
            }
            self.d.draw_texture_pro(
                tex,
                source,
                to_rectangle(dst),
                Vector2::zero(),
                0.0,
                Color::WHITE,
            );
        }

        fn draw_outline(&mut self, rect: Rect) {
            self.d
                .draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, Color::RED);
        }
    }
}
