//! Behaviour shared by the player and NPCs.

use crate::components::animatedentity::AnimatedEntity;
use crate::rect::Rect;
use crate::systems::render::RenderTarget;

/// An animated, positioned actor. Implementors only provide access to their
/// [`AnimatedEntity`]; everything else delegates to it.
pub trait Actor {
    fn body(&self) -> &AnimatedEntity;
    fn body_mut(&mut self) -> &mut AnimatedEntity;

    fn update_animation(&mut self, dt: f32) {
        self.body_mut().update_animation(dt);
    }

    fn draw(&self, target: &mut dyn RenderTarget) {
        self.body().draw(target);
    }

    fn hitbox(&self) -> Rect {
        self.body().hitbox()
    }

    fn is_traversable(&self) -> bool {
        self.body().traversable
    }

    fn position(&self) -> (f32, f32) {
        (self.body().x, self.body().y)
    }
}
