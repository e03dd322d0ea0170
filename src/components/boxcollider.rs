use crate::rect::Rect;

/// Hitbox size of an actor.
///
/// The hitbox is never stored as a rectangle: it is derived from the actor's
/// position and sprite size every time it is needed. It is centered
/// horizontally on the sprite and anchored at the sprite's bottom edge (the
/// feet), so tall sprites can overlap scenery above them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoxCollider {
    pub width: i32,
    pub height: i32,
}

impl BoxCollider {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// World-space hitbox for a sprite of `sprite_width` x `sprite_height`
    /// drawn with its top-left corner at `(x, y)`.
    pub fn hitbox_at(&self, x: f32, y: f32, sprite_width: i32, sprite_height: i32) -> Rect {
        let left = x + sprite_width as f32 / 2.0 - self.width as f32 / 2.0;
        let top = y + sprite_height as f32 - self.height as f32;
        Rect::new(
            left.floor() as i32,
            top.floor() as i32,
            self.width,
            self.height,
        )
    }
}
