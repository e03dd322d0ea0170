//! Collision predicate used by movement.
//!
//! There is no collision state: every movement attempt builds a
//! [`CollisionIndex`] over the map's static rectangles and the hitboxes of the
//! other non-traversable actors, and asks whether a candidate hitbox overlaps
//! any of them.
use crate::rect::Rect;
use crate::resources::tilemap::CollisionRect;

/// True if `candidate` overlaps a static rectangle or an actor hitbox.
pub fn check_collision(candidate: &Rect, statics: &[CollisionRect], actors: &[Rect]) -> bool {
    statics.iter().any(|c| candidate.intersects(&c.rect))
        || actors.iter().any(|hitbox| candidate.intersects(hitbox))
}

/// Obstacles for one mover during one tick.
#[derive(Debug, Clone)]
pub struct CollisionIndex<'a> {
    statics: &'a [CollisionRect],
    actors: Vec<Rect>,
}

impl<'a> CollisionIndex<'a> {
    /// `actors` must not include the mover's own hitbox.
    pub fn new(statics: &'a [CollisionRect], actors: Vec<Rect>) -> Self {
        Self { statics, actors }
    }

    /// Map geometry only.
    pub fn statics_only(statics: &'a [CollisionRect]) -> Self {
        Self::new(statics, Vec::new())
    }

    pub fn collides(&self, candidate: &Rect) -> bool {
        check_collision(candidate, self.statics, &self.actors)
    }

    /// Whether a mover whose hitbox is `from` may not move to `to`.
    ///
    /// Static rectangles reject any overlap. An actor the mover already
    /// overlaps only rejects `to` when it would share more area with it than
    /// `from` does, so the mover can step out of it but never walk deeper in.
    pub fn blocks(&self, from: &Rect, to: &Rect) -> bool {
        self.statics.iter().any(|c| to.intersects(&c.rect))
            || self
                .actors
                .iter()
                .any(|hitbox| to.overlap_area(hitbox) > from.overlap_area(hitbox))
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }
}
