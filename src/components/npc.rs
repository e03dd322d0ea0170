//! Wandering non-player characters.
//!
//! An NPC repeats a random action for a random duration: one of the four walks
//! or idling, each picked with the same probability. Walks last between one
//! and four seconds, idles between two and six. Each NPC owns its random
//! source so a seeded world replays identically.
//!
//! NPCs are obstacles for the player but, unless `collide_with_map` is set,
//! they ignore map collision themselves and may walk through walls.

use std::ops::Range;

use bevy_ecs::prelude::Component;
use log::{debug, warn};

use crate::components::actor::Actor;
use crate::components::animatedentity::AnimatedEntity;
use crate::components::direction::Direction;
use crate::resources::tilemap::CollisionRect;

pub const WALK_DURATION: Range<f32> = 1.0..4.0;
pub const IDLE_DURATION: Range<f32> = 2.0..6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NpcAction {
    Idle,
    WalkUp,
    WalkDown,
    WalkLeft,
    WalkRight,
}

impl NpcAction {
    pub const ALL: [NpcAction; 5] = [
        NpcAction::WalkDown,
        NpcAction::WalkUp,
        NpcAction::WalkLeft,
        NpcAction::WalkRight,
        NpcAction::Idle,
    ];

    pub fn direction(self) -> Option<Direction> {
        match self {
            NpcAction::Idle => None,
            NpcAction::WalkUp => Some(Direction::Up),
            NpcAction::WalkDown => Some(Direction::Down),
            NpcAction::WalkLeft => Some(Direction::Left),
            NpcAction::WalkRight => Some(Direction::Right),
        }
    }

    pub fn duration_range(self) -> Range<f32> {
        match self {
            NpcAction::Idle => IDLE_DURATION,
            _ => WALK_DURATION,
        }
    }

    /// Uniform pick among the five actions.
    pub fn sample(rng: &mut fastrand::Rng) -> Self {
        Self::ALL[rng.usize(0..Self::ALL.len())]
    }

    /// Uniform duration in this action's half-open range, in seconds.
    pub fn sample_duration(self, rng: &mut fastrand::Rng) -> f32 {
        let range = self.duration_range();
        let span = range.end - range.start;
        let duration = range.start + rng.f32() * span;
        if duration >= range.end {
            range.end - span * f32::EPSILON
        } else {
            duration
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct Npc {
    pub name: String,
    pub body: AnimatedEntity,
    pub speed: f32,
    pub action: NpcAction,
    /// Seconds left in the current action.
    pub remaining: f32,
    /// Last walked direction, used for the idle pose.
    pub facing: Direction,
    pub collide_with_map: bool,
    rng: fastrand::Rng,
    animation: String,
}

impl Npc {
    /// A fresh NPC is idle with an expired action, so it picks its first
    /// action on the first tick.
    pub fn new(
        name: impl Into<String>,
        body: AnimatedEntity,
        speed: f32,
        facing: Direction,
        rng: fastrand::Rng,
    ) -> Self {
        Self {
            name: name.into(),
            body,
            speed,
            action: NpcAction::Idle,
            remaining: 0.0,
            facing,
            collide_with_map: false,
            rng,
            animation: String::new(),
        }
    }

    pub fn with_map_collision(mut self, enabled: bool) -> Self {
        self.collide_with_map = enabled;
        self
    }

    /// Run one wander tick. `statics` is only consulted with
    /// `collide_with_map` set.
    pub fn update(&mut self, dt: f32, statics: &[CollisionRect]) {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.action = NpcAction::sample(&mut self.rng);
            self.remaining = self.action.sample_duration(&mut self.rng);
            debug!(
                "NPC '{}' now {:?} for {:.2}s",
                self.name, self.action, self.remaining
            );
        }

        if let Some(dir) = self.action.direction() {
            self.facing = dir;
            let (dx, dy) = dir.delta();
            let distance = self.speed * dt;
            let (nx, ny) = (self.body.x + dx * distance, self.body.y + dy * distance);
            let blocked = self.collide_with_map && {
                let swept = self.body.hitbox().union(&self.body.hitbox_at(nx, ny));
                statics.iter().any(|c| swept.intersects(&c.rect))
            };
            if !blocked {
                self.body.x = nx;
                self.body.y = ny;
            }
        }
        self.refresh_animation();
    }

    /// `walk_{dir}` while walking, `idle_{facing}` otherwise.
    pub fn desired_animation(&self) -> String {
        match self.action.direction() {
            Some(dir) => format!("walk_{dir}"),
            None => format!("idle_{}", self.facing),
        }
    }

    pub fn refresh_animation(&mut self) {
        let name = self.desired_animation();
        if name == self.animation {
            return;
        }
        if let Err(e) = self.body.set_animation(&name) {
            warn!("NPC '{}' animation: {}", self.name, e);
        }
        self.animation = name;
    }
}

impl Actor for Npc {
    fn body(&self) -> &AnimatedEntity {
        &self.body
    }

    fn body_mut(&mut self) -> &mut AnimatedEntity {
        &mut self.body
    }
}
