//! Player movement state machine.
//!
//! While a direction is held the player moves freely by `speed * dt` along
//! that axis. A blocked step slides to the furthest free integer coordinate on
//! that axis and leaves the player idle. Releasing the direction starts grid
//! alignment: the coordinate on the facing axis eases towards the nearest
//! multiple of the grid size at the same speed and snaps once within one
//! pixel, unless the snap itself would collide. The perpendicular axis is left
//! alone.
//!
//! The animation shown is derived from (mode, state, facing):
//!
//! | mode | moving / aligning | idle |
//! |------|-------------------|------|
//! | walk | `walk_{dir}` | `idle_{dir}` |
//! | run  | `run_{dir}`  | `run_idle_{dir}` |
//! | bike | `bike_{dir}` | `bike_idle_{dir}` |

use bevy_ecs::prelude::Component;
use log::{debug, warn};

use crate::components::actor::Actor;
use crate::components::animatedentity::{AnimatedEntity, AnimationError};
use crate::components::direction::Direction;
use crate::rect::Rect;
use crate::systems::collision::CollisionIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementMode {
    #[default]
    Walk,
    Run,
    Bike,
}

impl MovementMode {
    /// Walk -> Run -> Bike -> Walk.
    pub fn next(self) -> Self {
        match self {
            MovementMode::Walk => MovementMode::Run,
            MovementMode::Run => MovementMode::Bike,
            MovementMode::Bike => MovementMode::Walk,
        }
    }

    /// Animation name prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            MovementMode::Walk => "walk",
            MovementMode::Run => "run",
            MovementMode::Bike => "bike",
        }
    }

    /// Name of the idle animation facing `dir`.
    pub fn idle_animation(self, dir: Direction) -> String {
        match self {
            MovementMode::Walk => format!("idle_{dir}"),
            mode => format!("{}_idle_{dir}", mode.prefix()),
        }
    }

    /// Name of the moving animation facing `dir`.
    pub fn move_animation(self, dir: Direction) -> String {
        format!("{}_{dir}", self.prefix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementState {
    #[default]
    Idle,
    Moving,
    FinishingAlignment,
}

/// Speed per movement mode, in pixels per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSpeeds {
    pub walk: f32,
    pub run: f32,
    pub bike: f32,
}

impl Default for PlayerSpeeds {
    fn default() -> Self {
        Self {
            walk: 64.0,
            run: 128.0,
            bike: 160.0,
        }
    }
}

impl PlayerSpeeds {
    pub fn for_mode(&self, mode: MovementMode) -> f32 {
        match mode {
            MovementMode::Walk => self.walk,
            MovementMode::Run => self.run,
            MovementMode::Bike => self.bike,
        }
    }
}

/// Input sampled for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerInput {
    pub direction: Option<Direction>,
    /// Mode toggle pressed this tick (edge, not level).
    pub toggle_mode: bool,
}

#[derive(Component, Debug, Clone)]
pub struct Player {
    pub body: AnimatedEntity,
    pub speeds: PlayerSpeeds,
    pub mode: MovementMode,
    pub facing: Direction,
    pub state: MovementState,
    /// Grid point being eased towards after input release.
    pub align_target: Option<(f32, f32)>,
    pub grid_size: f32,
    held: Option<Direction>,
    animation: String,
}

impl Player {
    pub fn new(body: AnimatedEntity, speeds: PlayerSpeeds, grid_size: f32) -> Self {
        Self {
            body,
            speeds,
            mode: MovementMode::Walk,
            facing: Direction::Down,
            state: MovementState::Idle,
            align_target: None,
            grid_size,
            held: None,
            animation: String::new(),
        }
    }

    pub fn speed(&self) -> f32 {
        self.speeds.for_mode(self.mode)
    }

    /// Run one movement tick.
    ///
    /// An actor hitbox the player already overlaps only stops moves that
    /// would push further into it (see [`CollisionIndex::blocks`]).
    pub fn update(&mut self, input: PlayerInput, dt: f32, obstacles: &CollisionIndex) {
        if input.toggle_mode {
            self.mode = self.mode.next();
            debug!("Player movement mode: {:?}", self.mode);
        }

        match input.direction {
            Some(dir) => {
                self.align_target = None;
                self.facing = dir;
                self.try_move(dir, dt, obstacles);
            }
            None => {
                if self.held.is_some() {
                    self.begin_alignment();
                }
                if self.align_target.is_some() {
                    self.finish_movement(dt, obstacles);
                } else {
                    self.state = MovementState::Idle;
                }
            }
        }
        self.held = input.direction;
        self.refresh_animation();
    }

    /// Step `speed * dt` towards `dir`. When the full step is blocked, slide
    /// to the furthest whole-pixel coordinate on the moving axis that is free.
    fn try_move(&mut self, dir: Direction, dt: f32, obstacles: &CollisionIndex) {
        let (dx, dy) = dir.delta();
        let distance = self.speed() * dt;
        let (x, y) = (self.body.x, self.body.y);
        let from = self.body.hitbox();

        // Test the whole swept area so long steps cannot tunnel through thin
        // obstacles.
        let (nx, ny) = (x + dx * distance, y + dy * distance);
        let swept = from.union(&self.body.hitbox_at(nx, ny));
        if !obstacles.blocks(&from, &swept) {
            self.body.x = nx;
            self.body.y = ny;
            self.state = MovementState::Moving;
            return;
        }

        let horizontal = dir.is_horizontal();
        let (start, sign) = if horizontal { (x, dx) } else { (y, dy) };
        let limit = start + sign * distance;
        let mut coord = if sign > 0.0 {
            start.floor() + 1.0
        } else {
            start.ceil() - 1.0
        };
        let mut best = (x, y);
        while (limit - coord) * sign >= 0.0 {
            let candidate = if horizontal { (coord, y) } else { (x, coord) };
            if obstacles.blocks(&from, &self.body.hitbox_at(candidate.0, candidate.1)) {
                break;
            }
            best = candidate;
            coord += sign;
        }
        self.body.x = best.0;
        self.body.y = best.1;
        self.state = MovementState::Idle;
    }

    /// Pick the grid point to ease towards on the facing axis.
    pub fn begin_alignment(&mut self) {
        let (x, y) = (self.body.x, self.body.y);
        let target = if self.facing.is_horizontal() {
            (self.snap(x), y)
        } else {
            (x, self.snap(y))
        };
        if target == (x, y) {
            self.align_target = None;
            self.state = MovementState::Idle;
        } else {
            self.align_target = Some(target);
            self.state = MovementState::FinishingAlignment;
        }
    }

    fn snap(&self, value: f32) -> f32 {
        if self.grid_size <= 0.0 {
            return value;
        }
        (value / self.grid_size).round() * self.grid_size
    }

    /// One alignment step. Returns true once there is nothing left to align,
    /// either because the target was reached or because the path is blocked.
    /// The final snap onto the grid is collision checked like any other step.
    pub fn finish_movement(&mut self, dt: f32, obstacles: &CollisionIndex) -> bool {
        let Some((tx, ty)) = self.align_target else {
            return true;
        };
        let target = if self.facing.is_horizontal() { tx } else { ty };

        let remaining = target - self.axis_position();
        if remaining.abs() > 1.0 {
            let next = self.axis_position()
                + (self.speed() * dt).min(remaining.abs()) * remaining.signum();
            let from = self.body.hitbox();
            if obstacles.blocks(&from, &from.union(&self.hitbox_on_axis(next))) {
                self.stop_alignment();
                return true;
            }
            self.set_axis_position(next);
            if (target - next).abs() > 1.0 {
                return false;
            }
        }

        if obstacles.blocks(&self.body.hitbox(), &self.hitbox_on_axis(target)) {
            self.stop_alignment();
            return true;
        }
        self.complete_alignment(target);
        true
    }

    fn axis_position(&self) -> f32 {
        if self.facing.is_horizontal() {
            self.body.x
        } else {
            self.body.y
        }
    }

    fn set_axis_position(&mut self, value: f32) {
        if self.facing.is_horizontal() {
            self.body.x = value;
        } else {
            self.body.y = value;
        }
    }

    /// Hitbox with the facing-axis coordinate replaced by `value`.
    fn hitbox_on_axis(&self, value: f32) -> Rect {
        if self.facing.is_horizontal() {
            self.body.hitbox_at(value, self.body.y)
        } else {
            self.body.hitbox_at(self.body.x, value)
        }
    }

    fn stop_alignment(&mut self) {
        self.align_target = None;
        self.state = MovementState::Idle;
    }

    fn complete_alignment(&mut self, target: f32) {
        self.set_axis_position(target);
        self.stop_alignment();
    }

    /// Animation name for the current (mode, state, facing).
    pub fn desired_animation(&self) -> String {
        match self.state {
            MovementState::Idle => self.mode.idle_animation(self.facing),
            MovementState::Moving | MovementState::FinishingAlignment => {
                self.mode.move_animation(self.facing)
            }
        }
    }

    /// Switch the body's animation if the derived name changed.
    pub fn refresh_animation(&mut self) {
        let name = self.desired_animation();
        if name == self.animation {
            return;
        }
        if let Err(e) = self.body.set_animation(&name) {
            warn!("Player animation: {}", e);
        }
        self.animation = name;
    }
}

impl Actor for Player {
    fn body(&self) -> &AnimatedEntity {
        &self.body
    }

    fn body_mut(&mut self) -> &mut AnimatedEntity {
        &mut self.body
    }
}

/// Register the idle and moving animations of `mode` from a character sheet
/// laid out one direction per row (down, left, right, up).
pub fn register_mode_animations(
    body: &mut AnimatedEntity,
    mode: MovementMode,
    sheet: &str,
) -> Result<(), AnimationError> {
    for dir in Direction::ALL {
        let duration = if dir == Direction::Up { 150.0 } else { 200.0 };
        let row = dir.sheet_row();
        body.add_animation(&mode.idle_animation(dir), sheet, row, 0, 1, duration, false)?;
        body.add_animation(&mode.move_animation(dir), sheet, row, 0, 4, duration, true)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::boxcollider::BoxCollider;
    use crate::rect::Rect;
    use crate::resources::tilemap::CollisionRect;
    use crate::testing::FakeTextures;

    fn player_at(x: f32, y: f32, walk: f32) -> Player {
        let body = AnimatedEntity::new(x, y, 16, 16, BoxCollider::new(12, 8));
        let speeds = PlayerSpeeds {
            walk,
            run: walk * 2.0,
            bike: walk * 3.0,
        };
        Player::new(body, speeds, 16.0)
    }

    fn hold(dir: Direction) -> PlayerInput {
        PlayerInput {
            direction: Some(dir),
            toggle_mode: false,
        }
    }

    fn wall(x: i32, y: i32, w: i32, h: i32) -> CollisionRect {
        CollisionRect {
            rect: Rect::new(x, y, w, h),
            name: None,
        }
    }

    #[test]
    fn test_free_movement_commits_full_step() {
        let mut player = player_at(0.0, 0.0, 32.0);
        let index = CollisionIndex::statics_only(&[]);
        player.update(hold(Direction::Right), 0.5, &index);
        assert_eq!(player.body.x, 16.0);
        assert_eq!(player.body.y, 0.0);
        assert_eq!(player.state, MovementState::Moving);
        assert_eq!(player.facing, Direction::Right);
    }

    #[test]
    fn test_blocked_step_slides_to_wall() {
        // hitbox right edge starts at 14; wall 10 px further
        let walls = [wall(24, 0, 16, 32)];
        let index = CollisionIndex::statics_only(&walls);
        let mut player = player_at(0.0, 0.0, 100.0);
        player.update(hold(Direction::Right), 0.2, &index);
        assert_eq!(player.body.x, 10.0);
        assert_eq!(player.body.hitbox().right(), 24);
        assert_eq!(player.state, MovementState::Idle);
        assert!(!index.collides(&player.body.hitbox()));
    }

    #[test]
    fn test_step_against_wall_stays_put() {
        let walls = [wall(14, 0, 16, 32)];
        let index = CollisionIndex::statics_only(&walls);
        let mut player = player_at(0.0, 0.0, 100.0);
        player.update(hold(Direction::Right), 0.1, &index);
        assert_eq!(player.body.x, 0.0);
        assert_eq!(player.state, MovementState::Idle);
    }

    #[test]
    fn test_non_traversable_actor_blocks() {
        let index = CollisionIndex::new(&[], vec![Rect::new(0, 20, 16, 16)]);
        let mut player = player_at(0.0, 0.0, 64.0);
        player.update(hold(Direction::Down), 0.5, &index);
        // hitbox bottom stops at the actor's top edge
        assert_eq!(player.body.hitbox().bottom(), 20);
        assert_eq!(player.body.y, 4.0);
    }

    #[test]
    fn test_overlapping_actor_does_not_pin_player() {
        let index = CollisionIndex::new(&[], vec![Rect::new(4, 10, 12, 8)]);
        let mut player = player_at(0.0, 0.0, 32.0);
        player.update(hold(Direction::Left), 0.25, &index);
        assert_eq!(player.body.x, -8.0);
        assert_eq!(player.state, MovementState::Moving);
    }

    #[test]
    fn test_release_aligns_facing_axis_only() {
        let index = CollisionIndex::statics_only(&[]);
        let mut player = player_at(0.0, 5.0, 24.0);
        player.update(hold(Direction::Right), 0.25, &index);
        assert_eq!(player.body.x, 6.0);

        player.update(PlayerInput::default(), 0.125, &index);
        assert_eq!(player.state, MovementState::FinishingAlignment);
        assert_eq!(player.align_target, Some((0.0, 5.0)));
        assert_eq!(player.body.x, 3.0);

        for _ in 0..10 {
            player.update(PlayerInput::default(), 0.125, &index);
        }
        assert_eq!(player.body.x, 0.0);
        // the perpendicular axis keeps its off-grid value
        assert_eq!(player.body.y, 5.0);
        assert_eq!(player.state, MovementState::Idle);
        assert_eq!(player.align_target, None);
    }

    #[test]
    fn test_alignment_converges_monotonically() {
        let index = CollisionIndex::statics_only(&[]);
        for start in [1.0f32, 7.5, 8.5, 13.0, 15.9, 23.2] {
            let mut player = player_at(start, 0.0, 40.0);
            player.facing = Direction::Right;
            player.begin_alignment();
            let target = (start / 16.0).round() * 16.0;
            let mut distance = (target - player.body.x).abs();
            let mut ticks = 0;
            while !player.finish_movement(1.0 / 60.0, &index) {
                let now = (target - player.body.x).abs();
                assert!(now < distance, "distance grew from {distance} to {now}");
                distance = now;
                ticks += 1;
                assert!(ticks <= 16, "alignment from {start} did not terminate");
            }
            assert_eq!(player.body.x, target);
            assert_eq!(player.state, MovementState::Idle);
        }
    }

    #[test]
    fn test_already_aligned_release_goes_idle() {
        let index = CollisionIndex::statics_only(&[]);
        let mut player = player_at(0.0, 0.0, 32.0);
        player.update(hold(Direction::Down), 0.5, &index);
        assert_eq!(player.body.y, 16.0);
        player.update(PlayerInput::default(), 0.1, &index);
        assert_eq!(player.state, MovementState::Idle);
        assert_eq!(player.align_target, None);
        assert_eq!(player.body.y, 16.0);
    }

    #[test]
    fn test_blocked_alignment_stops() {
        let walls = [wall(0, 30, 16, 16)];
        let index = CollisionIndex::statics_only(&walls);
        let mut player = player_at(0.0, 0.0, 100.0);
        player.facing = Direction::Down;
        player.body.y = 12.0;
        // target 16 would push the hitbox bottom to 32, inside the wall
        player.begin_alignment();
        assert_eq!(player.align_target, Some((0.0, 16.0)));
        assert!(player.finish_movement(0.1, &index));
        assert_eq!(player.body.y, 12.0);
        assert_eq!(player.state, MovementState::Idle);
    }

    #[test]
    fn test_alignment_snap_into_wall_is_refused() {
        let walls = [wall(0, 31, 16, 16)];
        let index = CollisionIndex::statics_only(&walls);
        let mut player = player_at(0.0, 15.3, 100.0);
        player.facing = Direction::Down;
        player.begin_alignment();
        assert_eq!(player.align_target, Some((0.0, 16.0)));
        // y = 16 would put the hitbox bottom at 32, one pixel into the wall
        assert!(player.finish_movement(0.2, &index));
        assert_eq!(player.body.y, 15.3);
        assert_eq!(player.state, MovementState::Idle);
        assert_eq!(player.align_target, None);
        assert!(!index.collides(&player.body.hitbox()));
    }

    #[test]
    fn test_slide_then_release_never_enters_wall() {
        let walls = [wall(0, 31, 16, 16)];
        let index = CollisionIndex::statics_only(&walls);
        let mut player = player_at(0.0, 0.3, 100.0);
        player.update(hold(Direction::Down), 0.2, &index);
        assert_eq!(player.body.y, 15.0);
        assert_eq!(player.body.hitbox().bottom(), 31);

        player.update(PlayerInput::default(), 0.2, &index);
        player.update(PlayerInput::default(), 0.2, &index);
        assert_eq!(player.body.y, 15.0);
        assert_eq!(player.state, MovementState::Idle);
        assert!(!index.collides(&player.body.hitbox()));
    }

    #[test]
    fn test_slide_lands_on_integer_coordinates() {
        let walls = [wall(24, 0, 16, 32)];
        let index = CollisionIndex::statics_only(&walls);
        let mut player = player_at(0.5, 0.0, 100.0);
        player.update(hold(Direction::Right), 0.2, &index);
        assert_eq!(player.body.x, 10.0);

        let walls = [wall(0, 0, 8, 32)];
        let index = CollisionIndex::statics_only(&walls);
        let mut player = player_at(20.5, 0.0, 100.0);
        player.update(hold(Direction::Left), 0.2, &index);
        assert_eq!(player.body.x, 6.0);
        assert_eq!(player.body.hitbox().left(), 8);
    }

    #[test]
    fn test_cannot_walk_through_overlapping_actor() {
        // player hitbox (2, 8, 12, 8) already shares 4 columns with the actor
        let index = CollisionIndex::new(&[], vec![Rect::new(10, 8, 12, 8)]);
        let mut player = player_at(0.0, 0.0, 100.0);
        for _ in 0..3 {
            player.update(hold(Direction::Right), 0.1, &index);
        }
        assert_eq!(player.body.x, 0.0);
        assert_eq!(player.state, MovementState::Idle);

        player.update(hold(Direction::Left), 0.1, &index);
        assert_eq!(player.body.x, -10.0);
        assert_eq!(player.state, MovementState::Moving);
        assert!(!index.collides(&player.body.hitbox()));
    }

    #[test]
    fn test_new_input_cancels_alignment() {
        let index = CollisionIndex::statics_only(&[]);
        let mut player = player_at(0.0, 0.0, 20.0);
        player.update(hold(Direction::Right), 0.3, &index);
        player.update(PlayerInput::default(), 0.05, &index);
        assert!(player.align_target.is_some());
        player.update(hold(Direction::Up), 0.1, &index);
        assert_eq!(player.align_target, None);
        assert_eq!(player.state, MovementState::Moving);
        assert_eq!(player.facing, Direction::Up);
    }

    #[test]
    fn test_mode_toggle_cycles_and_changes_speed() {
        let index = CollisionIndex::statics_only(&[]);
        let mut player = player_at(0.0, 0.0, 10.0);
        let toggle = PlayerInput {
            direction: None,
            toggle_mode: true,
        };
        player.update(toggle, 0.0, &index);
        assert_eq!(player.mode, MovementMode::Run);
        assert_eq!(player.speed(), 20.0);
        player.update(toggle, 0.0, &index);
        assert_eq!(player.mode, MovementMode::Bike);
        player.update(toggle, 0.0, &index);
        assert_eq!(player.mode, MovementMode::Walk);
    }

    #[test]
    fn test_mode_toggle_keeps_alignment() {
        let index = CollisionIndex::statics_only(&[]);
        let mut player = player_at(0.0, 0.0, 20.0);
        player.update(hold(Direction::Right), 0.3, &index);
        player.update(PlayerInput::default(), 0.05, &index);
        let target = player.align_target;
        player.update(
            PlayerInput {
                direction: None,
                toggle_mode: true,
            },
            0.05,
            &index,
        );
        assert_eq!(player.mode, MovementMode::Run);
        assert_eq!(player.align_target, target);
        assert_eq!(player.state, MovementState::FinishingAlignment);
    }

    #[test]
    fn test_animation_names() {
        let mut player = player_at(0.0, 0.0, 10.0);
        assert_eq!(player.desired_animation(), "idle_down");
        player.state = MovementState::Moving;
        player.facing = Direction::Left;
        assert_eq!(player.desired_animation(), "walk_left");
        player.mode = MovementMode::Bike;
        assert_eq!(player.desired_animation(), "bike_left");
        player.state = MovementState::Idle;
        assert_eq!(player.desired_animation(), "bike_idle_left");
        player.mode = MovementMode::Run;
        player.state = MovementState::FinishingAlignment;
        assert_eq!(player.desired_animation(), "run_left");
    }

    #[test]
    fn test_animation_follows_state() {
        let mut textures = FakeTextures::new().with("walk.png", 64, 64);
        let mut body = AnimatedEntity::new(0.0, 0.0, 16, 16, BoxCollider::new(12, 8));
        body.add_sprite_sheet(&mut textures, "walk", "walk.png", 16, 16)
            .unwrap();
        register_mode_animations(&mut body, MovementMode::Walk, "walk").unwrap();
        let mut player = Player::new(body, PlayerSpeeds::default(), 16.0);
        player.refresh_animation();
        assert_eq!(player.body.current_animation_name(), Some("idle_down"));

        let index = CollisionIndex::statics_only(&[]);
        player.update(hold(Direction::Up), 0.1, &index);
        assert_eq!(player.body.current_animation_name(), Some("walk_up"));
        assert_eq!(player.body.animation("walk_up").unwrap().frame_duration_ms, 150.0);

        // unknown animations keep the last one
        player.update(
            PlayerInput {
                direction: Some(Direction::Up),
                toggle_mode: true,
            },
            0.1,
            &index,
        );
        assert_eq!(player.body.current_animation_name(), Some("walk_up"));
    }

    #[test]
    fn test_facing_persists_while_idle() {
        let index = CollisionIndex::statics_only(&[]);
        let mut player = player_at(0.0, 0.0, 32.0);
        player.update(hold(Direction::Left), 0.5, &index);
        player.update(PlayerInput::default(), 0.1, &index);
        player.update(PlayerInput::default(), 0.1, &index);
        assert_eq!(player.facing, Direction::Left);
        assert_eq!(player.desired_animation(), "idle_left");
    }
}
