//! Sprite-sheet animation shared by every actor.
//!
//! An [`AnimatedEntity`] owns a position, a hitbox size and a set of named
//! sprite sheets and animations. Each animation is bound to one sheet at
//! registration and holds a strip of frame rectangles taken from a single row
//! of that sheet.
//!
//! # Playback
//!
//! - The first animation registered becomes current, at frame 0.
//! - [`AnimatedEntity::set_animation`] is a no-op for the current animation;
//!   switching rewinds to frame 0 and unpauses.
//! - [`AnimatedEntity::update_animation`] accumulates milliseconds and steps
//!   one frame per elapsed frame duration. Looping animations wrap to frame 0;
//!   the others hold the last frame and pause.
//!
//! Registration errors (duplicate names, unknown sheets or animations) are
//! returned as [`AnimationError`] and leave the entity unchanged.

use std::path::Path;

use log::warn;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::components::boxcollider::BoxCollider;
use crate::rect::Rect;
use crate::resources::texturestore::{TextureError, TextureService};
use crate::resources::tilemap::TileFlip;
use crate::systems::render::RenderTarget;

#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("sprite sheet '{0}' is already registered")]
    DuplicateSpriteSheet(String),
    #[error("animation '{0}' is already registered")]
    DuplicateAnimation(String),
    #[error("animation '{animation}' refers to unknown sprite sheet '{sheet}'")]
    UnknownSpriteSheet { sheet: String, animation: String },
    #[error("unknown animation '{0}'")]
    UnknownAnimation(String),
    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// A texture cut into equally sized cells.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheet {
    pub name: String,
    pub texture: String,
    pub width: i32,
    pub height: i32,
    pub cell_width: i32,
    pub cell_height: i32,
}

/// A named strip of frames on one sprite sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Index into the owner's sprite sheets.
    pub sheet: usize,
    pub frames: Vec<Rect>,
    pub frame_duration_ms: f32,
    pub looped: bool,
}

#[derive(Debug, Clone)]
pub struct AnimatedEntity {
    pub x: f32,
    pub y: f32,
    pub collider: BoxCollider,
    /// A traversable actor never blocks another actor's movement.
    pub traversable: bool,
    sprite_width: i32,
    sprite_height: i32,
    sheets: Vec<SpriteSheet>,
    sheet_index: FxHashMap<String, usize>,
    animations: Vec<AnimationClip>,
    animation_index: FxHashMap<String, usize>,
    current: Option<usize>,
    frame_index: usize,
    frame_timer_ms: f32,
    paused: bool,
}

impl AnimatedEntity {
    /// Entity at `(x, y)` with an initial sprite size. The sprite size then
    /// follows the cell size of the current animation's sheet.
    pub fn new(x: f32, y: f32, sprite_width: i32, sprite_height: i32, collider: BoxCollider) -> Self {
        Self {
            x,
            y,
            collider,
            traversable: false,
            sprite_width,
            sprite_height,
            sheets: Vec::new(),
            sheet_index: FxHashMap::default(),
            animations: Vec::new(),
            animation_index: FxHashMap::default(),
            current: None,
            frame_index: 0,
            frame_timer_ms: 0.0,
            paused: false,
        }
    }

    /// Decode `path` through the texture service and register it as `name`.
    /// Nothing is registered when decoding fails.
    pub fn add_sprite_sheet(
        &mut self,
        textures: &mut dyn TextureService,
        name: &str,
        path: impl AsRef<Path>,
        cell_width: i32,
        cell_height: i32,
    ) -> Result<(), AnimationError> {
        if self.sheet_index.contains_key(name) {
            return Err(AnimationError::DuplicateSpriteSheet(name.to_string()));
        }
        let info = textures.load_texture(path.as_ref())?;
        self.sheet_index.insert(name.to_string(), self.sheets.len());
        self.sheets.push(SpriteSheet {
            name: name.to_string(),
            texture: info.key,
            width: info.width,
            height: info.height,
            cell_width,
            cell_height,
        });
        Ok(())
    }

    /// Register `frame_count` frames of `sheet` starting at cell
    /// (`start_row`, `start_col`) and running right along the row.
    ///
    /// Frames outside the sheet's pixel bounds are kept and logged.
    #[allow(clippy::too_many_arguments)]
    pub fn add_animation(
        &mut self,
        name: &str,
        sheet: &str,
        start_row: i32,
        start_col: i32,
        frame_count: usize,
        frame_duration_ms: f32,
        looped: bool,
    ) -> Result<(), AnimationError> {
        if self.animation_index.contains_key(name) {
            return Err(AnimationError::DuplicateAnimation(name.to_string()));
        }
        let Some(&sheet_idx) = self.sheet_index.get(sheet) else {
            return Err(AnimationError::UnknownSpriteSheet {
                sheet: sheet.to_string(),
                animation: name.to_string(),
            });
        };
        let sheet_ref = &self.sheets[sheet_idx];
        let frames: Vec<Rect> = (0..frame_count as i32)
            .map(|i| {
                Rect::new(
                    (start_col + i) * sheet_ref.cell_width,
                    start_row * sheet_ref.cell_height,
                    sheet_ref.cell_width,
                    sheet_ref.cell_height,
                )
            })
            .collect();
        let sheet_bounds = Rect::new(0, 0, sheet_ref.width, sheet_ref.height);
        for (i, frame) in frames.iter().enumerate() {
            if frame.x < 0
                || frame.y < 0
                || frame.right() > sheet_bounds.right()
                || frame.bottom() > sheet_bounds.bottom()
            {
                warn!(
                    "Animation '{}' frame {} at ({}, {}) exceeds sheet '{}' ({}x{})",
                    name, i, frame.x, frame.y, sheet, sheet_ref.width, sheet_ref.height
                );
            }
        }

        let idx = self.animations.len();
        self.animation_index.insert(name.to_string(), idx);
        self.animations.push(AnimationClip {
            name: name.to_string(),
            sheet: sheet_idx,
            frames,
            frame_duration_ms,
            looped,
        });
        if self.current.is_none() {
            self.switch_to(idx);
        }
        Ok(())
    }

    /// Make `name` the current animation.
    pub fn set_animation(&mut self, name: &str) -> Result<(), AnimationError> {
        let Some(&idx) = self.animation_index.get(name) else {
            return Err(AnimationError::UnknownAnimation(name.to_string()));
        };
        if self.current != Some(idx) {
            self.switch_to(idx);
        }
        Ok(())
    }

    fn switch_to(&mut self, idx: usize) {
        self.current = Some(idx);
        self.frame_index = 0;
        self.frame_timer_ms = 0.0;
        self.paused = false;
        let sheet = &self.sheets[self.animations[idx].sheet];
        self.sprite_width = sheet.cell_width;
        self.sprite_height = sheet.cell_height;
    }

    /// Advance playback by `dt` seconds.
    pub fn update_animation(&mut self, dt: f32) {
        if self.paused {
            return;
        }
        let Some(clip) = self.current.map(|idx| &self.animations[idx]) else {
            return;
        };
        let frame_count = clip.frames.len();
        if frame_count == 0 {
            return;
        }
        let duration = clip.frame_duration_ms;
        let looped = clip.looped;

        self.frame_timer_ms += dt * 1000.0;
        while self.frame_timer_ms >= duration {
            if duration <= 0.0 {
                self.frame_timer_ms = 0.0;
            } else {
                self.frame_timer_ms -= duration;
            }
            self.frame_index += 1;
            if self.frame_index >= frame_count {
                if looped {
                    self.frame_index = 0;
                } else {
                    self.frame_index = frame_count - 1;
                    self.frame_timer_ms = 0.0;
                    self.paused = true;
                    return;
                }
            } else if !looped && self.frame_index == frame_count - 1 {
                self.frame_timer_ms = 0.0;
                self.paused = true;
                return;
            }
            if duration <= 0.0 {
                return;
            }
        }
    }

    pub fn pause_animation(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Blit the current frame at the entity's position.
    pub fn draw(&self, target: &mut dyn RenderTarget) {
        let Some(clip) = self.current.map(|idx| &self.animations[idx]) else {
            return;
        };
        let sheet = &self.sheets[clip.sheet];
        if !target.has_texture(&sheet.texture) {
            return;
        }
        let Some(&src) = clip.frames.get(self.frame_index) else {
            return;
        };
        let dst = Rect::new(self.x.floor() as i32, self.y.floor() as i32, src.w, src.h);
        target.draw_texture(&sheet.texture, src, dst, TileFlip::default());
    }

    pub fn hitbox(&self) -> Rect {
        self.hitbox_at(self.x, self.y)
    }

    /// Hitbox the entity would have at `(x, y)`.
    pub fn hitbox_at(&self, x: f32, y: f32) -> Rect {
        self.collider
            .hitbox_at(x, y, self.sprite_width, self.sprite_height)
    }

    pub fn sprite_size(&self) -> (i32, i32) {
        (self.sprite_width, self.sprite_height)
    }

    pub fn current_animation_name(&self) -> Option<&str> {
        self.current.map(|idx| self.animations[idx].name.as_str())
    }

    pub fn current_frame_rect(&self) -> Option<Rect> {
        self.current
            .and_then(|idx| self.animations[idx].frames.get(self.frame_index).copied())
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.animation_index.contains_key(name)
    }

    pub fn sprite_sheet(&self, name: &str) -> Option<&SpriteSheet> {
        self.sheet_index.get(name).map(|&idx| &self.sheets[idx])
    }

    pub fn animation(&self, name: &str) -> Option<&AnimationClip> {
        self.animation_index
            .get(name)
            .map(|&idx| &self.animations[idx])
    }

    /// Animations in registration order.
    pub fn animations(&self) -> &[AnimationClip] {
        &self.animations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTextures, RecordingTarget};

    fn entity_with_sheet() -> (AnimatedEntity, FakeTextures) {
        let mut textures = FakeTextures::new().with("hero.png", 64, 64);
        let mut entity = AnimatedEntity::new(10.0, 20.0, 16, 16, BoxCollider::new(12, 8));
        entity
            .add_sprite_sheet(&mut textures, "hero", "hero.png", 16, 16)
            .unwrap();
        (entity, textures)
    }

    #[test]
    fn test_duplicate_sprite_sheet_rejected() {
        let (mut entity, mut textures) = entity_with_sheet();
        let err = entity
            .add_sprite_sheet(&mut textures, "hero", "hero.png", 16, 16)
            .unwrap_err();
        assert!(matches!(err, AnimationError::DuplicateSpriteSheet(name) if name == "hero"));
    }

    #[test]
    fn test_failed_decode_registers_nothing() {
        let (mut entity, mut textures) = entity_with_sheet();
        let err = entity
            .add_sprite_sheet(&mut textures, "ghost", "missing.png", 16, 16)
            .unwrap_err();
        assert!(matches!(err, AnimationError::Texture(_)));
        assert!(entity.sprite_sheet("ghost").is_none());
        // the name is still free
        textures.insert("ghost.png", 32, 32);
        entity
            .add_sprite_sheet(&mut textures, "ghost", "ghost.png", 16, 16)
            .unwrap();
    }

    #[test]
    fn test_first_animation_becomes_current() {
        let (mut entity, _) = entity_with_sheet();
        assert_eq!(entity.current_animation_name(), None);
        entity
            .add_animation("walk_down", "hero", 0, 0, 4, 200.0, true)
            .unwrap();
        entity
            .add_animation("walk_up", "hero", 3, 0, 4, 150.0, true)
            .unwrap();
        assert_eq!(entity.current_animation_name(), Some("walk_down"));
        assert_eq!(entity.frame_index(), 0);
        assert!(!entity.is_paused());
    }

    #[test]
    fn test_frame_rects_follow_row() {
        let (mut entity, _) = entity_with_sheet();
        entity
            .add_animation("walk_left", "hero", 1, 1, 3, 200.0, true)
            .unwrap();
        let clip = entity.animation("walk_left").unwrap();
        assert_eq!(
            clip.frames,
            vec![
                Rect::new(16, 16, 16, 16),
                Rect::new(32, 16, 16, 16),
                Rect::new(48, 16, 16, 16),
            ]
        );
    }

    #[test]
    fn test_out_of_bounds_frames_still_registered() {
        let (mut entity, _) = entity_with_sheet();
        entity
            .add_animation("too_long", "hero", 0, 2, 4, 100.0, true)
            .unwrap();
        assert_eq!(entity.animation("too_long").unwrap().frames.len(), 4);
    }

    #[test]
    fn test_duplicate_and_unknown_sheet_animations_rejected() {
        let (mut entity, _) = entity_with_sheet();
        entity
            .add_animation("idle_down", "hero", 0, 0, 1, 200.0, false)
            .unwrap();
        assert!(matches!(
            entity.add_animation("idle_down", "hero", 1, 0, 1, 200.0, false),
            Err(AnimationError::DuplicateAnimation(_))
        ));
        assert!(matches!(
            entity.add_animation("bike_up", "bike", 0, 0, 4, 200.0, true),
            Err(AnimationError::UnknownSpriteSheet { .. })
        ));
        assert!(!entity.has_animation("bike_up"));
        assert_eq!(entity.animation("idle_down").unwrap().frames[0].y, 0);
    }

    #[test]
    fn test_set_animation_switch_resets_cursor() {
        let (mut entity, _) = entity_with_sheet();
        entity.add_animation("a", "hero", 0, 0, 4, 100.0, true).unwrap();
        entity.add_animation("b", "hero", 1, 0, 4, 100.0, true).unwrap();
        entity.update_animation(0.25);
        assert_eq!(entity.frame_index(), 2);
        entity.pause_animation(true);

        // same animation: nothing changes
        entity.set_animation("a").unwrap();
        assert_eq!(entity.frame_index(), 2);
        assert!(entity.is_paused());

        entity.set_animation("b").unwrap();
        assert_eq!(entity.current_animation_name(), Some("b"));
        assert_eq!(entity.frame_index(), 0);
        assert!(!entity.is_paused());
    }

    #[test]
    fn test_set_unknown_animation_keeps_current() {
        let (mut entity, _) = entity_with_sheet();
        entity.add_animation("a", "hero", 0, 0, 4, 100.0, true).unwrap();
        entity.update_animation(0.1);
        assert!(matches!(
            entity.set_animation("nope"),
            Err(AnimationError::UnknownAnimation(_))
        ));
        assert_eq!(entity.current_animation_name(), Some("a"));
        assert_eq!(entity.frame_index(), 1);
    }

    #[test]
    fn test_looping_animation_wraps() {
        let (mut entity, _) = entity_with_sheet();
        entity.add_animation("a", "hero", 0, 0, 4, 200.0, true).unwrap();
        for k in 0..12usize {
            assert_eq!(entity.frame_index(), k % 4);
            entity.update_animation(0.2);
        }
        assert!(!entity.is_paused());
    }

    #[test]
    fn test_frame_waits_for_duration() {
        let (mut entity, _) = entity_with_sheet();
        entity.add_animation("a", "hero", 0, 0, 4, 200.0, true).unwrap();
        entity.update_animation(0.125);
        assert_eq!(entity.frame_index(), 0);
        entity.update_animation(0.125);
        assert_eq!(entity.frame_index(), 1);
    }

    #[test]
    fn test_non_looping_animation_holds_last_frame() {
        let (mut entity, _) = entity_with_sheet();
        entity
            .add_animation("once", "hero", 0, 0, 3, 100.0, false)
            .unwrap();
        entity.update_animation(0.25);
        assert_eq!(entity.frame_index(), 2);
        assert!(entity.is_paused());
        for _ in 0..50 {
            entity.update_animation(1.0);
        }
        assert_eq!(entity.frame_index(), 2);
        assert!(entity.is_paused());

        // unpausing steps past the end again and holds
        entity.pause_animation(false);
        entity.update_animation(0.1);
        assert_eq!(entity.frame_index(), 2);
        assert!(entity.is_paused());
    }

    #[test]
    fn test_single_frame_non_looping_pauses() {
        let (mut entity, _) = entity_with_sheet();
        entity
            .add_animation("idle_down", "hero", 0, 0, 1, 200.0, false)
            .unwrap();
        entity.update_animation(0.2);
        assert_eq!(entity.frame_index(), 0);
        assert!(entity.is_paused());
    }

    #[test]
    fn test_update_without_animation_is_noop() {
        let (mut entity, _) = entity_with_sheet();
        entity.update_animation(10.0);
        assert_eq!(entity.frame_index(), 0);
        assert_eq!(entity.current_frame_rect(), None);
    }

    #[test]
    fn test_paused_animation_does_not_advance() {
        let (mut entity, _) = entity_with_sheet();
        entity.add_animation("a", "hero", 0, 0, 4, 100.0, true).unwrap();
        entity.pause_animation(true);
        entity.update_animation(1.0);
        assert_eq!(entity.frame_index(), 0);
    }

    #[test]
    fn test_draw_current_frame_at_position() {
        let (mut entity, _) = entity_with_sheet();
        entity.add_animation("a", "hero", 2, 0, 4, 100.0, true).unwrap();
        entity.update_animation(0.1);

        let mut target = RecordingTarget::default();
        entity.draw(&mut target);
        assert_eq!(target.draws.len(), 1);
        let draw = &target.draws[0];
        assert_eq!(draw.key, "hero.png");
        assert_eq!(draw.src, Rect::new(16, 32, 16, 16));
        assert_eq!(draw.dst, Rect::new(10, 20, 16, 16));
        assert_eq!(draw.flip, TileFlip::default());
    }

    #[test]
    fn test_draw_skips_missing_texture() {
        let (mut entity, _) = entity_with_sheet();
        entity.add_animation("a", "hero", 0, 0, 4, 100.0, true).unwrap();
        let mut target = RecordingTarget::without_textures();
        entity.draw(&mut target);
        assert!(target.draws.is_empty());
    }

    #[test]
    fn test_sprite_size_follows_current_sheet() {
        let mut textures = FakeTextures::new()
            .with("walk.png", 64, 64)
            .with("bike.png", 128, 128);
        let mut entity = AnimatedEntity::new(0.0, 0.0, 8, 8, BoxCollider::new(12, 8));
        assert_eq!(entity.sprite_size(), (8, 8));
        entity
            .add_sprite_sheet(&mut textures, "walk", "walk.png", 16, 16)
            .unwrap();
        entity
            .add_sprite_sheet(&mut textures, "bike", "bike.png", 32, 32)
            .unwrap();
        entity.add_animation("walk_down", "walk", 0, 0, 4, 200.0, true).unwrap();
        entity.add_animation("bike_down", "bike", 0, 0, 4, 200.0, true).unwrap();
        assert_eq!(entity.sprite_size(), (16, 16));
        assert_eq!(entity.hitbox(), Rect::new(2, 8, 12, 8));
        entity.set_animation("bike_down").unwrap();
        assert_eq!(entity.sprite_size(), (32, 32));
        assert_eq!(entity.hitbox(), Rect::new(10, 24, 12, 8));
    }
}
