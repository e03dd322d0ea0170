//! Game configuration resource.
//!
//! Settings loaded from an INI configuration file, with safe defaults when the
//! file or a key is missing.
//!
//! # Configuration File Format
//!
//! ```ini
//! [window]
//! width = 1280
//! height = 720
//! target_fps = 60
//! vsync = true
//! title = tilewalker
//!
//! [render]
//! zoom = 3.0
//! overlay_layers = Roofs, Treetops
//!
//! [map]
//! path = ./assets/maps/town.tmj
//! collision_layer = CollisionObject
//! npc_layer = PNJObject
//! spawn_layer = PlayerObject
//! spawn_object = PlayerSpawn
//!
//! [player]
//! walk_sheet = ./assets/sprites/player_walk.png
//! run_sheet = ./assets/sprites/player_run.png
//! bike_sheet = ./assets/sprites/player_bike.png
//! sprite_width = 16
//! sprite_height = 16
//! hitbox_width = 12
//! hitbox_height = 8
//! walk_speed = 64
//! run_speed = 128
//! bike_speed = 160
//! grid_size = 16
//!
//! [npc]
//! default_sprite = ./assets/sprites/npc.png
//! sprite_width = 16
//! sprite_height = 16
//! hitbox_width = 12
//! hitbox_height = 8
//! collide_with_map = false
//! seed = 1234
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::components::player::PlayerSpeeds;
use crate::resources::tilemap::MapConventions;

const DEFAULT_WINDOW_WIDTH: u32 = 1280;
const DEFAULT_WINDOW_HEIGHT: u32 = 720;
const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_VSYNC: bool = true;
const DEFAULT_TITLE: &str = "tilewalker";
const DEFAULT_ZOOM: f32 = 3.0;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";
const DEFAULT_MAP_PATH: &str = "./assets/maps/map.tmj";
const DEFAULT_SPRITE_SIZE: i32 = 16;
const DEFAULT_HITBOX_WIDTH: i32 = 12;
const DEFAULT_HITBOX_HEIGHT: i32 = 8;
const DEFAULT_GRID_SIZE: f32 = 16.0;

/// Sprite and hitbox sizes for one kind of actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorSizes {
    pub sprite_width: i32,
    pub sprite_height: i32,
    pub hitbox_width: i32,
    pub hitbox_height: i32,
}

impl Default for ActorSizes {
    fn default() -> Self {
        Self {
            sprite_width: DEFAULT_SPRITE_SIZE,
            sprite_height: DEFAULT_SPRITE_SIZE,
            hitbox_width: DEFAULT_HITBOX_WIDTH,
            hitbox_height: DEFAULT_HITBOX_HEIGHT,
        }
    }
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub target_fps: u32,
    pub vsync: bool,
    pub title: String,
    /// Camera zoom applied to the world.
    pub zoom: f32,
    /// Tile layers drawn above the actors.
    pub overlay_layers: Vec<String>,
    pub map_path: PathBuf,
    pub conventions: MapConventions,
    pub player_walk_sheet: PathBuf,
    /// Optional sheets; the mode still works without them, minus animations.
    pub player_run_sheet: Option<PathBuf>,
    pub player_bike_sheet: Option<PathBuf>,
    pub player_sizes: ActorSizes,
    pub player_speeds: PlayerSpeeds,
    pub grid_size: f32,
    /// Sheet for NPCs whose map entry has no `sprite` property.
    pub npc_default_sprite: Option<PathBuf>,
    pub npc_sizes: ActorSizes,
    pub npc_collide_with_map: bool,
    /// Seed for NPC randomness. `None` seeds from entropy.
    pub npc_seed: Option<u64>,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GameConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            target_fps: DEFAULT_TARGET_FPS,
            vsync: DEFAULT_VSYNC,
            title: DEFAULT_TITLE.to_string(),
            zoom: DEFAULT_ZOOM,
            overlay_layers: Vec::new(),
            map_path: PathBuf::from(DEFAULT_MAP_PATH),
            conventions: MapConventions::default(),
            player_walk_sheet: PathBuf::from("./assets/sprites/player_walk.png"),
            player_run_sheet: None,
            player_bike_sheet: None,
            player_sizes: ActorSizes::default(),
            player_speeds: PlayerSpeeds::default(),
            grid_size: DEFAULT_GRID_SIZE,
            npc_default_sprite: None,
            npc_sizes: ActorSizes::default(),
            npc_collide_with_map: false,
            npc_seed: None,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        let uint = |section: &str, key: &str| config.getuint(section, key).ok().flatten();
        let int = |section: &str, key: &str| config.getint(section, key).ok().flatten();
        let float = |section: &str, key: &str| config.getfloat(section, key).ok().flatten();
        let boolean = |section: &str, key: &str| config.getbool(section, key).ok().flatten();
        let text = |section: &str, key: &str| {
            config
                .get(section, key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        // [window] section
        if let Some(width) = uint("window", "width") {
            self.window_width = width as u32;
        }
        if let Some(height) = uint("window", "height") {
            self.window_height = height as u32;
        }
        if let Some(fps) = uint("window", "target_fps") {
            self.target_fps = fps as u32;
        }
        if let Some(vsync) = boolean("window", "vsync") {
            self.vsync = vsync;
        }
        if let Some(title) = text("window", "title") {
            self.title = title;
        }

        // [render] section
        if let Some(zoom) = float("render", "zoom") {
            self.zoom = zoom as f32;
        }
        if let Some(layers) = text("render", "overlay_layers") {
            self.overlay_layers = layers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        // [map] section
        if let Some(path) = text("map", "path") {
            self.map_path = PathBuf::from(path);
        }
        if let Some(name) = text("map", "collision_layer") {
            self.conventions.collision_layer = name;
        }
        if let Some(name) = text("map", "npc_layer") {
            self.conventions.npc_layer = name;
        }
        if let Some(name) = text("map", "spawn_layer") {
            self.conventions.spawn_layer = name;
        }
        if let Some(name) = text("map", "spawn_object") {
            self.conventions.spawn_object = name;
        }

        // [player] section
        if let Some(path) = text("player", "walk_sheet") {
            self.player_walk_sheet = PathBuf::from(path);
        }
        if let Some(path) = text("player", "run_sheet") {
            self.player_run_sheet = Some(PathBuf::from(path));
        }
        if let Some(path) = text("player", "bike_sheet") {
            self.player_bike_sheet = Some(PathBuf::from(path));
        }
        read_sizes(&int, "player", &mut self.player_sizes);
        if let Some(speed) = float("player", "walk_speed") {
            self.player_speeds.walk = speed as f32;
        }
        if let Some(speed) = float("player", "run_speed") {
            self.player_speeds.run = speed as f32;
        }
        if let Some(speed) = float("player", "bike_speed") {
            self.player_speeds.bike = speed as f32;
        }
        if let Some(grid) = float("player", "grid_size") {
            self.grid_size = grid as f32;
        }

        // [npc] section
        if let Some(path) = text("npc", "default_sprite") {
            self.npc_default_sprite = Some(PathBuf::from(path));
        }
        read_sizes(&int, "npc", &mut self.npc_sizes);
        if let Some(collide) = boolean("npc", "collide_with_map") {
            self.npc_collide_with_map = collide;
        }
        if let Some(seed) = uint("npc", "seed") {
            self.npc_seed = Some(seed);
        }

        info!(
            "Loaded config: {}x{} window, fps={}, vsync={}, zoom={:.1}, map={}",
            self.window_width,
            self.window_height,
            self.target_fps,
            self.vsync,
            self.zoom,
            self.map_path.display()
        );
    }

    /// Get the window size.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Whether tile layer `name` is drawn above the actors.
    pub fn is_overlay_layer(&self, name: &str) -> bool {
        self.overlay_layers.iter().any(|l| l == name)
    }
}

fn read_sizes(int: &dyn Fn(&str, &str) -> Option<i64>, section: &str, sizes: &mut ActorSizes) {
    if let Some(v) = int(section, "sprite_width") {
        sizes.sprite_width = v as i32;
    }
    if let Some(v) = int(section, "sprite_height") {
        sizes.sprite_height = v as i32;
    }
    if let Some(v) = int(section, "hitbox_width") {
        sizes.hitbox_width = v as i32;
    }
    if let Some(v) = int(section, "hitbox_height") {
        sizes.hitbox_height = v as i32;
    }
}
