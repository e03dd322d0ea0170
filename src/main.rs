//! Tilewalker main entry point.
//!
//! A top-down tile-map walker written in Rust using:
//! - **raylib** for windowing, input, textures and drawing
//! - **bevy_ecs** for the world, resources and the update schedule
//!
//! # Main Loop
//!
//! 1. Read `config.ini` (or `--config`), open the window
//! 2. Load the map, spawn the player and the map's NPCs
//! 3. Every frame:
//!    - poll the keyboard into `InputState`, update `WorldTime`
//!    - run the update schedule (tile/actor animation, player, NPCs)
//!    - draw the world through a 2D camera centred on the player
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --map assets/maps/town.tmj
//! ```

// Do not create console on Windows
#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use std::path::PathBuf;

use bevy_ecs::prelude::*;
use clap::Parser;
use raylib::prelude::*;

use tilewalker::components::actor::Actor;
use tilewalker::components::player::Player;
use tilewalker::game::{build_schedule, setup_world};
use tilewalker::resources::debugmode::DebugMode;
use tilewalker::resources::gameconfig::GameConfig;
use tilewalker::resources::texturestore::{RaylibTextureLoader, TextureStore};
use tilewalker::systems::input::{KeyBindings, poll_input};
use tilewalker::systems::render::{RaylibCanvas, render_world};
use tilewalker::systems::time::update_world_time;

/// Tilewalker: walk around a Tiled map
#[derive(Parser)]
#[command(version, about = "Walk around a Tiled map with wandering NPCs.")]
struct Cli {
    /// INI configuration file (default: ./config.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Map file to load, overriding the configuration.
    #[arg(long, value_name = "PATH")]
    map: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => GameConfig::with_path(path),
        None => GameConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        log::warn!("{} ({}), using defaults", e, config.config_path.display());
    }
    if let Some(map) = cli.map {
        config.map_path = map;
    }

    // --------------- Raylib window ---------------
    let mut builder = raylib::init();
    builder
        .size(config.window_width as i32, config.window_height as i32)
        .resizable()
        .title(&config.title);
    if config.vsync {
        builder.vsync();
    }
    let (mut rl, thread) = builder.build();
    rl.set_target_fps(config.target_fps);

    // --------------- ECS world ---------------
    let mut textures = TextureStore::new();
    let mut world = World::new();
    {
        let mut loader = RaylibTextureLoader {
            rl: &mut rl,
            thread: &thread,
            store: &mut textures,
        };
        if let Err(e) = setup_world(&mut world, &config, &mut loader) {
            log::error!("Failed to load map {}: {}", config.map_path.display(), e);
            std::process::exit(1);
        }
    }

    let mut update = build_schedule();
    let bindings = KeyBindings::default();
    let mut camera = Camera2D {
        target: Vector2::zero(),
        offset: Vector2::zero(),
        rotation: 0.0,
        zoom: config.zoom,
    };
    let mut players = world.query::<&Player>();

    // --------------- Main loop ---------------
    while !rl.window_should_close() {
        let dt = rl.get_frame_time();
        poll_input(&mut world, &rl, &bindings);
        update_world_time(&mut world, dt);
        update.run(&mut world);

        camera.offset = Vector2 {
            x: rl.get_screen_width() as f32 * 0.5,
            y: rl.get_screen_height() as f32 * 0.5,
        };
        if let Some(player) = players.iter(&world).next() {
            let (x, y) = player.position();
            let (w, h) = player.body().sprite_size();
            camera.target = Vector2 {
                x: x + w as f32 * 0.5,
                y: y + h as f32 * 0.5,
            };
        }

        let mut d = rl.begin_drawing(&thread);
        d.clear_background(Color::BLACK);
        {
            let mut d2 = d.begin_mode2D(camera);
            let mut canvas = RaylibCanvas {
                d: &mut d2,
                textures: &textures,
            };
            render_world(&mut world, &mut canvas);
        }
        if world.contains_resource::<DebugMode>() {
            d.draw_fps(10, 10);
        }
    }
}
