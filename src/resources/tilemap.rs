//! Tile map resource.
//!
//! [`TileMap`] is built once from a [`MapDescription`] and owns everything the
//! world needs from the map at runtime:
//!
//! - tilesets with their texture keys and global id ranges
//! - tile layers (raw global ids, flip flags still packed in)
//! - the animated-tile table, one playback cursor per animated tile definition
//! - static collision rectangles from the collision object layer
//! - NPC spawn records from the NPC object layer
//! - the player spawn point
//!
//! # Global ids
//!
//! A global tile id (gid) is unique across all tilesets of a map. Its three
//! high bits carry flip flags (see [`decode_gid`]); the rest is the base id.
//! The base id belongs to the tileset whose `[first_gid, first_gid + tile_count)`
//! range contains it. A gid of 0 is an empty cell.
//!
//! # Error policy
//!
//! Failing to read or parse the description is fatal ([`MapLoadError`]). A
//! tileset image that cannot be decoded, a gid without an owning tileset or an
//! unknown layer name only drop the affected tiles from rendering.

use std::fs;
use std::path::{Path, PathBuf};

use bevy_ecs::prelude::Resource;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::rect::Rect;
use crate::resources::mapdescription::{
    LayerDescription, MapDescription, ObjectLayerDescription, TileData, TileLayerDescription,
    TilesetDescription,
};
use crate::resources::texturestore::{TextureInfo, TextureService};
use crate::systems::render::RenderTarget;

pub const FLIPPED_HORIZONTALLY: u32 = 0x8000_0000;
pub const FLIPPED_VERTICALLY: u32 = 0x4000_0000;
pub const FLIPPED_DIAGONALLY: u32 = 0x2000_0000;
/// All orientation bits packed into a gid.
pub const FLIP_MASK: u32 = FLIPPED_HORIZONTALLY | FLIPPED_VERTICALLY | FLIPPED_DIAGONALLY;

/// Orientation flags decoded from a gid. The diagonal flag is decoded but not
/// applied when drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileFlip {
    pub horizontal: bool,
    pub vertical: bool,
    pub diagonal: bool,
}

/// Split a raw gid into its base id and flip flags.
pub fn decode_gid(gid: u32) -> (u32, TileFlip) {
    let flip = TileFlip {
        horizontal: gid & FLIPPED_HORIZONTALLY != 0,
        vertical: gid & FLIPPED_VERTICALLY != 0,
        diagonal: gid & FLIPPED_DIAGONALLY != 0,
    };
    (gid & !FLIP_MASK, flip)
}

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("infinite maps are not supported")]
    InfiniteMap,
    #[error("tile layer '{layer}' uses unsupported encoding '{encoding}'")]
    UnsupportedEncoding { layer: String, encoding: String },
    #[error("tile layer '{layer}' has {actual} cells, expected {expected}")]
    LayerSize {
        layer: String,
        expected: usize,
        actual: usize,
    },
    #[error("tilesets '{first}' and '{second}' have overlapping global id ranges")]
    OverlappingTilesets { first: String, second: String },
}

/// Names of the object layers and objects the engine gives meaning to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConventions {
    pub collision_layer: String,
    pub npc_layer: String,
    pub spawn_layer: String,
    pub spawn_object: String,
}

impl Default for MapConventions {
    fn default() -> Self {
        Self {
            collision_layer: "CollisionObject".to_string(),
            npc_layer: "PNJObject".to_string(),
            spawn_layer: "PlayerObject".to_string(),
            spawn_object: "PlayerSpawn".to_string(),
        }
    }
}

/// A tileset with its resolved texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub name: String,
    pub first_gid: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_count: u32,
    pub image_width: u32,
    pub image_height: u32,
    /// Texture key, `None` when the image could not be decoded.
    pub texture: Option<String>,
}

impl Tileset {
    /// Whether `gid` (without flip bits) falls in this tileset's range.
    pub fn contains(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid - self.first_gid < self.tile_count
    }

    pub fn tiles_per_row(&self) -> u32 {
        if self.tile_width == 0 {
            return 1;
        }
        (self.image_width / self.tile_width).max(1)
    }

    /// Pixel rectangle of `gid` inside the tileset image.
    pub fn source_rect(&self, gid: u32) -> Option<Rect> {
        if !self.contains(gid) {
            return None;
        }
        let local_id = gid - self.first_gid;
        let per_row = self.tiles_per_row();
        let column = local_id % per_row;
        let row = local_id / per_row;
        Some(Rect::new(
            (column * self.tile_width) as i32,
            (row * self.tile_height) as i32,
            self.tile_width as i32,
            self.tile_height as i32,
        ))
    }
}

/// Playback state of one animated tile definition.
///
/// Every cell showing this tile draws the same current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedTile {
    pub base_gid: u32,
    /// Frame gids in playback order.
    pub frames: Vec<u32>,
    /// Tick interval, taken from the first frame's duration.
    pub frame_duration_ms: u32,
    pub current_frame: usize,
    last_advance_ms: f64,
}

impl AnimatedTile {
    pub fn new(base_gid: u32, frames: Vec<u32>, frame_duration_ms: u32) -> Self {
        Self {
            base_gid,
            frames,
            frame_duration_ms,
            current_frame: 0,
            last_advance_ms: 0.0,
        }
    }

    pub fn current_gid(&self) -> u32 {
        self.frames
            .get(self.current_frame)
            .copied()
            .unwrap_or(self.base_gid)
    }

    /// Advance to the frame matching the clock value `now_ms`. Always loops.
    fn advance_to(&mut self, now_ms: f64) {
        let frame_count = self.frames.len();
        if frame_count == 0 {
            return;
        }
        if self.frame_duration_ms == 0 {
            self.current_frame = (self.current_frame + 1) % frame_count;
            self.last_advance_ms = now_ms;
            return;
        }
        let duration = f64::from(self.frame_duration_ms);
        let elapsed = now_ms - self.last_advance_ms;
        if elapsed < duration {
            return;
        }
        let steps = (elapsed / duration).floor();
        self.current_frame = (self.current_frame + (steps as usize % frame_count)) % frame_count;
        self.last_advance_ms += steps * duration;
    }
}

/// Static collision geometry from the collision object layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionRect {
    pub rect: Rect,
    pub name: Option<String>,
}

/// NPC definition extracted from the NPC object layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NpcSpawn {
    pub name: String,
    pub sprite_path: Option<String>,
    pub speed: f32,
    /// Initial facing as stored in the map (0 up, 1 down, 2 left, 3 right).
    pub direction: i32,
    pub traversable: bool,
    pub x: f32,
    pub y: f32,
}

/// A grid of raw gids.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub gids: Vec<u32>,
    pub visible: bool,
}

impl TileLayer {
    pub fn gid_at(&self, column: u32, row: u32) -> Option<u32> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.gids.get((row * self.width + column) as usize).copied()
    }
}

/// The loaded map.
#[derive(Resource, Debug)]
pub struct TileMap {
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Grid cell size in pixels.
    pub tile_width: u32,
    pub tile_height: u32,
    tilesets: Vec<Tileset>,
    layers: Vec<TileLayer>,
    animated_tiles: FxHashMap<u32, AnimatedTile>,
    collisions: Vec<CollisionRect>,
    npc_spawns: Vec<NpcSpawn>,
    spawn_point: (f32, f32),
    clock_ms: f64,
}

impl TileMap {
    /// Read and build a map from a Tiled JSON file.
    ///
    /// Tileset images are looked up relative to the map's directory first and
    /// by their raw path second.
    pub fn load(
        path: impl AsRef<Path>,
        conventions: &MapConventions,
        textures: &mut dyn TextureService,
    ) -> Result<Self, MapLoadError> {
        let path = path.as_ref();
        let description: MapDescription = read_json(path)?;
        let map_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let description = resolve_external_tilesets(description, map_dir)?;
        let map = Self::from_description(description, map_dir, conventions, textures)?;
        info!(
            "Loaded map {}: {}x{} tiles, {} tilesets, {} layers, {} animated tiles, {} collisions, {} NPCs",
            path.display(),
            map.width,
            map.height,
            map.tilesets.len(),
            map.layers.len(),
            map.animated_tiles.len(),
            map.collisions.len(),
            map.npc_spawns.len()
        );
        Ok(map)
    }

    /// Build a map from an already parsed description.
    ///
    /// `map_dir` is the primary search path for tileset images. External
    /// tileset references must already be resolved.
    pub fn from_description(
        description: MapDescription,
        map_dir: &Path,
        conventions: &MapConventions,
        textures: &mut dyn TextureService,
    ) -> Result<Self, MapLoadError> {
        if description.infinite {
            return Err(MapLoadError::InfiniteMap);
        }

        let mut tile_layers = Vec::new();
        let mut object_layers = Vec::new();
        flatten_layers(
            &description.layers,
            true,
            &mut tile_layers,
            &mut object_layers,
        );

        let layers = tile_layers
            .into_iter()
            .map(|(layer, visible)| build_tile_layer(layer, visible, &description))
            .collect::<Result<Vec<_>, _>>()?;

        let tilesets = load_tilesets(&description.tilesets, map_dir, textures);
        check_tileset_ranges(&tilesets)?;

        let mut map = TileMap {
            width: description.width,
            height: description.height,
            tile_width: description.tile_width,
            tile_height: description.tile_height,
            tilesets,
            layers,
            animated_tiles: load_animated_tiles(&description.tilesets),
            collisions: load_collisions(&object_layers, &conventions.collision_layer),
            npc_spawns: load_npc_spawns(&object_layers, &conventions.npc_layer),
            spawn_point: (0.0, 0.0),
            clock_ms: 0.0,
        };
        map.spawn_point = load_spawn_point(
            &object_layers,
            &conventions.spawn_layer,
            &conventions.spawn_object,
        );

        let unresolved = map.unresolved_gids();
        if !unresolved.is_empty() {
            warn!(
                "{} tile ids have no owning tileset and will not be drawn: {:?}",
                unresolved.len(),
                unresolved
            );
        }
        map.debug_dump();
        Ok(map)
    }

    /// Advance every animated tile by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.clock_ms += f64::from(dt) * 1000.0;
        let now = self.clock_ms;
        for tile in self.animated_tiles.values_mut() {
            tile.advance_to(now);
        }
    }

    /// Draw a tile layer by name, visible or not.
    ///
    /// Returns false (and logs) when no tile layer has that name.
    pub fn render_layer(&self, name: &str, target: &mut dyn RenderTarget) -> bool {
        match self.layers.iter().find(|l| l.name == name) {
            Some(layer) => {
                self.render_tile_layer(layer, target);
                true
            }
            None => {
                warn!("Layer '{}' not found", name);
                false
            }
        }
    }

    /// Draw every visible tile layer in map order.
    pub fn render_all_visible_layers(&self, target: &mut dyn RenderTarget) {
        self.render_layers_where(target, |_| true);
    }

    /// Draw the visible tile layers accepted by `filter`, in map order.
    pub fn render_layers_where(
        &self,
        target: &mut dyn RenderTarget,
        mut filter: impl FnMut(&TileLayer) -> bool,
    ) {
        for layer in self.layers.iter().filter(|l| l.visible) {
            if filter(layer) {
                self.render_tile_layer(layer, target);
            }
        }
    }

    fn render_tile_layer(&self, layer: &TileLayer, target: &mut dyn RenderTarget) {
        let cell_w = self.tile_width as i32;
        let cell_h = self.tile_height as i32;
        for row in 0..layer.height {
            for column in 0..layer.width {
                let Some(gid) = layer.gid_at(column, row) else {
                    continue;
                };
                if gid == 0 {
                    continue;
                }
                let (base_gid, flip) = decode_gid(gid);
                let frame_gid = self.current_frame_gid(base_gid);
                let Some(tileset) = self.tileset_for_gid(frame_gid) else {
                    continue;
                };
                let Some(texture) = tileset.texture.as_deref() else {
                    continue;
                };
                let Some(src) = tileset.source_rect(frame_gid) else {
                    continue;
                };
                let dst = Rect::new(column as i32 * cell_w, row as i32 * cell_h, cell_w, cell_h);
                target.draw_texture(texture, src, dst, flip);
            }
        }
    }

    /// True iff `rect` overlaps any static collision rectangle.
    pub fn check_collision(&self, rect: &Rect) -> bool {
        self.collisions.iter().any(|c| rect.intersects(&c.rect))
    }

    pub fn spawn_position(&self) -> (f32, f32) {
        self.spawn_point
    }

    /// Tileset owning a base gid.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<&Tileset> {
        self.tilesets.iter().find(|t| t.contains(gid))
    }

    /// The gid to draw for `base_gid` right now: the animation's current frame
    /// for animated tiles, `base_gid` itself otherwise.
    pub fn current_frame_gid(&self, base_gid: u32) -> u32 {
        self.animated_tiles
            .get(&base_gid)
            .map(AnimatedTile::current_gid)
            .unwrap_or(base_gid)
    }

    pub fn animated_tile(&self, base_gid: u32) -> Option<&AnimatedTile> {
        self.animated_tiles.get(&base_gid)
    }

    /// Distinct non-empty base gids used by tile layers that no tileset owns.
    pub fn unresolved_gids(&self) -> Vec<u32> {
        let mut missing: Vec<u32> = self
            .layers
            .iter()
            .flat_map(|l| l.gids.iter())
            .filter(|&&gid| gid != 0)
            .map(|&gid| decode_gid(gid).0)
            .filter(|&gid| self.tileset_for_gid(gid).is_none())
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    pub fn tilesets(&self) -> &[Tileset] {
        &self.tilesets
    }

    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    pub fn collisions(&self) -> &[CollisionRect] {
        &self.collisions
    }

    pub fn npc_spawns(&self) -> &[NpcSpawn] {
        &self.npc_spawns
    }

    /// Map size in pixels.
    pub fn pixel_size(&self) -> (i32, i32) {
        (
            (self.width * self.tile_width) as i32,
            (self.height * self.tile_height) as i32,
        )
    }

    fn debug_dump(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        debug!("--- collisions ({}) ---", self.collisions.len());
        for (i, c) in self.collisions.iter().enumerate() {
            debug!(
                "collision {}: name={} rect=({}, {}, {}, {})",
                i,
                c.name.as_deref().unwrap_or("N/A"),
                c.rect.x,
                c.rect.y,
                c.rect.w,
                c.rect.h
            );
        }
        debug!("--- NPCs ({}) ---", self.npc_spawns.len());
        for (i, npc) in self.npc_spawns.iter().enumerate() {
            debug!(
                "npc {}: name={} sprite={} speed={:.2} dir={} traversable={} at ({:.1}, {:.1})",
                i,
                npc.name,
                npc.sprite_path.as_deref().unwrap_or("N/A"),
                npc.speed,
                npc.direction,
                npc.traversable,
                npc.x,
                npc.y
            );
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, MapLoadError> {
    let text = fs::read_to_string(path).map_err(|source| MapLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| MapLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace tileset references (`source`) by the external tileset contents.
fn resolve_external_tilesets(
    mut description: MapDescription,
    map_dir: &Path,
) -> Result<MapDescription, MapLoadError> {
    for tileset in description.tilesets.iter_mut() {
        if let Some(source) = tileset.source.clone() {
            let external: TilesetDescription = read_json(&map_dir.join(&source))?;
            *tileset = tileset.resolved_with(external);
        }
    }
    Ok(description)
}

/// Collect tile and object layers in document order, descending into groups.
/// A layer inside an invisible group is invisible.
fn flatten_layers<'a>(
    layers: &'a [LayerDescription],
    parent_visible: bool,
    tiles: &mut Vec<(&'a TileLayerDescription, bool)>,
    objects: &mut Vec<&'a ObjectLayerDescription>,
) {
    for layer in layers {
        match layer {
            LayerDescription::Tiles(tl) => tiles.push((tl, parent_visible && tl.visible)),
            LayerDescription::Objects(ol) => objects.push(ol),
            LayerDescription::Group(group) => flatten_layers(
                &group.layers,
                parent_visible && group.visible,
                tiles,
                objects,
            ),
            LayerDescription::Image(_) => {}
        }
    }
}

fn build_tile_layer(
    layer: &TileLayerDescription,
    visible: bool,
    map: &MapDescription,
) -> Result<TileLayer, MapLoadError> {
    let gids = match &layer.data {
        TileData::Ids(ids) => ids.clone(),
        TileData::Encoded(_) => {
            return Err(MapLoadError::UnsupportedEncoding {
                layer: layer.name.clone(),
                encoding: layer
                    .encoding
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            });
        }
    };
    let width = if layer.width == 0 { map.width } else { layer.width };
    let height = if layer.height == 0 {
        map.height
    } else {
        layer.height
    };
    let expected = width as usize * height as usize;
    if gids.len() != expected {
        return Err(MapLoadError::LayerSize {
            layer: layer.name.clone(),
            expected,
            actual: gids.len(),
        });
    }
    Ok(TileLayer {
        name: layer.name.clone(),
        width,
        height,
        gids,
        visible,
    })
}

/// Resolve every tileset image to a texture. Unresolved images only disable
/// drawing for that tileset.
fn load_tilesets(
    descriptions: &[TilesetDescription],
    map_dir: &Path,
    textures: &mut dyn TextureService,
) -> Vec<Tileset> {
    descriptions
        .iter()
        .map(|desc| {
            let info = desc
                .image
                .as_deref()
                .and_then(|image| resolve_tileset_texture(image, map_dir, textures));
            let (image_width, image_height) = match &info {
                Some(info) if desc.image_width == 0 => (info.width as u32, info.height as u32),
                _ => (desc.image_width, desc.image_height),
            };
            Tileset {
                name: desc.name.clone(),
                first_gid: desc.first_gid,
                tile_width: desc.tile_width,
                tile_height: desc.tile_height,
                tile_count: desc.tile_count,
                image_width,
                image_height,
                texture: info.map(|i| i.key),
            }
        })
        .collect()
}

fn resolve_tileset_texture(
    image: &str,
    map_dir: &Path,
    textures: &mut dyn TextureService,
) -> Option<TextureInfo> {
    let primary = map_dir.join(image);
    match textures.load_texture(&primary) {
        Ok(info) => Some(info),
        Err(first) => match textures.load_texture(Path::new(image)) {
            Ok(info) => Some(info),
            Err(second) => {
                warn!("Tileset image '{}' not loaded: {}; {}", image, first, second);
                None
            }
        },
    }
}

fn check_tileset_ranges(tilesets: &[Tileset]) -> Result<(), MapLoadError> {
    let mut sorted: Vec<&Tileset> = tilesets.iter().collect();
    sorted.sort_by_key(|t| t.first_gid);
    for pair in sorted.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if u64::from(a.first_gid) + u64::from(a.tile_count) > u64::from(b.first_gid) {
            return Err(MapLoadError::OverlappingTilesets {
                first: a.name.clone(),
                second: b.name.clone(),
            });
        }
    }
    Ok(())
}

fn load_animated_tiles(descriptions: &[TilesetDescription]) -> FxHashMap<u32, AnimatedTile> {
    let mut animated = FxHashMap::default();
    for tileset in descriptions {
        for tile in tileset.tiles.iter().filter(|t| !t.animation.is_empty()) {
            let base_gid = tileset.first_gid.checked_add(tile.id);
            let frames: Option<Vec<u32>> = tile
                .animation
                .iter()
                .map(|frame| tileset.first_gid.checked_add(frame.tile_id))
                .collect();
            let (Some(base_gid), Some(frames)) = (base_gid, frames) else {
                warn!(
                    "Tileset '{}': animated tile {} has ids out of range, skipped",
                    tileset.name, tile.id
                );
                continue;
            };
            let duration = tile.animation[0].duration;
            animated.insert(base_gid, AnimatedTile::new(base_gid, frames, duration));
        }
    }
    animated
}

fn find_object_layer<'a>(
    layers: &[&'a ObjectLayerDescription],
    name: &str,
) -> Option<&'a ObjectLayerDescription> {
    layers.iter().copied().find(|l| l.name == name)
}

fn load_collisions(layers: &[&ObjectLayerDescription], layer_name: &str) -> Vec<CollisionRect> {
    let Some(layer) = find_object_layer(layers, layer_name) else {
        debug!("No '{}' layer, map has no collisions", layer_name);
        return Vec::new();
    };
    layer
        .objects
        .iter()
        .map(|obj| CollisionRect {
            rect: Rect::new(
                obj.x as i32,
                obj.y as i32,
                obj.width as i32,
                obj.height as i32,
            ),
            name: (!obj.name.is_empty()).then(|| obj.name.clone()),
        })
        .collect()
}

fn load_npc_spawns(layers: &[&ObjectLayerDescription], layer_name: &str) -> Vec<NpcSpawn> {
    let Some(layer) = find_object_layer(layers, layer_name) else {
        return Vec::new();
    };
    layer
        .objects
        .iter()
        .filter_map(|obj| {
            let name = obj.string_property("Name")?;
            Some(NpcSpawn {
                name,
                sprite_path: obj.string_property("sprite"),
                speed: obj.float_property("speed").unwrap_or_default() as f32,
                direction: obj.int_property("dir").unwrap_or_default() as i32,
                traversable: obj.bool_property("Hitbox").map(|h| !h).unwrap_or_default(),
                x: obj.x as f32,
                y: obj.y as f32,
            })
        })
        .collect()
}

fn load_spawn_point(
    layers: &[&ObjectLayerDescription],
    layer_name: &str,
    object_name: &str,
) -> (f32, f32) {
    find_object_layer(layers, layer_name)
        .and_then(|layer| layer.objects.iter().find(|o| o.name == object_name))
        .map(|obj| (obj.x as f32, obj.y as f32))
        .unwrap_or_else(|| {
            info!("No '{}' object, spawning at (0, 0)", object_name);
            (0.0, 0.0)
        })
}
