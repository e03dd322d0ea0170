//! Map description data types.
//!
//! Serializable structs mirroring the Tiled JSON map format (`.tmj`). This is
//! the raw, on-disk view of a map: layers with their global tile ids (flip
//! flags still packed in the high bits), object layers with typed properties,
//! and tilesets with optional per-tile animations. [`TileMap`] is built from it.
//!
//! Only what the engine consumes is modelled; unknown fields are ignored.
//!
//! [`TileMap`]: crate::resources::tilemap::TileMap

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of a Tiled JSON map.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapDescription {
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Grid cell width in pixels.
    #[serde(rename = "tilewidth")]
    pub tile_width: u32,
    /// Grid cell height in pixels.
    #[serde(rename = "tileheight")]
    pub tile_height: u32,
    #[serde(default)]
    pub infinite: bool,
    #[serde(default)]
    pub layers: Vec<LayerDescription>,
    #[serde(default)]
    pub tilesets: Vec<TilesetDescription>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum LayerDescription {
    #[serde(rename = "tilelayer")]
    Tiles(TileLayerDescription),
    #[serde(rename = "objectgroup")]
    Objects(ObjectLayerDescription),
    #[serde(rename = "group")]
    Group(GroupLayerDescription),
    #[serde(rename = "imagelayer")]
    Image(ImageLayerDescription),
}

impl LayerDescription {
    pub fn name(&self) -> &str {
        match self {
            LayerDescription::Tiles(l) => &l.name,
            LayerDescription::Objects(l) => &l.name,
            LayerDescription::Group(l) => &l.name,
            LayerDescription::Image(l) => &l.name,
        }
    }
}

/// Raw tile data. Tiled writes either a plain array of ids or an encoded string.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TileData {
    Ids(Vec<u32>),
    Encoded(String),
}

impl Default for TileData {
    fn default() -> Self {
        TileData::Ids(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TileLayerDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub data: TileData,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectLayerDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupLayerDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub layers: Vec<LayerDescription>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageLayerDescription {
    #[serde(default)]
    pub name: String,
}

/// A positioned object inside an object layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectDescription {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub properties: Vec<PropertyDescription>,
}

impl ObjectDescription {
    /// Look up a property by name. The first one wins if a name repeats.
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(PropertyDescription::typed_value)
    }

    pub fn string_property(&self, name: &str) -> Option<String> {
        match self.property(name) {
            Some(PropertyValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int_property(&self, name: &str) -> Option<i64> {
        match self.property(name) {
            Some(PropertyValue::Int(i)) => Some(i),
            _ => None,
        }
    }

    pub fn float_property(&self, name: &str) -> Option<f64> {
        match self.property(name) {
            Some(PropertyValue::Float(f)) => Some(f),
            _ => None,
        }
    }

    pub fn bool_property(&self, name: &str) -> Option<bool> {
        match self.property(name) {
            Some(PropertyValue::Bool(b)) => Some(b),
            _ => None,
        }
    }
}

/// A `{name, type, value}` property entry as written by Tiled.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertyDescription {
    pub name: String,
    #[serde(rename = "type", default = "default_property_type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

/// Typed property value. Tiled types other than string/int/float/bool land in
/// `Other` and never satisfy a typed lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Other(Value),
}

impl PropertyDescription {
    pub fn typed_value(&self) -> PropertyValue {
        match (self.kind.as_str(), &self.value) {
            ("string", Value::String(s)) => PropertyValue::String(s.clone()),
            ("int", Value::Number(n)) => match n.as_i64() {
                Some(i) => PropertyValue::Int(i),
                None => PropertyValue::Other(self.value.clone()),
            },
            ("float", Value::Number(n)) => match n.as_f64() {
                Some(f) => PropertyValue::Float(f),
                None => PropertyValue::Other(self.value.clone()),
            },
            ("bool", Value::Bool(b)) => PropertyValue::Bool(*b),
            _ => PropertyValue::Other(self.value.clone()),
        }
    }
}

/// Tileset entry. When `source` is set the remaining fields live in an
/// external tileset file and are filled in by the loader.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TilesetDescription {
    #[serde(rename = "firstgid", default)]
    pub first_gid: u32,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "tilewidth", default)]
    pub tile_width: u32,
    #[serde(rename = "tileheight", default)]
    pub tile_height: u32,
    #[serde(rename = "tilecount", default)]
    pub tile_count: u32,
    #[serde(default)]
    pub columns: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "imagewidth", default)]
    pub image_width: u32,
    #[serde(rename = "imageheight", default)]
    pub image_height: u32,
    #[serde(default)]
    pub tiles: Vec<TileDescription>,
}

impl TilesetDescription {
    /// Merge an external tileset file into this entry, keeping `firstgid`.
    pub fn resolved_with(&self, external: TilesetDescription) -> TilesetDescription {
        TilesetDescription {
            first_gid: self.first_gid,
            source: self.source.clone(),
            ..external
        }
    }
}

/// Per-tile metadata inside a tileset.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TileDescription {
    /// Tileset-local tile id.
    pub id: u32,
    #[serde(default)]
    pub animation: Vec<FrameDescription>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct FrameDescription {
    /// Tileset-local id of the frame's tile.
    #[serde(rename = "tileid")]
    pub tile_id: u32,
    /// Frame duration in milliseconds.
    pub duration: u32,
}

fn default_visible() -> bool {
    true
}

fn default_property_type() -> String {
    "string".to_string()
}
