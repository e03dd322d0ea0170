//! Test doubles for the texture and render seams.

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::rect::Rect;
use crate::resources::texturestore::{TextureError, TextureInfo, TextureService};
use crate::resources::tilemap::TileFlip;
use crate::systems::render::RenderTarget;

/// Texture service that "decodes" only the paths it was told about.
#[derive(Debug, Default)]
pub struct FakeTextures {
    sizes: FxHashMap<String, (i32, i32)>,
    pub requests: Vec<String>,
}

impl FakeTextures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, width: i32, height: i32) -> Self {
        self.insert(path, width, height);
        self
    }

    pub fn insert(&mut self, path: &str, width: i32, height: i32) {
        self.sizes.insert(path.to_string(), (width, height));
    }
}

impl TextureService for FakeTextures {
    fn load_texture(&mut self, path: &Path) -> Result<TextureInfo, TextureError> {
        let key = path.to_string_lossy().replace('\\', "/");
        self.requests.push(key.clone());
        match self.sizes.get(&key) {
            Some(&(width, height)) => Ok(TextureInfo { key, width, height }),
            None => Err(TextureError::Load {
                path: path.to_path_buf(),
                reason: "not registered".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub key: String,
    pub src: Rect,
    pub dst: Rect,
    pub flip: TileFlip,
}

/// Render target recording every draw call.
#[derive(Debug)]
pub struct RecordingTarget {
    pub draws: Vec<DrawCall>,
    pub outlines: Vec<Rect>,
    all_textures: bool,
}

impl Default for RecordingTarget {
    fn default() -> Self {
        Self {
            draws: Vec::new(),
            outlines: Vec::new(),
            all_textures: true,
        }
    }
}

impl RecordingTarget {
    /// A target that reports every texture as missing.
    pub fn without_textures() -> Self {
        Self {
            all_textures: false,
            ..Self::default()
        }
    }
}

impl RenderTarget for RecordingTarget {
    fn has_texture(&self, _key: &str) -> bool {
        self.all_textures
    }

    fn draw_texture(&mut self, key: &str, src: Rect, dst: Rect, flip: TileFlip) {
        self.draws.push(DrawCall {
            key: key.to_string(),
            src,
            dst,
            flip,
        });
    }

    fn draw_outline(&mut self, rect: Rect) {
        self.outlines.push(rect);
    }
}
