//! Texture loading seam and the raylib-backed texture store.
//!
//! Engine code never touches GPU textures directly. It asks a
//! [`TextureService`] to decode an image file and gets back a string key plus
//! the image's pixel size; drawing later refers to the texture by that key
//! (see [`RenderTarget`](crate::systems::render::RenderTarget)).
//!
//! With the `raylib-backend` feature, [`TextureStore`] owns the loaded
//! `Texture2D`s and [`RaylibTextureLoader`] implements the service on top of a
//! live raylib handle.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// What the engine keeps about a loaded texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    /// Key used to draw this texture later.
    pub key: String,
    /// Decoded image width in pixels.
    pub width: i32,
    /// Decoded image height in pixels.
    pub height: i32,
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load texture {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("texture path {0} is not valid UTF-8")]
    InvalidPath(PathBuf),
}

/// External texture-creation service: file path in, renderer-bound texture out.
pub trait TextureService {
    fn load_texture(&mut self, path: &Path) -> Result<TextureInfo, TextureError>;
}

#[cfg(feature = "raylib-backend")]
pub use backend::{RaylibTextureLoader, TextureStore};

#[cfg(feature = "raylib-backend")]
mod backend {
    use std::path::Path;

    use raylib::prelude::*;
    use rustc_hash::FxHashMap;

    use super::{TextureError, TextureInfo, TextureService};

    /// Loaded textures keyed by the path they were loaded from.
    ///
    /// Raylib textures must be created and dropped on the main thread, so the
    /// store lives next to the raylib handle rather than inside the ECS world.
    #[derive(Default)]
    pub struct TextureStore {
        map: FxHashMap<String, Texture2D>,
    }

    impl TextureStore {
        pub fn new() -> Self {
            Self {
                map: FxHashMap::default(),
            }
        }

        pub fn get(&self, key: impl AsRef<str>) -> Option<&Texture2D> {
            self.map.get(key.as_ref())
        }

        pub fn insert(&mut self, key: impl Into<String>, texture: Texture2D) {
            self.map.insert(key.into(), texture);
        }

        pub fn contains(&self, key: impl AsRef<str>) -> bool {
            self.map.contains_key(key.as_ref())
        }
    }

    /// [`TextureService`] backed by raylib's image loader.
    pub struct RaylibTextureLoader<'a> {
        pub rl: &'a mut RaylibHandle,
        pub thread: &'a RaylibThread,
        pub store: &'a mut TextureStore,
    }

    impl TextureService for RaylibTextureLoader<'_> {
        fn load_texture(&mut self, path: &Path) -> Result<TextureInfo, TextureError> {
            let key = path
                .to_str()
                .ok_or_else(|| TextureError::InvalidPath(path.to_path_buf()))?
                .to_string();

            if let Some(texture) = self.store.get(&key) {
                return Ok(TextureInfo {
                    key,
                    width: texture.width,
                    height: texture.height,
                });
            }

            if !path.is_file() {
                return Err(TextureError::Load {
                    path: path.to_path_buf(),
                    reason: "file not found".to_string(),
                });
            }

            let texture =
                self.rl
                    .load_texture(self.thread, &key)
                    .map_err(|e| TextureError::Load {
                        path: path.to_path_buf(),
                        reason: format!("{e:?}"),
                    })?;
            let info = TextureInfo {
                key: key.clone(),
                width: texture.width,
                height: texture.height,
            };
            log::debug!("Loaded texture {} ({}x{})", key, info.width, info.height);
            self.store.insert(key, texture);
            Ok(info)
        }
    }
}
