//! Path-keyed texture cache.
//!
//! Every texture is loaded once and shared as a [`TextureRef`]. Two built-in
//! textures are created with the cache and live as long as it does: a 1x1
//! opaque white one (the material fallback) and a magenta/black checkerboard
//! for callers that want missing textures to stand out.
//!
//! Loading never substitutes a fallback on its own; a failed load returns
//! `None` and the caller decides.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result};

use crate::{
    context::Context,
    data_structures::texture::{Pixels, Texture, TextureRef},
    resources::upload::StagingUpload,
};

const ERROR_TEXTURE_SIZE: u32 = 8;
const ERROR_CELL: u32 = 2;
const MAGENTA: [u8; 4] = [255, 0, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

#[derive(Debug)]
pub struct TextureCache {
    entries: HashMap<PathBuf, TextureRef>,
    white: TextureRef,
    error: TextureRef,
}

impl TextureCache {
    /// Creates the cache and uploads both fallback textures in one staging batch.
    pub fn new(ctx: &Context) -> Self {
        let mut upload = StagingUpload::new("fallback textures");
        let white = upload.texture(&ctx.device, &Pixels::solid(WHITE, 1, 1), "<white>");
        let error = upload.texture(
            &ctx.device,
            &Pixels::checkerboard(ERROR_TEXTURE_SIZE, ERROR_CELL, MAGENTA, BLACK),
            "<error>",
        );
        upload.submit(ctx);
        Self {
            entries: HashMap::new(),
            white: Arc::new(white),
            error: Arc::new(error),
        }
    }

    /// Returns the cached texture for `path`, loading it on first use.
    /// IO and decode failures, and images larger than the device allows, are
    /// logged and yield `None`.
    pub fn load(&mut self, ctx: &Context, path: impl AsRef<Path>) -> Option<TextureRef> {
        let path = path.as_ref();
        if let Some(hit) = self.entries.get(path) {
            return Some(hit.clone());
        }
        let max = ctx.device.limits().max_texture_dimension_2d;
        match read_pixels(path).and_then(|pixels| fit_device(pixels, max)) {
            Ok(pixels) => Some(self.insert(ctx, path.to_path_buf(), &pixels)),
            Err(e) => {
                log::warn!("failed to load texture {}: {:#}", path.display(), e);
                None
            }
        }
    }

    /// Like [`load`](Self::load) for image bytes that are not a file of their
    /// own, such as images embedded in a binary glTF. `key` is the cache key.
    pub fn load_from_memory(&mut self, ctx: &Context, key: &str, bytes: &[u8]) -> Option<TextureRef> {
        let key = PathBuf::from(key);
        if let Some(hit) = self.entries.get(&key) {
            return Some(hit.clone());
        }
        let max = ctx.device.limits().max_texture_dimension_2d;
        match Pixels::decode(bytes).and_then(|pixels| fit_device(pixels, max)) {
            Ok(pixels) => Some(self.insert(ctx, key, &pixels)),
            Err(e) => {
                log::warn!("failed to decode embedded texture {}: {:#}", key.display(), e);
                None
            }
        }
    }

    fn insert(&mut self, ctx: &Context, key: PathBuf, pixels: &Pixels) -> TextureRef {
        let mut upload = StagingUpload::new("texture upload");
        let texture = upload.texture(&ctx.device, pixels, &key.to_string_lossy());
        upload.submit(ctx);
        let texture = Arc::new(texture);
        self.entries.insert(key, texture.clone());
        texture
    }

    /// 1x1 opaque white.
    pub fn fallback_white(&self) -> TextureRef {
        self.white.clone()
    }

    /// Magenta/black checkerboard.
    pub fn fallback_error(&self) -> TextureRef {
        self.error.clone()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(path.as_ref())
    }

    /// Number of loaded textures, fallbacks excluded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every loaded texture. The fallbacks stay.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn read_pixels(path: &Path) -> Result<Pixels> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Pixels::decode(&bytes)
}

/// Rejects images wgpu would refuse to create a texture for.
fn fit_device(pixels: Pixels, max_dimension: u32) -> Result<Pixels> {
    anyhow::ensure!(
        pixels.width <= max_dimension && pixels.height <= max_dimension,
        "{}x{} exceeds the device limit of {} texels per side",
        pixels.width,
        pixels.height,
        max_dimension
    );
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_over_the_limit_are_rejected() {
        assert!(fit_device(Pixels::solid(WHITE, 4, 4), 4).is_ok());
        assert!(fit_device(Pixels::solid(WHITE, 5, 1), 4).is_err());
        assert!(fit_device(Pixels::solid(WHITE, 1, 5), 4).is_err());
    }
}
