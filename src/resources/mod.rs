//! Loading meshes and textures from disk into GPU resources.
//!
//! [`ResourceManager`] is the entry point: it owns the [`TextureCache`] and
//! every model loaded so far, deduplicates repeated loads by path and import
//! policy and hands out
//! shared [`Mesh`] handles that entities reference through the registry.
//!
//! - `gltf_import` parses scene files into the CPU-side scene graph
//! - `batcher` flattens that graph into per-material geometry and uploads it
//! - `texture_cache` shares textures by path and owns the fallbacks
//! - `upload` is the staging-buffer protocol every transfer goes through

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    config::ImportPolicy,
    context::Context,
    data_structures::{
        model::Mesh,
        registry::{Entity, MeshRef, Registry, Transform},
        texture::TextureRef,
    },
    resources::upload::UploadReceipt,
};

pub mod batcher;
pub mod gltf_import;
pub mod texture_cache;
pub mod upload;

pub use texture_cache::TextureCache;

#[derive(Debug)]
pub struct ResourceManager {
    textures: TextureCache,
    /// The same file imported under another policy yields different meshes.
    models: HashMap<(PathBuf, ImportPolicy), Vec<Arc<Mesh>>>,
    policy: ImportPolicy,
    last_upload: Option<UploadReceipt>,
}

impl ResourceManager {
    /// Creates the texture cache (and with it the fallback textures).
    pub fn new(ctx: &Context, policy: ImportPolicy) -> Self {
        Self {
            textures: TextureCache::new(ctx),
            models: HashMap::new(),
            policy,
            last_upload: None,
        }
    }

    pub fn policy(&self) -> ImportPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ImportPolicy) {
        self.policy = policy;
    }

    /// Loads a glTF scene as meshes. Loading the same path again under the
    /// same policy returns the same meshes. Unreadable or malformed files are logged and produce an
    /// empty list; a bad texture only affects its own mesh.
    pub fn load_model(&mut self, ctx: &Context, path: impl AsRef<Path>) -> Vec<Arc<Mesh>> {
        let key = (path.as_ref().to_path_buf(), self.policy);
        if let Some(meshes) = self.models.get(&key) {
            return meshes.clone();
        }
        let path = key.0.as_path();
        let scene = match gltf_import::import_gltf(path) {
            Ok(scene) => scene,
            Err(e) => {
                log::error!("failed to load model {}: {:#}", path.display(), e);
                return Vec::new();
            }
        };
        let batches = batcher::batch(&scene, self.policy);
        let (meshes, receipt) = batcher::upload_batches(ctx, &mut self.textures, &scene, batches);
        let meshes: Vec<Arc<Mesh>> = meshes.into_iter().map(Arc::new).collect();
        log::info!(
            "loaded {} ({} meshes, {} bytes staged)",
            path.display(),
            meshes.len(),
            receipt.staged_bytes
        );
        self.last_upload = Some(receipt);
        self.models.insert(key, meshes.clone());
        meshes
    }

    /// Loads (or returns the cached) texture at `path`. `None` on failure.
    pub fn load_texture(&mut self, ctx: &Context, path: impl AsRef<Path>) -> Option<TextureRef> {
        self.textures.load(ctx, path)
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }

    /// What the most recent model upload moved. Cache hits leave it alone.
    pub fn last_upload(&self) -> Option<UploadReceipt> {
        self.last_upload
    }

    /// Loaded (path, policy) pairs.
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Spawns one entity per mesh, each with a copy of `transform`. A mesh's
    /// placement is appended to the transform's anchor.
    pub fn spawn(registry: &mut Registry, meshes: &[Arc<Mesh>], transform: Transform) -> Vec<Entity> {
        meshes
            .iter()
            .map(|mesh| {
                let entity = registry.spawn();
                let placed = if mesh.is_batched() {
                    transform
                } else {
                    transform.with_anchor(transform.anchor * mesh.placement)
                };
                registry.insert(entity, placed);
                registry.insert(entity, MeshRef(mesh.clone()));
                entity
            })
            .collect()
    }

    /// Releases loaded models and textures. Meshes still referenced elsewhere
    /// live on until those references drop. Fallback textures are kept.
    pub fn cleanup(&mut self) {
        log::debug!(
            "releasing {} models and {} textures",
            self.models.len(),
            self.textures.len()
        );
        self.models.clear();
        self.textures.clear();
    }
}
