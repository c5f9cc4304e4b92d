//! Import-time scene graph.
//!
//! Plain CPU data produced by the glTF importer and consumed once by the
//! batcher. Nothing here touches the GPU, which keeps the traversal and
//! batching rules testable with hand-built scenes.

use std::path::PathBuf;

use crate::data_structures::transform::LocalTransform;

/// Where a material's base-colour image comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
    /// Relative to the scene file's directory (or absolute).
    Uri(String),
    /// Image bytes stored inside a buffer view. `key` identifies it in the cache.
    Embedded { key: String, bytes: Vec<u8> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureSource>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color_factor: [1.0; 4],
            base_color_texture: None,
        }
    }
}

/// One triangle-list primitive. Attribute vectors other than `positions` are
/// either empty (absent in the file) or the same length as `positions`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Primitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

impl Primitive {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    pub local: LocalTransform,
    /// Index into [`ImportedScene::meshes`].
    pub mesh: Option<usize>,
    /// Indices into [`ImportedScene::nodes`].
    pub children: Vec<usize>,
}

/// A mesh is a list of primitives, possibly shared by several nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneMesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedScene {
    /// Directory relative texture URIs resolve against.
    pub base_dir: PathBuf,
    pub nodes: Vec<SceneNode>,
    /// Root nodes of the scene being imported.
    pub roots: Vec<usize>,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<Material>,
}

impl ImportedScene {
    pub fn material(&self, index: Option<usize>) -> Option<&Material> {
        index.and_then(|i| self.materials.get(i))
    }
}
