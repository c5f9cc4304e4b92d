//! Engine data structures.
//!
//! - `model` holds the vertex layout and the GPU mesh handle
//! - `texture` wraps GPU textures and decoded pixel data
//! - `scene` is the import-time scene graph produced by the glTF importer
//! - `transform` composes node transforms and derives normal matrices
//! - `camera` is the perspective camera component
//! - `registry` is the sparse-set entity registry

pub mod camera;
pub mod model;
pub mod registry;
pub mod scene;
pub mod texture;
pub mod transform;
