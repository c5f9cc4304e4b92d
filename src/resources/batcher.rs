//! Mesh batching.
//!
//! Turns an [`ImportedScene`] into draw-ready geometry in two steps:
//!
//! - [`batch`] walks the node hierarchy (depth-first, explicit stack) and
//!   builds CPU vertex/index lists. With [`ImportPolicy::Batched`] every
//!   primitive is transformed to model space and appended to the group of its
//!   material, offsetting its indices by the group's running vertex count.
//!   With [`ImportPolicy::PerNode`] each (node, primitive) keeps its own
//!   local-space geometry and the node's world matrix.
//! - [`upload_batches`] resolves textures through the cache and moves all
//!   geometry to the GPU with a single staging upload, returning its receipt.

use std::collections::{BTreeMap, HashSet};

use cgmath::{Matrix3, Matrix4, SquareMatrix};

use crate::{
    config::ImportPolicy,
    context::Context,
    data_structures::{
        model::{Mesh, Vertex},
        scene::{ImportedScene, Primitive, TextureSource},
        texture::TextureRef,
        transform::{self, compose, normal_matrix, transform_normal, transform_point},
    },
    resources::{
        texture_cache::TextureCache,
        upload::{StagingUpload, UploadReceipt},
    },
};

/// Nodes nested deeper than this are skipped.
pub const MAX_NODE_DEPTH: usize = 64;

const UP: [f32; 3] = [0.0, 1.0, 0.0];
const WHITE: [f32; 4] = [1.0; 4];

/// CPU geometry of one future [`Mesh`].
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub name: String,
    pub material: Option<usize>,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub placement: Matrix4<f32>,
}

impl Batch {
    fn new(name: String, material: Option<usize>, placement: Matrix4<f32>) -> Self {
        Self {
            name,
            material,
            vertices: Vec::new(),
            indices: Vec::new(),
            placement,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty() || self.vertices.is_empty()
    }
}

/// A node reached by the traversal together with its world matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct VisitedNode {
    pub node: usize,
    pub world: Matrix4<f32>,
    pub depth: usize,
}

/// Depth-first pre-order walk from every root, children in file order.
/// Out-of-range indices, revisits (cycles or shared children) and nodes
/// deeper than [`MAX_NODE_DEPTH`] are skipped with a warning.
pub fn traverse(scene: &ImportedScene) -> Vec<VisitedNode> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<(usize, Matrix4<f32>, usize)> = scene
        .roots
        .iter()
        .rev()
        .map(|&root| (root, transform::identity(), 0))
        .collect();

    while let Some((index, parent, depth)) = stack.pop() {
        let Some(node) = scene.nodes.get(index) else {
            log::warn!("node index {} out of range", index);
            continue;
        };
        if depth >= MAX_NODE_DEPTH {
            log::warn!("node {} exceeds the depth limit of {}, skipped", index, MAX_NODE_DEPTH);
            continue;
        }
        if !seen.insert(index) {
            log::warn!("node {} reached twice, skipping the repeat", index);
            continue;
        }
        let world = compose(&parent, &node.local);
        for &child in node.children.iter().rev() {
            stack.push((child, world, depth + 1));
        }
        out.push(VisitedNode {
            node: index,
            world,
            depth,
        });
    }
    out
}

/// Vertex colour: per-vertex colour times the material factor. Either
/// missing side counts as opaque white.
pub fn vertex_color(vertex: Option<[f32; 4]>, factor: Option<[f32; 4]>) -> [f32; 4] {
    let c = vertex.unwrap_or(WHITE);
    let f = factor.unwrap_or(WHITE);
    [c[0] * f[0], c[1] * f[1], c[2] * f[2], c[3] * f[3]]
}

/// Groups are keyed by material index; primitives without a material sort last.
fn group_key(material: Option<usize>) -> usize {
    material.unwrap_or(usize::MAX)
}

pub fn batch(scene: &ImportedScene, policy: ImportPolicy) -> Vec<Batch> {
    let visited = traverse(scene);
    match policy {
        ImportPolicy::Batched => batch_by_material(scene, &visited),
        ImportPolicy::PerNode => batch_per_node(scene, &visited),
    }
}

fn batch_by_material(scene: &ImportedScene, visited: &[VisitedNode]) -> Vec<Batch> {
    let mut groups: BTreeMap<usize, Batch> = BTreeMap::new();
    for v in visited {
        let Some(mesh) = scene.nodes[v.node].mesh.and_then(|m| scene.meshes.get(m)) else {
            continue;
        };
        let nm = normal_matrix(&v.world);
        for primitive in &mesh.primitives {
            let group = groups.entry(group_key(primitive.material)).or_insert_with(|| {
                Batch::new(
                    group_name(scene, primitive.material),
                    primitive.material,
                    transform::identity(),
                )
            });
            let factor = scene.material(primitive.material).map(|m| m.base_color_factor);
            append(group, primitive, factor, |p| transform_point(&v.world, p), |n| {
                transform_normal(&nm, n)
            });
        }
    }
    groups.into_values().filter(|b| !b.is_empty()).collect()
}

fn batch_per_node(scene: &ImportedScene, visited: &[VisitedNode]) -> Vec<Batch> {
    let mut out = Vec::new();
    for v in visited {
        let node = &scene.nodes[v.node];
        let Some(mesh) = node.mesh.and_then(|m| scene.meshes.get(m)) else {
            continue;
        };
        let base = node
            .name
            .as_deref()
            .or(mesh.name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("node {}", v.node));
        for (i, primitive) in mesh.primitives.iter().enumerate() {
            let mut batch = Batch::new(format!("{base} #{i}"), primitive.material, v.world);
            let factor = scene.material(primitive.material).map(|m| m.base_color_factor);
            append(&mut batch, primitive, factor, |p| p, |n| {
                transform_normal(&Matrix3::identity(), n)
            });
            if !batch.is_empty() {
                out.push(batch);
            }
        }
    }
    out
}

fn group_name(scene: &ImportedScene, material: Option<usize>) -> String {
    match scene.material(material) {
        Some(m) => m
            .name
            .clone()
            .unwrap_or_else(|| format!("material {}", material.unwrap_or_default())),
        None => "default material".to_string(),
    }
}

fn append(
    batch: &mut Batch,
    primitive: &Primitive,
    factor: Option<[f32; 4]>,
    position: impl Fn([f32; 3]) -> [f32; 3],
    normal: impl Fn([f32; 3]) -> [f32; 3],
) {
    let base = batch.vertices.len() as u32;
    batch.vertices.reserve(primitive.vertex_count());
    batch.indices.reserve(primitive.indices.len());
    batch
        .vertices
        .extend(primitive.positions.iter().enumerate().map(|(i, p)| Vertex {
            position: position(*p),
            normal: primitive.normals.get(i).map(|n| normal(*n)).unwrap_or(UP),
            color: vertex_color(primitive.colors.get(i).copied(), factor),
            tex_coords: primitive.tex_coords.get(i).copied().unwrap_or_default(),
        }));
    batch.indices.extend(primitive.indices.iter().map(|i| i + base));
}

/// Uploads `batches` as meshes. Textures are resolved through `cache`; a
/// missing or undecodable texture falls back to white for that mesh only.
/// All geometry shares one staging buffer and one submit; the receipt counts
/// two copies per mesh.
pub fn upload_batches(
    ctx: &Context,
    cache: &mut TextureCache,
    scene: &ImportedScene,
    batches: Vec<Batch>,
) -> (Vec<Mesh>, UploadReceipt) {
    let mut upload = StagingUpload::new("mesh upload");
    let meshes = batches
        .into_iter()
        .map(|batch| {
            let texture = resolve_texture(ctx, cache, scene, batch.material);
            let vertex_buffer = upload.buffer(
                &ctx.device,
                &format!("{} Vertex Buffer", batch.name),
                bytemuck::cast_slice(&batch.vertices),
                wgpu::BufferUsages::VERTEX,
            );
            let index_buffer = upload.buffer(
                &ctx.device,
                &format!("{} Index Buffer", batch.name),
                bytemuck::cast_slice(&batch.indices),
                wgpu::BufferUsages::INDEX,
            );
            let bind_group = texture.bind_group(&ctx.device, &ctx.texture_layout);
            Mesh {
                name: batch.name,
                vertex_buffer,
                index_buffer,
                num_elements: batch.indices.len() as u32,
                num_vertices: batch.vertices.len() as u32,
                texture,
                bind_group,
                placement: batch.placement,
            }
        })
        .collect();
    (meshes, upload.submit(ctx))
}

fn resolve_texture(
    ctx: &Context,
    cache: &mut TextureCache,
    scene: &ImportedScene,
    material: Option<usize>,
) -> TextureRef {
    let source = scene
        .material(material)
        .and_then(|m| m.base_color_texture.as_ref());
    let loaded = match source {
        Some(TextureSource::Uri(uri)) => cache.load(ctx, scene.base_dir.join(uri)),
        Some(TextureSource::Embedded { key, bytes }) => cache.load_from_memory(ctx, key, bytes),
        None => None,
    };
    loaded.unwrap_or_else(|| cache.fallback_white())
}
