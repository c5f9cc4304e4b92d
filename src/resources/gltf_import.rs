//! glTF 2.0 import into the CPU-side [`ImportedScene`].
//!
//! Handles both `.gltf` (JSON + external or data-URI buffers) and `.glb`
//! (binary chunk). Only what the renderer draws is read: triangle primitives
//! with positions, normals, COLOR_0, TEXCOORD_0 and indices, plus each
//! material's base-colour factor and texture.

use std::path::Path;

use anyhow::{Context as _, Result};
use gltf::mesh::Mode;

use crate::data_structures::{
    scene::{ImportedScene, Material, Primitive, SceneMesh, SceneNode, TextureSource},
    transform::LocalTransform,
};

pub fn import_gltf(path: &Path) -> Result<ImportedScene> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let gltf = gltf::Gltf::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let buffers = gltf::import_buffers(&gltf.document, Some(&base_dir), gltf.blob.clone())
        .with_context(|| format!("loading buffers of {}", path.display()))?;
    let buffers: Vec<&[u8]> = buffers.iter().map(|b| b.0.as_slice()).collect();
    let document = &gltf.document;
    let file_key = path.to_string_lossy();

    let materials = document
        .materials()
        .map(|material| read_material(&material, &buffers, &file_key))
        .collect();

    let meshes = document
        .meshes()
        .map(|mesh| SceneMesh {
            name: mesh.name().map(str::to_string),
            primitives: mesh
                .primitives()
                .filter_map(|primitive| read_primitive(&primitive, &buffers, mesh.name()))
                .collect(),
        })
        .collect();

    let nodes: Vec<SceneNode> = document
        .nodes()
        .map(|node| SceneNode {
            name: node.name().map(str::to_string),
            local: match node.transform() {
                gltf::scene::Transform::Matrix { matrix } => LocalTransform::Matrix(matrix.into()),
                gltf::scene::Transform::Decomposed {
                    translation,
                    rotation,
                    scale,
                } => LocalTransform::from_trs(translation, rotation, scale),
            },
            mesh: node.mesh().map(|m| m.index()),
            children: node.children().map(|c| c.index()).collect(),
        })
        .collect();

    let roots = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => {
            log::debug!("{} has no scene, using parentless nodes as roots", path.display());
            parentless(&nodes)
        }
    };

    Ok(ImportedScene {
        base_dir,
        nodes,
        roots,
        meshes,
        materials,
    })
}

fn read_material(material: &gltf::Material, buffers: &[&[u8]], file_key: &str) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let base_color_texture = pbr.base_color_texture().and_then(|info| {
        let image = info.texture().source();
        match image.source() {
            gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                log::warn!("data-URI image {} is not supported, material falls back to white", image.index());
                None
            }
            gltf::image::Source::Uri { uri, .. } => Some(TextureSource::Uri(percent_decode(uri))),
            gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                let end = start + view.length();
                match buffers.get(view.buffer().index()).and_then(|b| b.get(start..end)) {
                    Some(bytes) => Some(TextureSource::Embedded {
                        key: format!("{}#image{}", file_key, image.index()),
                        bytes: bytes.to_vec(),
                    }),
                    None => {
                        log::warn!("image {} points outside its buffer", image.index());
                        None
                    }
                }
            }
        }
    });
    Material {
        name: material.name().map(str::to_string),
        base_color_factor: pbr.base_color_factor(),
        base_color_texture,
    }
}

fn read_primitive(primitive: &gltf::Primitive, buffers: &[&[u8]], mesh: Option<&str>) -> Option<Primitive> {
    let mesh = mesh.unwrap_or("<unnamed>");
    if primitive.mode() != Mode::Triangles {
        log::debug!("skipping {:?} primitive in mesh {}", primitive.mode(), mesh);
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).copied());
    let Some(positions) = reader.read_positions() else {
        log::warn!("primitive without positions in mesh {} skipped", mesh);
        return None;
    };
    let positions: Vec<[f32; 3]> = positions.collect();
    let n = positions.len();

    let normals = reader
        .read_normals()
        .map(|it| it.collect::<Vec<_>>())
        .unwrap_or_default();
    let colors = reader
        .read_colors(0)
        .map(|it| it.into_rgba_f32().collect::<Vec<_>>())
        .unwrap_or_default();
    let tex_coords = reader
        .read_tex_coords(0)
        .map(|it| it.into_f32().collect::<Vec<_>>())
        .unwrap_or_default();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(it) => it.into_u32().collect(),
        None => (0..n as u32).collect(),
    };

    if let Some(bad) = indices.iter().find(|i| **i as usize >= n) {
        log::warn!("index {} out of range ({} vertices) in mesh {}, primitive skipped", bad, n, mesh);
        return None;
    }

    Some(Primitive {
        normals: matching(normals, n, "normals", mesh),
        colors: matching(colors, n, "colors", mesh),
        tex_coords: matching(tex_coords, n, "tex coords", mesh),
        positions,
        indices,
        material: primitive.material().index(),
    })
}

/// Attributes must cover every vertex to be usable.
fn matching<T>(attr: Vec<T>, n: usize, what: &str, mesh: &str) -> Vec<T> {
    if attr.is_empty() || attr.len() == n {
        attr
    } else {
        log::warn!("{} has {} {} for {} vertices, ignoring them", mesh, attr.len(), what, n);
        Vec::new()
    }
}

fn parentless(nodes: &[SceneNode]) -> Vec<usize> {
    let mut is_child = vec![false; nodes.len()];
    for node in nodes {
        for &c in &node.children {
            if let Some(flag) = is_child.get_mut(c) {
                *flag = true;
            }
        }
    }
    (0..nodes.len()).filter(|i| !is_child[*i]).collect()
}

/// URIs in glTF are percent-encoded (`my%20texture.png`).
fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(v) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_escapes_are_decoded() {
        assert_eq!(percent_decode("my%20tex.png"), "my tex.png");
        assert_eq!(percent_decode("plain.png"), "plain.png");
        assert_eq!(percent_decode("bad%zz.png"), "bad%zz.png");
        assert_eq!(percent_decode("end%2"), "end%2");
    }

    #[test]
    fn parentless_nodes_become_roots() {
        let nodes = vec![
            SceneNode {
                children: vec![1],
                ..Default::default()
            },
            SceneNode::default(),
            SceneNode::default(),
        ];
        assert_eq!(parentless(&nodes), vec![0, 2]);
    }
}
