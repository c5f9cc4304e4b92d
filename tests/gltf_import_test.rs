use frame_ngin::{
    config::ImportPolicy,
    data_structures::scene::TextureSource,
    resources::{batcher, gltf_import::import_gltf},
};

use crate::common::test_utils::{TriangleScene, write_triangle_scene};

mod common;

#[test]
fn imports_nodes_meshes_and_materials() {
    let path = write_triangle_scene(
        "import",
        &TriangleScene {
            nodes: vec![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]],
            texture_uri: Some("wood%20grain.png"),
            base_color: Some([0.5, 0.5, 0.5, 1.0]),
        },
    );
    let scene = import_gltf(&path).expect("fixture should import");

    assert_eq!(scene.nodes.len(), 2);
    assert_eq!(scene.roots, vec![0, 1]);
    assert_eq!(scene.meshes.len(), 1);
    let primitive = &scene.meshes[0].primitives[0];
    assert_eq!(primitive.positions.len(), 3);
    assert_eq!(primitive.indices, vec![0, 1, 2]);
    assert_eq!(primitive.material, Some(0));
    assert!(primitive.normals.is_empty());

    let material = &scene.materials[0];
    assert_eq!(material.base_color_factor, [0.5, 0.5, 0.5, 1.0]);
    assert_eq!(
        material.base_color_texture,
        Some(TextureSource::Uri("wood grain.png".to_string()))
    );
    assert_eq!(Some(scene.base_dir.as_path()), path.parent());
}

#[test]
fn two_nodes_sharing_a_material_batch_into_one_mesh() {
    let path = write_triangle_scene(
        "batch",
        &TriangleScene {
            nodes: vec![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]],
            ..Default::default()
        },
    );
    let scene = import_gltf(&path).expect("fixture should import");
    let batches = batcher::batch(&scene, ImportPolicy::Batched);

    assert_eq!(batches.len(), 1);
    let b = &batches[0];
    assert_eq!(b.vertices.len(), 6);
    assert_eq!(b.indices, vec![0, 1, 2, 3, 4, 5]);
    for i in 0..3 {
        let a = b.vertices[i].position;
        let c = b.vertices[i + 3].position;
        assert_eq!([c[0] - a[0], c[1] - a[1], c[2] - a[2]], [5.0, 0.0, 0.0]);
    }
}

#[test]
fn per_node_policy_keeps_one_batch_per_node() {
    let path = write_triangle_scene(
        "per-node",
        &TriangleScene {
            nodes: vec![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]],
            ..Default::default()
        },
    );
    let scene = import_gltf(&path).expect("fixture should import");
    let batches = batcher::batch(&scene, ImportPolicy::PerNode);

    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|b| b.indices == vec![0, 1, 2]));
    assert_eq!(batches[1].placement.w.x, 5.0);
}

#[test]
fn missing_file_is_an_error() {
    let dir = std::env::temp_dir().join("frame-ngin-does-not-exist");
    assert!(import_gltf(&dir.join("nope.gltf")).is_err());
}
