use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU32, Ordering},
};

static NEXT_DIR: AtomicU32 = AtomicU32::new(0);

/// A fresh directory under the system temp dir, unique per test process and call.
pub fn fixture_dir(name: &str) -> PathBuf {
    let n = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("frame-ngin-{}-{}-{}", name, std::process::id(), n));
    fs::create_dir_all(&dir).expect("failed to create fixture dir");
    dir
}

/// Unit triangle in the XY plane followed by `0, 1, 2` as u16 indices,
/// padded to a multiple of four bytes.
fn triangle_buffer() -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let mut bytes = Vec::new();
    for p in positions {
        for c in p {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
    }
    for i in [0u16, 1, 2] {
        bytes.extend_from_slice(&i.to_le_bytes());
    }
    bytes.resize(44, 0);
    bytes
}

/// Describes the triangle scene to write.
#[derive(Clone, Debug, Default)]
pub struct TriangleScene<'a> {
    /// Translation of every node; one node per entry, all sharing mesh 0.
    pub nodes: Vec<[f32; 3]>,
    /// Image URI for the material's base colour texture, if any.
    pub texture_uri: Option<&'a str>,
    /// Material base colour factor.
    pub base_color: Option<[f32; 4]>,
}

/// Writes `scene.gltf` + `scene.bin` into a fresh directory and returns the
/// path of the `.gltf` file.
pub fn write_triangle_scene(name: &str, scene: &TriangleScene) -> PathBuf {
    let dir = fixture_dir(name);
    fs::write(dir.join("scene.bin"), triangle_buffer()).expect("failed to write buffer");

    let nodes: Vec<String> = scene
        .nodes
        .iter()
        .map(|[x, y, z]| format!(r#"{{"mesh":0,"translation":[{x},{y},{z}]}}"#))
        .collect();
    let roots: Vec<String> = (0..scene.nodes.len()).map(|i| i.to_string()).collect();

    let mut pbr = Vec::new();
    if let Some([r, g, b, a]) = scene.base_color {
        pbr.push(format!(r#""baseColorFactor":[{r},{g},{b},{a}]"#));
    }
    if scene.texture_uri.is_some() {
        pbr.push(r#""baseColorTexture":{"index":0}"#.to_string());
    }
    let textures = match scene.texture_uri {
        Some(uri) => format!(r#","textures":[{{"source":0}}],"images":[{{"uri":"{uri}"}}]"#),
        None => String::new(),
    };

    let json = format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [{roots}]}}],
  "nodes": [{nodes}],
  "meshes": [{{"name": "tri", "primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}}]}}],
  "materials": [{{"name": "M", "pbrMetallicRoughness": {{{pbr}}}}}]{textures},
  "buffers": [{{"uri": "scene.bin", "byteLength": 44}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 6}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
  ]
}}"#,
        roots = roots.join(","),
        nodes = nodes.join(","),
        pbr = pbr.join(","),
    );
    let path = dir.join("scene.gltf");
    fs::write(&path, json).expect("failed to write gltf");
    path
}

/// Writes a solid-colour PNG next to other fixtures.
pub fn write_png(dir: &Path, name: &str, color: [u8; 4], width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba(color))
        .save(&path)
        .expect("failed to write png");
    path
}
