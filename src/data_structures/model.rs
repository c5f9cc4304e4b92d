//! GPU-side geometry: the fixed vertex layout and uploaded meshes.

use cgmath::{Matrix4, SquareMatrix};

use crate::data_structures::texture::TextureRef;

/// Interleaved vertex as the GPU sees it. 48 bytes, shader locations 0..=3.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4,
        3 => Float32x2,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// One uploaded (material, geometry) group.
///
/// Buffers and the bind group are owned here; the texture is shared with the
/// texture cache. Meshes are handed out as `Arc<Mesh>` so several entities
/// can reference the same geometry (see [`crate::data_structures::registry::MeshRef`]).
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub num_vertices: u32,
    pub texture: TextureRef,
    pub bind_group: wgpu::BindGroup,
    /// Identity for batched geometry (vertices are already in model space).
    /// Node-preserving imports keep local-space vertices and put the node's
    /// world matrix here.
    pub placement: Matrix4<f32>,
}

impl Mesh {
    pub fn index_bytes(&self) -> wgpu::BufferAddress {
        self.num_elements as wgpu::BufferAddress * std::mem::size_of::<u32>() as wgpu::BufferAddress
    }

    pub fn is_batched(&self) -> bool {
        self.placement == Matrix4::identity()
    }
}
