//! Forward pipeline for registry meshes.
//!
//! One textured, vertex-coloured draw per entity with a [`MeshRef`] and a
//! [`Transform`], lit by a single point light, seen through the registry's
//! active camera. Per-draw matrices live in one uniform buffer addressed with
//! dynamic offsets.
//!
//! Bind groups: 0 = material texture, 1 = per-draw matrices, 2 = light.

use std::{num::NonZeroU64, sync::Arc};

use cgmath::Matrix4;

use crate::{
    context::Context,
    data_structures::{
        model::{Mesh, Vertex},
        registry::{Camera, Registry},
        texture::Texture,
        transform::normal_matrix,
    },
    pipelines::mk_render_pipeline,
    render_target::RenderTarget,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl DrawUniform {
    pub fn new(model: Matrix4<f32>, view: Matrix4<f32>, proj: Matrix4<f32>) -> Self {
        Self {
            model: model.into(),
            view: view.into(),
            proj: proj.into(),
            normal: Matrix4::from(normal_matrix(&model)).into(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub view_position: [f32; 4],
}

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            position: [2.0, 4.0, 2.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
            view_position: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// A mesh with the matrix it is drawn with.
#[derive(Clone, Debug)]
pub struct DrawItem {
    pub mesh: Arc<Mesh>,
    pub model: Matrix4<f32>,
}

/// Drawables in registry order.
pub fn collect_draws(registry: &Registry) -> Vec<DrawItem> {
    registry
        .drawables()
        .map(|(_, mesh, transform)| DrawItem {
            mesh: mesh.0.clone(),
            model: transform.model_matrix(),
        })
        .collect()
}

/// Byte stride between per-draw uniforms; also the dynamic-offset alignment.
fn draw_stride(device: &wgpu::Device) -> u64 {
    let align = device.limits().min_uniform_buffer_offset_alignment as u64;
    (std::mem::size_of::<DrawUniform>() as u64).div_ceil(align) * align
}

pub struct ScenePipeline {
    pipeline: wgpu::RenderPipeline,
    format: wgpu::TextureFormat,
    draw_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: u64,
    draw_stride: u64,
    light_buffer: wgpu::Buffer,
    light_bind_group: wgpu::BindGroup,
    pub light: LightUniform,
    pub clear_colour: wgpu::Color,
}

impl ScenePipeline {
    pub fn new(ctx: &Context, format: wgpu::TextureFormat) -> Self {
        let device = &ctx.device;
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64),
                },
                count: None,
            }],
        });
        let light_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("light_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&ctx.texture_layout, &draw_layout, &light_layout],
            immediate_size: 0,
        });
        let pipeline = mk_render_pipeline(
            device,
            "Scene Pipeline",
            &layout,
            format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            Some(Texture::DEPTH_FORMAT),
            &[Vertex::desc()],
            wgpu::ShaderModuleDescriptor {
                label: Some("Scene Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
            },
        );

        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Buffer"),
            size: std::mem::size_of::<LightUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("light_bind_group"),
            layout: &light_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
        });

        let draw_stride = draw_stride(device);
        let (draw_buffer, draw_bind_group) = Self::draw_storage(device, &draw_layout, 16, draw_stride);

        Self {
            pipeline,
            format,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_capacity: 16,
            draw_stride,
            light_buffer,
            light_bind_group,
            light: LightUniform::default(),
            clear_colour: wgpu::Color::BLACK,
        }
    }

    fn draw_storage(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u64,
        stride: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer"),
            size: capacity * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, draws: u64) {
        if draws <= self.draw_capacity {
            return;
        }
        let capacity = draws.next_power_of_two();
        let (buffer, bind_group) = Self::draw_storage(device, &self.draw_layout, capacity, self.draw_stride);
        self.draw_buffer = buffer;
        self.draw_bind_group = bind_group;
        self.draw_capacity = capacity;
    }

    /// Clears `target` and draws every registry drawable seen from the active
    /// camera. Without an active camera only the clear happens. Returns the
    /// number of draw calls.
    pub fn render(
        &mut self,
        ctx: &Context,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTarget,
        registry: &Registry,
    ) -> usize {
        let camera = registry.active_camera().map(|(_, c)| c.clone());
        let draws = match &camera {
            Some(_) => collect_draws(registry),
            None => Vec::new(),
        };
        if let Some(camera) = &camera {
            self.upload_uniforms(ctx, camera, target, &draws);
        }

        let mut pass = target.begin_pass(encoder, self.clear_colour);
        if draws.is_empty() {
            return 0;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(2, &self.light_bind_group, &[]);
        for (i, draw) in draws.iter().enumerate() {
            let offset = (i as u64 * self.draw_stride) as u32;
            pass.set_bind_group(0, &draw.mesh.bind_group, &[]);
            pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
            pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.mesh.num_elements, 0, 0..1);
        }
        draws.len()
    }

    fn upload_uniforms(&mut self, ctx: &Context, camera: &Camera, target: &RenderTarget, draws: &[DrawItem]) {
        if self.format != target.format() {
            log::warn!(
                "scene pipeline built for {:?} but target is {:?}",
                self.format,
                target.format()
            );
        }
        self.ensure_capacity(&ctx.device, draws.len() as u64);
        let view = camera.view_matrix();
        let proj = camera.projection_matrix(target.width(), target.height());
        let mut bytes = vec![0u8; (draws.len() as u64 * self.draw_stride) as usize];
        for (i, draw) in draws.iter().enumerate() {
            let uniform = DrawUniform::new(draw.model, view, proj);
            let start = i * self.draw_stride as usize;
            bytes[start..start + std::mem::size_of::<DrawUniform>()]
                .copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        if !bytes.is_empty() {
            ctx.queue.write_buffer(&self.draw_buffer, 0, &bytes);
        }
        let mut light = self.light;
        light.view_position = camera.position.to_homogeneous().into();
        ctx.queue.write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(&light));
    }
}

impl std::fmt::Debug for ScenePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenePipeline")
            .field("format", &self.format)
            .field("draw_capacity", &self.draw_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::SquareMatrix;

    #[test]
    fn draw_uniform_is_four_matrices() {
        assert_eq!(std::mem::size_of::<DrawUniform>(), 256);
        assert_eq!(std::mem::size_of::<LightUniform>(), 48);
    }

    #[test]
    fn normal_matrix_is_padded_into_mat4() {
        let i = Matrix4::identity();
        let u = DrawUniform::new(i, i, i);
        assert_eq!(u.normal, Into::<[[f32; 4]; 4]>::into(Matrix4::<f32>::identity()));
    }
}
