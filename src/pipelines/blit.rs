//! Linear-filtered copy of the scene target onto another texture.
//!
//! Used in game mode when a plain texture copy is not possible (the surface
//! has a different format or size, or lacks `COPY_DST`).

use crate::{context::Context, pipelines::mk_render_pipeline};

#[derive(Debug)]
pub struct BlitPipeline {
    pipeline: wgpu::RenderPipeline,
    format: wgpu::TextureFormat,
}

impl BlitPipeline {
    pub fn new(ctx: &Context, format: wgpu::TextureFormat) -> Self {
        let layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Blit Pipeline Layout"),
                bind_group_layouts: &[&ctx.texture_layout],
                immediate_size: 0,
            });
        let pipeline = mk_render_pipeline(
            &ctx.device,
            "Blit Pipeline",
            &layout,
            format,
            None,
            None,
            &[],
            wgpu::ShaderModuleDescriptor {
                label: Some("Blit Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("blit.wgsl").into()),
            },
        );
        Self { pipeline, format }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Records a pass that overwrites `dst` with `source` stretched to fit.
    pub fn blit(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::BindGroup,
        dst: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blit Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: dst,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, source, &[]);
        pass.draw(0..3, 0..1);
    }
}
