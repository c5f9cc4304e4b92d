//! Offscreen colour + depth target the scene is drawn into.
//!
//! Both textures always have the same size and are replaced together.
//! [`RenderTarget::resize`] is a no-op when the size does not change, so the
//! frame loop can call it unconditionally every frame.

use crate::data_structures::texture::Texture;

#[derive(Debug)]
pub struct RenderTarget {
    color: Texture,
    depth: Texture,
    /// Logical size. May be zero; allocations are clamped to 1x1.
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    generation: u64,
}

/// What a UI overlay needs to show the scene as an image. `generation`
/// changes whenever the underlying texture is recreated, at which point any
/// bind group built from an older view must be rebuilt.
#[derive(Clone, Debug)]
pub struct SceneImage {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
    pub generation: u64,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        let (color, depth) = Self::allocate(device, width, height, format);
        Self {
            color,
            depth,
            width,
            height,
            format,
            generation: 1,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> (Texture, Texture) {
        let size = [width, height];
        (
            Texture::create_color_target(device, size, format, "scene color target"),
            Texture::create_depth_texture(device, size, "scene depth target"),
        )
    }

    /// Recreates both textures when the size changed. Returns whether it did.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if (width, height) == (self.width, self.height) {
            return false;
        }
        let (color, depth) = Self::allocate(device, width, height, self.format);
        // old textures are released here, after the new pair exists
        self.color = color;
        self.depth = depth;
        self.width = width;
        self.height = height;
        self.generation += 1;
        log::debug!("render target resized to {}x{}", width, height);
        true
    }

    pub fn color(&self) -> &Texture {
        &self.color
    }

    pub fn depth(&self) -> &Texture {
        &self.depth
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Starts at 1 and increases by one per reallocation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn scene_image(&self) -> SceneImage {
        SceneImage {
            view: self.color.view.clone(),
            sampler: self.color.sampler.clone(),
            width: self.width,
            height: self.height,
            generation: self.generation,
        }
    }

    /// Opens the scene pass: colour cleared to `clear`, depth cleared to 1.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}
