//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around a wgpu texture with its
//! view, sampler and source path, plus [`Pixels`], the decoded CPU-side image
//! that the upload protocol copies into a texture.
//!
//! Textures that carry image data are created empty here and filled through
//! [`crate::resources::upload::StagingUpload`]; render attachments (colour and
//! depth) are created directly.

use std::sync::Arc;

use anyhow::{Context as _, Result};

/// Shared, read-only handle to a cached texture.
pub type TextureRef = Arc<Texture>;

/// A GPU texture with a view and sampler.
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
    /// How the sampler wraps coordinates outside `[0, 1]`.
    pub address_mode: wgpu::AddressMode,
    /// Cache key and diagnostics. Synthetic for generated textures.
    pub path: String,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    /// Format of every image texture loaded from disk or generated.
    pub const IMAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
    /// Wrapping of every image texture.
    pub const IMAGE_ADDRESS_MODE: wgpu::AddressMode = wgpu::AddressMode::Repeat;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// `size` is `[width, height]`; each side is clamped to at least 1 since
    /// wgpu rejects zero-sized textures.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let (width, height) = (size[0].max(1), size[1].max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("depth sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
            address_mode: wgpu::AddressMode::ClampToEdge,
            path: label.to_string(),
        }
    }

    /// Create an offscreen colour attachment that can also be sampled (by a UI
    /// overlay) and copied from (by the game-mode composite).
    pub fn create_color_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let (width, height) = (size[0].max(1), size[1].max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: create_sampler(device, label, wgpu::AddressMode::ClampToEdge),
            width,
            height,
            address_mode: wgpu::AddressMode::ClampToEdge,
            path: label.to_string(),
        }
    }

    /// Create an empty sampled image texture ready to receive a staging copy.
    /// Image textures repeat, so tiled UVs wrap instead of smearing the edge.
    pub fn create_image(device: &wgpu::Device, width: u32, height: u32, path: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(path),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::IMAGE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: create_sampler(device, path, Self::IMAGE_ADDRESS_MODE),
            width,
            height,
            address_mode: Self::IMAGE_ADDRESS_MODE,
            path: path.to_string(),
        }
    }

    pub fn size(&self) -> wgpu::Extent3d {
        extent(self.width, self.height)
    }

    /// Bind group matching [`texture_bind_group_layout`].
    pub fn bind_group(&self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.path),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

/// Texture + sampler layout shared by mesh materials and the blit pass.
pub fn texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("texture_bind_group_layout"),
    })
}

/// Linear filtering with the same wrapping on every axis.
pub fn sampler_descriptor(label: &str, address_mode: wgpu::AddressMode) -> wgpu::SamplerDescriptor<'_> {
    wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    }
}

pub fn create_sampler(device: &wgpu::Device, label: &str, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&sampler_descriptor(label, address_mode))
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Tightly packed RGBA8 pixels on the CPU.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Pixels {
    /// Decode any image format the `image` crate was built with.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes).context("failed to decode image")?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        anyhow::ensure!(width > 0 && height > 0, "image has zero size");
        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    pub fn solid(color: [u8; 4], width: u32, height: u32) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self { width, height, rgba }
    }

    /// Two-colour checkerboard with square cells of `cell` pixels.
    pub fn checkerboard(size: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = cell.max(1);
        let mut rgba = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let c = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
                rgba.extend_from_slice(&c);
            }
        }
        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_fills_every_texel() {
        let p = Pixels::solid([255, 255, 255, 255], 1, 1);
        assert_eq!(p.rgba, vec![255, 255, 255, 255]);
        let p = Pixels::solid([1, 2, 3, 4], 3, 2);
        assert_eq!(p.rgba.len(), 24);
        assert!(p.rgba.chunks(4).all(|c| c == [1, 2, 3, 4]));
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let a = [255, 0, 255, 255];
        let b = [0, 0, 0, 255];
        let p = Pixels::checkerboard(4, 2, a, b);
        let texel = |x: usize, y: usize| &p.rgba[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(texel(0, 0), a);
        assert_eq!(texel(1, 1), a);
        assert_eq!(texel(2, 0), b);
        assert_eq!(texel(0, 2), b);
        assert_eq!(texel(3, 3), a);
    }

    #[test]
    fn sampler_wraps_every_axis_alike() {
        let desc = sampler_descriptor("tiles", Texture::IMAGE_ADDRESS_MODE);
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::Repeat);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::Repeat);
        assert_eq!(desc.address_mode_w, wgpu::AddressMode::Repeat);
        let desc = sampler_descriptor("target", wgpu::AddressMode::ClampToEdge);
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::ClampToEdge);
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Linear);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Pixels::decode(b"definitely not an image").is_err());
    }

    #[test]
    fn decode_reads_png() {
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([9, 8, 7, 6]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        let p = Pixels::decode(bytes.get_ref()).unwrap();
        assert_eq!((p.width, p.height), (2, 3));
        assert_eq!(&p.rgba[0..4], &[9, 8, 7, 6]);
    }
}
