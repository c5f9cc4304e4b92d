//! Staging-buffer upload protocol.
//!
//! Every CPU to GPU transfer goes through [`StagingUpload`]: destinations are
//! created with `COPY_DST`, their bytes are appended to one CPU-side arena, and
//! [`StagingUpload::submit`] turns the arena into a single `COPY_SRC` staging
//! buffer plus one command encoder holding all copies. The staging buffer is
//! dropped right after the submit; wgpu keeps it alive until the copies have
//! executed, so nothing here waits on the GPU.

use std::iter;

use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::texture::{Pixels, Texture},
};

/// Each chunk in the staging arena starts on this boundary. It satisfies both
/// the buffer-copy alignment (4) and texel block alignment for RGBA8 (4), and
/// keeps texture chunks on the same boundary wgpu uses for row pitch.
pub const CHUNK_ALIGNMENT: u64 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64;

#[derive(Debug)]
enum PendingCopy {
    Buffer {
        offset: u64,
        size: u64,
        dst: wgpu::Buffer,
    },
    Texture {
        offset: u64,
        bytes_per_row: u32,
        dst: wgpu::Texture,
        size: wgpu::Extent3d,
    },
}

/// What a submit moved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadReceipt {
    pub staged_bytes: u64,
    pub copies: usize,
}

#[derive(Debug, Default)]
pub struct StagingUpload {
    label: Option<String>,
    arena: Vec<u8>,
    copies: Vec<PendingCopy>,
}

impl StagingUpload {
    pub fn new(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    pub fn staged_bytes(&self) -> u64 {
        self.arena.len() as u64
    }

    pub fn copy_count(&self) -> usize {
        self.copies.len()
    }

    /// Creates a GPU buffer of `usage | COPY_DST` sized for `data` and queues
    /// the copy that fills it.
    pub fn buffer(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        data: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        let size = copy_size(data.len() as u64);
        let dst = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.push_buffer(data, &dst);
        dst
    }

    /// Queues a copy of `data` into the start of `dst`.
    pub fn push_buffer(&mut self, data: &[u8], dst: &wgpu::Buffer) {
        let size = copy_size(data.len() as u64);
        let offset = append_chunk(&mut self.arena, data, size);
        self.copies.push(PendingCopy::Buffer {
            offset,
            size,
            dst: dst.clone(),
        });
    }

    /// Creates a sampled RGBA texture for `pixels` and queues its copy.
    pub fn texture(&mut self, device: &wgpu::Device, pixels: &Pixels, path: &str) -> Texture {
        let texture = Texture::create_image(device, pixels.width, pixels.height, path);
        self.push_texture(pixels, &texture.texture);
        texture
    }

    pub fn push_texture(&mut self, pixels: &Pixels, dst: &wgpu::Texture) {
        let (rows, bytes_per_row) = pad_rows(&pixels.rgba, pixels.bytes_per_row(), pixels.height);
        let offset = append_chunk(&mut self.arena, &rows, rows.len() as u64);
        self.copies.push(PendingCopy::Texture {
            offset,
            bytes_per_row,
            dst: dst.clone(),
            size: wgpu::Extent3d {
                width: pixels.width,
                height: pixels.height,
                depth_or_array_layers: 1,
            },
        });
    }

    /// Creates the staging buffer, records every queued copy in one encoder
    /// and submits it. An empty upload records nothing.
    pub fn submit(self, ctx: &Context) -> UploadReceipt {
        if self.copies.is_empty() {
            return UploadReceipt::default();
        }
        let label = self.label.as_deref().unwrap_or("staging upload");
        let staging = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &self.arena,
                usage: wgpu::BufferUsages::COPY_SRC,
            });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Upload Encoder"),
            });
        for copy in &self.copies {
            match copy {
                PendingCopy::Buffer { offset, size, dst } => {
                    encoder.copy_buffer_to_buffer(&staging, *offset, dst, 0, *size);
                }
                PendingCopy::Texture {
                    offset,
                    bytes_per_row,
                    dst,
                    size,
                } => {
                    encoder.copy_buffer_to_texture(
                        wgpu::TexelCopyBufferInfo {
                            buffer: &staging,
                            layout: wgpu::TexelCopyBufferLayout {
                                offset: *offset,
                                bytes_per_row: Some(*bytes_per_row),
                                rows_per_image: Some(size.height),
                            },
                        },
                        wgpu::TexelCopyTextureInfo {
                            texture: dst,
                            mip_level: 0,
                            origin: wgpu::Origin3d::ZERO,
                            aspect: wgpu::TextureAspect::All,
                        },
                        *size,
                    );
                }
            }
        }
        ctx.queue.submit(iter::once(encoder.finish()));

        log::debug!(
            "{}: {} copies, {} bytes staged",
            label,
            self.copies.len(),
            self.arena.len()
        );
        UploadReceipt {
            staged_bytes: self.arena.len() as u64,
            copies: self.copies.len(),
        }
    }
}

/// Buffer copies must be a multiple of `COPY_BUFFER_ALIGNMENT` and non-zero.
pub fn copy_size(len: u64) -> u64 {
    align_to(len.max(1), wgpu::COPY_BUFFER_ALIGNMENT)
}

pub fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Appends `data` at the next aligned offset, zero-padding up to `size`.
/// Returns the chunk's offset.
fn append_chunk(arena: &mut Vec<u8>, data: &[u8], size: u64) -> u64 {
    let offset = align_to(arena.len() as u64, CHUNK_ALIGNMENT);
    arena.resize(offset as usize, 0);
    arena.extend_from_slice(data);
    arena.resize((offset + size) as usize, 0);
    offset
}

/// Re-lays tightly packed rows of `unpadded` bytes so each row starts on the
/// pitch wgpu requires for buffer-to-texture copies.
pub fn pad_rows(rgba: &[u8], unpadded: u32, height: u32) -> (Vec<u8>, u32) {
    let padded = align_to(unpadded as u64, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64) as u32;
    if padded == unpadded {
        return (rgba.to_vec(), padded);
    }
    let mut out = vec![0u8; padded as usize * height as usize];
    for (row, src) in rgba.chunks_exact(unpadded as usize).take(height as usize).enumerate() {
        let start = row * padded as usize;
        out[start..start + unpadded as usize].copy_from_slice(src);
    }
    (out, padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_start_on_aligned_offsets() {
        let mut arena = Vec::new();
        assert_eq!(append_chunk(&mut arena, &[1; 48], 48), 0);
        let second = append_chunk(&mut arena, &[2; 12], 12);
        assert_eq!(second, CHUNK_ALIGNMENT);
        assert_eq!(arena.len() as u64, CHUNK_ALIGNMENT + 12);
        assert_eq!(arena[second as usize], 2);
        assert_eq!(arena[48], 0);
    }

    #[test]
    fn copy_sizes_are_word_aligned() {
        assert_eq!(copy_size(0), 4);
        assert_eq!(copy_size(6), 8);
        assert_eq!(copy_size(48), 48);
    }

    #[test]
    fn narrow_rows_are_padded_to_copy_pitch() {
        let rgba: Vec<u8> = (0..2 * 2 * 4).map(|i| i as u8).collect();
        let (rows, pitch) = pad_rows(&rgba, 2 * 4, 2);
        assert_eq!(pitch, 256);
        assert_eq!(rows.len(), 512);
        assert_eq!(&rows[0..8], &rgba[0..8]);
        assert_eq!(&rows[256..264], &rgba[8..16]);
        assert!(rows[8..256].iter().all(|b| *b == 0));
    }

    #[test]
    fn aligned_rows_are_copied_as_is() {
        let rgba = vec![7u8; 64 * 4 * 3];
        let (rows, pitch) = pad_rows(&rgba, 64 * 4, 3);
        assert_eq!(pitch, 256);
        assert_eq!(rows, rgba);
    }
}
