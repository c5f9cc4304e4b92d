//! Presentation surfaces.
//!
//! The frame orchestrator only knows the [`Presenter`] trait: hand out the next
//! frame's texture or nothing. [`WindowSurface`] implements it over a wgpu
//! swapchain; [`OffscreenPresenter`] over a plain texture, which is how frames
//! are produced without a window.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use winit::window::{CursorGrabMode, Fullscreen, Window};

use crate::{
    commands::CommandTarget,
    config::{EngineConfig, present_mode},
    context::Context,
};

/// A texture to composite into this frame.
#[derive(Debug)]
pub struct AcquiredFrame {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl AcquiredFrame {
    pub fn from_texture(texture: wgpu::Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            surface_texture: None,
        }
    }

    fn from_surface(surface_texture: wgpu::SurfaceTexture) -> Self {
        let texture = surface_texture.texture.clone();
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            surface_texture: Some(surface_texture),
        }
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    pub fn allows_copy_dst(&self) -> bool {
        self.texture.usage().contains(wgpu::TextureUsages::COPY_DST)
    }

    /// Queues the frame for display. Must be called after the submit that
    /// rendered into it. A no-op for offscreen frames.
    pub fn present(self) {
        if let Some(surface_texture) = self.surface_texture {
            surface_texture.present();
        }
    }
}

/// Source of the frame texture the orchestrator composites into.
pub trait Presenter {
    /// The next frame, or `None` when none is available right now (minimised
    /// window, lost surface, timeout). `None` is not an error.
    fn acquire(&mut self) -> Option<AcquiredFrame>;
    fn size(&self) -> (u32, u32);
    fn format(&self) -> wgpu::TextureFormat;
}

/// Swapchain bound to a winit window.
pub struct WindowSurface {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
    size: (u32, u32),
}

impl WindowSurface {
    pub(crate) fn new(
        ctx: &Context,
        adapter: &wgpu::Adapter,
        surface: wgpu::Surface<'static>,
        window: Arc<Window>,
        engine: &EngineConfig,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(adapter);
        let format = choose_surface_format(&caps).context("surface reports no formats")?;
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        // Lets game mode copy the scene instead of running the blit pipeline.
        if caps.usages.contains(wgpu::TextureUsages::COPY_DST) {
            usage |= wgpu::TextureUsages::COPY_DST;
        }
        let inner = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage,
            format,
            width: inner.width.max(1),
            height: inner.height.max(1),
            present_mode: engine.present_mode(),
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let size = (inner.width, inner.height);
        if size.0 > 0 && size.1 > 0 {
            surface.configure(&ctx.device, &config);
        }
        let mut this = Self {
            surface,
            device: ctx.device.clone(),
            config,
            window,
            size,
        };
        if engine.fullscreen {
            this.set_fullscreen(true);
        }
        Ok(this)
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn config(&self) -> &wgpu::SurfaceConfiguration {
        &self.config
    }

    /// Reconfigures for a new window size. A zero-sized window is remembered
    /// but not configured; acquisition returns `None` until it grows again.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    fn reconfigure(&self) {
        if self.size.0 > 0 && self.size.1 > 0 {
            self.surface.configure(&self.device, &self.config);
        }
    }
}

impl std::fmt::Debug for WindowSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowSurface")
            .field("config", &self.config)
            .field("size", &self.size)
            .finish()
    }
}

impl Presenter for WindowSurface {
    fn acquire(&mut self) -> Option<AcquiredFrame> {
        if self.size.0 == 0 || self.size.1 == 0 {
            return None;
        }
        match self.surface.get_current_texture() {
            Ok(surface_texture) => Some(AcquiredFrame::from_surface(surface_texture)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.reconfigure();
                None
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of memory acquiring the swapchain texture");
                None
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("swapchain acquire timed out");
                None
            }
            Err(wgpu::SurfaceError::Other) => {
                log::debug!("swapchain texture unavailable");
                None
            }
        }
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

impl CommandTarget for WindowSurface {
    fn set_vsync(&mut self, enabled: bool) {
        self.config.present_mode = present_mode(enabled);
        self.reconfigure();
    }

    fn set_fullscreen(&mut self, enabled: bool) {
        self.window
            .set_fullscreen(enabled.then_some(Fullscreen::Borderless(None)));
    }

    fn set_cursor_captured(&mut self, captured: bool) {
        let result = if captured {
            self.window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = result {
            log::warn!("cursor grab not supported: {e}");
        }
        self.window.set_cursor_visible(!captured);
    }
}

/// Prefers an sRGB format so the scene's sRGB target blits without a
/// colour shift.
pub fn choose_surface_format(caps: &wgpu::SurfaceCapabilities) -> Option<wgpu::TextureFormat> {
    caps.formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first().copied())
}

/// Presents into an ordinary texture. Used for headless rendering and tests.
#[derive(Debug)]
pub struct OffscreenPresenter {
    texture: wgpu::Texture,
    /// When false, `acquire` reports no frame, like a minimised window.
    pub available: bool,
    pub acquired: u32,
}

impl OffscreenPresenter {
    pub fn new(ctx: &Context, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen presenter"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        Self {
            texture,
            available: true,
            acquired: 0,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

impl Presenter for OffscreenPresenter {
    fn acquire(&mut self) -> Option<AcquiredFrame> {
        if !self.available {
            return None;
        }
        self.acquired += 1;
        Some(AcquiredFrame::from_texture(self.texture.clone()))
    }

    fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }
}
