//! GPU device context.
//!
//! [`Context`] owns the wgpu device and queue and is passed by reference to
//! every subsystem that touches the GPU. There is no global state; two
//! contexts can coexist (tests create their own headless one).

use std::sync::Arc;

use anyhow::{Context as _, Result};
use winit::window::Window;

use crate::{config::EngineConfig, data_structures::texture, surface::WindowSurface};

#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    /// Texture + sampler layout shared by mesh materials, the scene pipeline
    /// and the blit pass.
    pub texture_layout: wgpu::BindGroupLayout,
}

impl Context {
    /// Creates a device able to present to `window`, plus the configured surface.
    pub async fn new(window: Arc<Window>, config: &EngineConfig) -> Result<(Self, WindowSurface)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a GPU adapter for the window surface")?;

        let ctx = Self::from_adapter(&adapter).await?;
        let surface = WindowSurface::new(&ctx, &adapter, surface, window, config)?;
        Ok((ctx, surface))
    }

    /// Creates a device without any surface, for offscreen rendering and tests.
    pub async fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter available")?;
        Self::from_adapter(&adapter).await
    }

    async fn from_adapter(adapter: &wgpu::Adapter) -> Result<Self> {
        let adapter_info = adapter.get_info();
        log::info!(
            "using adapter {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("frame-ngin device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let texture_layout = texture::texture_bind_group_layout(&device);
        Ok(Self {
            device,
            queue,
            adapter_info,
            texture_layout,
        })
    }
}
