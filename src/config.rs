//! Engine configuration and live settings.
//!
//! [`EngineConfig`] is fixed at startup; [`EngineSettings`] is the mutable
//! subset that engine commands change while running.

/// Where the scene image ends up each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Scene is rendered offscreen and shown inside the UI overlay.
    #[default]
    Editor,
    /// Scene is rendered offscreen at surface size and copied/blitted to it.
    Game,
}

/// How imported node hierarchies become meshes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImportPolicy {
    /// Flatten every node into world space and merge by material.
    #[default]
    Batched,
    /// One mesh per (node, primitive); vertices stay in local space and the
    /// node's world matrix is kept on the mesh.
    PerNode,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub mode: OutputMode,
    pub import_policy: ImportPolicy,
    pub vsync: bool,
    pub fullscreen: bool,
    pub clear_colour: wgpu::Color,
    /// Requested window size in physical pixels.
    pub initial_size: (u32, u32),
    /// Colour format of the offscreen scene target.
    pub target_format: wgpu::TextureFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Editor,
            import_policy: ImportPolicy::Batched,
            vsync: true,
            fullscreen: false,
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.12,
                a: 1.0,
            },
            initial_size: (1280, 720),
            target_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

impl EngineConfig {
    pub fn game() -> Self {
        Self {
            mode: OutputMode::Game,
            ..Default::default()
        }
    }

    pub fn present_mode(&self) -> wgpu::PresentMode {
        present_mode(self.vsync)
    }
}

pub fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

/// Settings that change at runtime through engine commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub mode: OutputMode,
    pub vsync: bool,
    pub fullscreen: bool,
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            mode: config.mode,
            vsync: config.vsync,
            fullscreen: config.fullscreen,
        }
    }
}

/// Input-related state toggled by commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub cursor_captured: bool,
}
