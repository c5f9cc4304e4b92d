//! frame-ngin
//!
//! A small rendering core: it imports glTF scenes into batched GPU meshes,
//! draws them into an offscreen colour + depth target and composites that
//! target onto a window surface, either under an editor UI or straight to
//! the screen. Everything GPU-related hangs off an explicitly owned
//! [`context::Context`]; there is no global state.
//!
//! High-level modules
//! - `context`: device/queue ownership and adapter selection
//! - `surface`: swapchain wrapper, frame acquisition and an offscreen presenter
//! - `render_target`: the resizable offscreen colour + depth pair
//! - `frame`: per-frame orchestration (acquire, scene pass, composite, present)
//! - `resources`: glTF import, mesh batching, texture cache and staging uploads
//! - `data_structures`: vertices, meshes, textures, transforms, camera and the entity registry
//! - `pipelines`: the built-in scene pipeline and the game-mode blit
//! - `commands`: runtime engine commands and their single dispatch site
//! - `config`: engine configuration and runtime settings
//! - `engine`: a facade tying the above together
//! - `logging` / `time`: logger setup and the frame clock
//!

pub mod commands;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod engine;
pub mod frame;
pub mod logging;
pub mod pipelines;
pub mod render_target;
pub mod resources;
pub mod surface;
pub mod time;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit;

pub use commands::EngineCommand;
pub use config::{EngineConfig, ImportPolicy, OutputMode};
pub use engine::Engine;
pub use frame::{FrameOrchestrator, FrameOutcome, UiOverlay};
pub use render_target::RenderTarget;
pub use resources::ResourceManager;
