//! The engine facade.
//!
//! [`Engine`] owns one [`Context`], an optional [`WindowSurface`], the
//! [`FrameOrchestrator`] and everything a frame needs: resources, the entity
//! registry, the built-in scene pipeline, the command queue and the frame
//! clock. A windowed engine presents to its surface; a headless one renders
//! into any [`Presenter`] handed to [`Engine::render_to`].
//!
//! A typical frame:
//!
//! ```ignore
//! let dt = engine.tick();
//! engine.dispatch_commands();
//! engine.render(None);
//! ```

use std::{path::Path, sync::Arc};

use anyhow::Result;
use futures::executor::block_on;
use winit::{event::WindowEvent, window::Window};

use crate::{
    commands::{self, CommandQueue, CommandState, CommandTarget, EngineCommand},
    config::{EngineConfig, EngineSettings, InputState, OutputMode},
    context::Context,
    data_structures::{
        model::Mesh,
        registry::{Entity, Registry, Transform},
    },
    frame::{FrameOrchestrator, FrameOutcome, FrameStats, UiOverlay},
    pipelines::scene::ScenePipeline,
    resources::ResourceManager,
    surface::{Presenter, WindowSurface},
    time::FrameClock,
};

#[derive(Debug)]
pub struct Engine {
    ctx: Context,
    surface: Option<WindowSurface>,
    frame: FrameOrchestrator,
    scene: ScenePipeline,
    pub resources: ResourceManager,
    pub registry: Registry,
    settings: EngineSettings,
    input: InputState,
    commands: Arc<CommandQueue>,
    clock: FrameClock,
    running: bool,
    last_draw_calls: usize,
}

impl Engine {
    /// Creates a device for `window` and configures its surface.
    pub fn new(window: Arc<Window>, config: EngineConfig) -> Result<Self> {
        let (ctx, surface) = block_on(Context::new(window, &config))?;
        Ok(Self::assemble(ctx, Some(surface), &config))
    }

    /// An engine without a window. Frames go through [`Engine::render_to`].
    pub fn headless(config: EngineConfig) -> Result<Self> {
        let ctx = block_on(Context::headless())?;
        Ok(Self::assemble(ctx, None, &config))
    }

    fn assemble(ctx: Context, surface: Option<WindowSurface>, config: &EngineConfig) -> Self {
        let frame = FrameOrchestrator::new(&ctx, config.mode, config.target_format);
        let mut scene = ScenePipeline::new(&ctx, config.target_format);
        scene.clear_colour = config.clear_colour;
        let resources = ResourceManager::new(&ctx, config.import_policy);
        log::info!("engine ready in {:?} mode", config.mode);
        Self {
            ctx,
            surface,
            frame,
            scene,
            resources,
            registry: Registry::new(),
            settings: EngineSettings::from(config),
            input: InputState::default(),
            commands: Arc::new(CommandQueue::new()),
            clock: FrameClock::new(),
            running: true,
            last_draw_calls: 0,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn surface(&self) -> Option<&WindowSurface> {
        self.surface.as_ref()
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn input(&self) -> InputState {
        self.input
    }

    pub fn frame(&self) -> &FrameOrchestrator {
        &self.frame
    }

    pub fn stats(&self) -> FrameStats {
        self.frame.stats()
    }

    /// Draw calls recorded by the built-in scene pipeline last frame.
    pub fn last_draw_calls(&self) -> usize {
        self.last_draw_calls
    }

    pub fn scene_pipeline_mut(&mut self) -> &mut ScenePipeline {
        &mut self.scene
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_mode(&mut self, mode: OutputMode) {
        self.settings.mode = mode;
        self.frame.set_mode(mode);
    }

    /// A handle other threads can push commands through.
    pub fn command_queue(&self) -> Arc<CommandQueue> {
        self.commands.clone()
    }

    pub fn push_command(&self, command: EngineCommand) {
        self.commands.push(command);
    }

    /// Applies every queued command, in push order.
    pub fn dispatch_commands(&mut self) {
        let pending = self.commands.drain();
        if pending.is_empty() {
            return;
        }
        let target = self.surface.as_mut().map(|s| s as &mut dyn CommandTarget);
        commands::dispatch(
            pending,
            CommandState {
                settings: &mut self.settings,
                input: &mut self.input,
                running: &mut self.running,
            },
            target,
        );
    }

    /// Advances the frame clock; returns seconds since the last tick.
    pub fn tick(&mut self) -> f32 {
        self.clock.tick()
    }

    pub fn current_fps(&self) -> u32 {
        self.clock.current_fps()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
        }
    }

    /// Handles the window events the engine cares about. Returns `true` when
    /// a redraw was requested.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => {
                self.push_command(EngineCommand::Quit);
                false
            }
            WindowEvent::Resized(size) => {
                self.resize(size.width, size.height);
                false
            }
            WindowEvent::RedrawRequested => true,
            _ => false,
        }
    }

    /// Loads a glTF file and spawns one entity per mesh under `transform`.
    pub fn spawn_model(&mut self, path: impl AsRef<Path>, transform: Transform) -> Vec<Entity> {
        let meshes: Vec<Arc<Mesh>> = self.resources.load_model(&self.ctx, path);
        ResourceManager::spawn(&mut self.registry, &meshes, transform)
    }

    /// Renders one frame to the window with the built-in scene pipeline.
    /// Without a window the frame is skipped.
    pub fn render(&mut self, overlay: Option<&mut dyn UiOverlay>) -> FrameOutcome {
        let Some(surface) = self.surface.as_mut() else {
            log::debug!("no window surface, frame skipped");
            return FrameOutcome::Skipped;
        };
        Self::render_scene(
            &self.ctx,
            &mut self.frame,
            &mut self.scene,
            &self.registry,
            &mut self.last_draw_calls,
            surface,
            overlay,
        )
    }

    /// Renders one frame into `presenter` with the built-in scene pipeline.
    pub fn render_to(
        &mut self,
        presenter: &mut dyn Presenter,
        overlay: Option<&mut dyn UiOverlay>,
    ) -> FrameOutcome {
        Self::render_scene(
            &self.ctx,
            &mut self.frame,
            &mut self.scene,
            &self.registry,
            &mut self.last_draw_calls,
            presenter,
            overlay,
        )
    }

    fn render_scene(
        ctx: &Context,
        frame: &mut FrameOrchestrator,
        scene: &mut ScenePipeline,
        registry: &Registry,
        draw_calls: &mut usize,
        presenter: &mut dyn Presenter,
        overlay: Option<&mut dyn UiOverlay>,
    ) -> FrameOutcome {
        *draw_calls = 0;
        frame.render_frame(ctx, presenter, overlay, |encoder, target| {
            *draw_calls = scene.render(ctx, encoder, target, registry);
        })
    }

    /// Releases every mesh and texture and empties the registry.
    pub fn cleanup(&mut self) {
        self.registry.clear();
        self.resources.cleanup();
    }
}
