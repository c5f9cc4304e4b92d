//! Per-frame orchestration.
//!
//! One call to [`FrameOrchestrator::render_frame`] records and submits one
//! frame:
//!
//! 1. open a command encoder and ask the [`Presenter`] for a frame texture;
//!    without one, submit the empty encoder and report [`FrameOutcome::Skipped`]
//! 2. size the offscreen [`RenderTarget`]: to the overlay's scene viewport in
//!    editor mode, to the frame texture in game mode
//! 3. if the target has area, let the caller record the scene pass
//! 4. editor: the overlay prepares and renders onto the cleared frame, showing
//!    the target as an image; game: copy or blit the target onto the frame
//! 5. submit and present
//!
//! [`FrameOrchestrator::phase`] reports how far the most recent frame got.

use std::iter;

use crate::{
    config::OutputMode,
    context::Context,
    pipelines::blit::BlitPipeline,
    render_target::{RenderTarget, SceneImage},
    surface::{AcquiredFrame, Presenter},
};

/// Last phase a frame reached. `Idle` before the first frame and after a
/// frame that had nothing to present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    SwapchainAcquired,
    OffscreenPass,
    CompositePass,
    Submitted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    Skipped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub presented: u64,
    pub skipped: u64,
    /// How often the scene callback ran.
    pub scene_passes: u64,
}

/// An immediate-mode UI drawn on top of the frame in editor mode.
pub trait UiOverlay {
    /// Size in pixels of the widget that shows the scene. May be zero.
    fn scene_viewport_size(&self) -> (u32, u32);
    /// Called whenever the scene texture was (re)created. Views from an older
    /// image must not be used after this.
    fn set_scene_image(&mut self, ctx: &Context, image: &SceneImage);
    /// Upload vertex data etc. for this frame, before the composite pass opens.
    fn prepare(&mut self, ctx: &Context, encoder: &mut wgpu::CommandEncoder);
    /// Draw into the composite pass, which targets the frame texture.
    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>);
}

/// How game mode gets the scene onto the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositePath {
    Copy,
    Blit,
}

/// Size the offscreen target should have this frame.
pub fn target_size(
    mode: OutputMode,
    frame_size: (u32, u32),
    overlay_viewport: Option<(u32, u32)>,
) -> (u32, u32) {
    match (mode, overlay_viewport) {
        (OutputMode::Editor, Some(viewport)) => viewport,
        _ => frame_size,
    }
}

/// A texture copy works when sizes match, formats are copy-compatible and the
/// frame accepts copies.
pub fn choose_composite(
    target: ((u32, u32), wgpu::TextureFormat),
    frame: ((u32, u32), wgpu::TextureFormat),
    frame_allows_copy: bool,
) -> CompositePath {
    let same_size = target.0 == frame.0;
    let same_format = target.1.remove_srgb_suffix() == frame.1.remove_srgb_suffix();
    if same_size && same_format && frame_allows_copy {
        CompositePath::Copy
    } else {
        CompositePath::Blit
    }
}

#[derive(Debug)]
pub struct FrameOrchestrator {
    mode: OutputMode,
    target: RenderTarget,
    blit: Option<BlitPipeline>,
    blit_source: Option<(u64, wgpu::BindGroup)>,
    overlay_generation: u64,
    phase: FramePhase,
    stats: FrameStats,
}

impl FrameOrchestrator {
    pub fn new(ctx: &Context, mode: OutputMode, target_format: wgpu::TextureFormat) -> Self {
        Self {
            mode,
            target: RenderTarget::new(&ctx.device, 0, 0, target_format),
            blit: None,
            blit_source: None,
            overlay_generation: 0,
            phase: FramePhase::Idle,
            stats: FrameStats::default(),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: OutputMode) {
        if self.mode != mode {
            log::info!("output mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Records and submits one frame. `draw` records the scene pass into the
    /// target (see [`RenderTarget::begin_pass`]) and runs at most once; it is
    /// not called when no frame is available or the target has no area.
    pub fn render_frame<F>(
        &mut self,
        ctx: &Context,
        presenter: &mut dyn Presenter,
        mut overlay: Option<&mut dyn UiOverlay>,
        draw: F,
    ) -> FrameOutcome
    where
        F: FnOnce(&mut wgpu::CommandEncoder, &RenderTarget),
    {
        self.phase = FramePhase::Idle;
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let Some(frame) = presenter.acquire() else {
            ctx.queue.submit(iter::once(encoder.finish()));
            self.stats.skipped += 1;
            return FrameOutcome::Skipped;
        };
        self.phase = FramePhase::SwapchainAcquired;

        let editor = self.mode == OutputMode::Editor && overlay.is_some();
        let viewport = overlay.as_deref().map(|o| o.scene_viewport_size());
        let (width, height) = target_size(self.mode, (frame.width(), frame.height()), viewport);
        self.target.resize(&ctx.device, width, height);

        if editor && self.overlay_generation != self.target.generation() {
            if let Some(o) = overlay.as_deref_mut() {
                o.set_scene_image(ctx, &self.target.scene_image());
            }
            self.overlay_generation = self.target.generation();
        }

        self.phase = FramePhase::OffscreenPass;
        if self.target.has_area() {
            draw(&mut encoder, &self.target);
            self.stats.scene_passes += 1;
        }

        self.phase = FramePhase::CompositePass;
        match overlay {
            Some(o) if editor => self.composite_overlay(ctx, &mut encoder, &frame, o),
            _ => self.composite_game(ctx, &mut encoder, &frame),
        }

        ctx.queue.submit(iter::once(encoder.finish()));
        frame.present();
        self.phase = FramePhase::Submitted;
        self.stats.presented += 1;
        FrameOutcome::Presented
    }

    fn composite_overlay(
        &mut self,
        ctx: &Context,
        encoder: &mut wgpu::CommandEncoder,
        frame: &AcquiredFrame,
        overlay: &mut dyn UiOverlay,
    ) {
        overlay.prepare(ctx, encoder);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("UI Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
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
        overlay.render(&mut pass);
    }

    fn composite_game(&mut self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, frame: &AcquiredFrame) {
        let color = self.target.color();
        let path = choose_composite(
            ((color.width, color.height), self.target.format()),
            ((frame.width(), frame.height()), frame.format()),
            frame.allows_copy_dst(),
        );
        match path {
            CompositePath::Copy => {
                encoder.copy_texture_to_texture(
                    color.texture.as_image_copy(),
                    frame.texture.as_image_copy(),
                    color.size(),
                );
            }
            CompositePath::Blit => {
                if self.blit.as_ref().map(|b| b.format()) != Some(frame.format()) {
                    self.blit = Some(BlitPipeline::new(ctx, frame.format()));
                }
                let generation = self.target.generation();
                if self.blit_source.as_ref().map(|(g, _)| *g) != Some(generation) {
                    let bind_group = color.bind_group(&ctx.device, &ctx.texture_layout);
                    self.blit_source = Some((generation, bind_group));
                }
                if let (Some(blit), Some((_, source))) = (&self.blit, &self.blit_source) {
                    blit.blit(encoder, source, &frame.view);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_follows_overlay_and_game_follows_frame() {
        assert_eq!(target_size(OutputMode::Editor, (800, 600), Some((320, 200))), (320, 200));
        assert_eq!(target_size(OutputMode::Game, (800, 600), Some((320, 200))), (800, 600));
        assert_eq!(target_size(OutputMode::Editor, (800, 600), None), (800, 600));
        assert_eq!(target_size(OutputMode::Editor, (800, 600), Some((0, 0))), (0, 0));
    }

    #[test]
    fn copy_only_when_compatible() {
        use wgpu::TextureFormat::*;
        let copy = |t, f, ok| choose_composite(t, f, ok);
        assert_eq!(copy(((4, 4), Rgba8UnormSrgb), ((4, 4), Rgba8Unorm), true), CompositePath::Copy);
        assert_eq!(copy(((4, 4), Rgba8UnormSrgb), ((4, 4), Bgra8UnormSrgb), true), CompositePath::Blit);
        assert_eq!(copy(((4, 4), Rgba8UnormSrgb), ((8, 4), Rgba8UnormSrgb), true), CompositePath::Blit);
        assert_eq!(copy(((4, 4), Rgba8UnormSrgb), ((4, 4), Rgba8UnormSrgb), false), CompositePath::Blit);
    }
}
