#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod gpu {
    use std::cell::Cell;

    use frame_ngin::{
        config::OutputMode,
        context::Context,
        frame::{FrameOrchestrator, FrameOutcome, FramePhase, UiOverlay},
        render_target::{RenderTarget, SceneImage},
        surface::OffscreenPresenter,
    };

    use crate::common::{headless_context, read_texture};

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    #[derive(Default)]
    struct RecordingOverlay {
        viewport: (u32, u32),
        images: Vec<(u32, u32, u64)>,
        prepared: u32,
        rendered: u32,
    }

    impl UiOverlay for RecordingOverlay {
        fn scene_viewport_size(&self) -> (u32, u32) {
            self.viewport
        }
        fn set_scene_image(&mut self, _: &Context, image: &SceneImage) {
            self.images.push((image.width, image.height, image.generation));
        }
        fn prepare(&mut self, _: &Context, _: &mut wgpu::CommandEncoder) {
            self.prepared += 1;
        }
        fn render(&mut self, _: &mut wgpu::RenderPass<'_>) {
            self.rendered += 1;
        }
    }

    fn clear_scene(colour: wgpu::Color) -> impl FnOnce(&mut wgpu::CommandEncoder, &RenderTarget) {
        move |encoder, target| {
            let _pass = target.begin_pass(encoder, colour);
        }
    }

    #[test]
    fn resize_recreates_only_on_change() {
        let Some(ctx) = headless_context() else { return };
        let mut target = RenderTarget::new(&ctx.device, 800, 600, FORMAT);
        assert_eq!(target.generation(), 1);

        assert!(!target.resize(&ctx.device, 800, 600));
        assert_eq!(target.generation(), 1);

        assert!(target.resize(&ctx.device, 1024, 768));
        assert_eq!(target.generation(), 2);
        assert_eq!((target.width(), target.height()), (1024, 768));
        assert_eq!((target.color().width, target.color().height), (1024, 768));
        assert_eq!((target.depth().width, target.depth().height), (1024, 768));
    }

    #[test]
    fn phase_reports_how_far_the_last_frame_got() {
        let Some(ctx) = headless_context() else { return };
        let mut frames = FrameOrchestrator::new(&ctx, OutputMode::Game, FORMAT);
        let mut presenter = OffscreenPresenter::new(&ctx, 16, 16, FORMAT);
        assert_eq!(frames.phase(), FramePhase::Idle);

        let outcome = frames.render_frame(&ctx, &mut presenter, None, clear_scene(wgpu::Color::RED));
        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(frames.phase(), FramePhase::Submitted);

        presenter.available = false;
        let outcome = frames.render_frame(&ctx, &mut presenter, None, clear_scene(wgpu::Color::RED));
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(frames.phase(), FramePhase::Idle);
    }

    #[test]
    fn unavailable_frame_skips_without_drawing() {
        let Some(ctx) = headless_context() else { return };
        let mut frames = FrameOrchestrator::new(&ctx, OutputMode::Game, FORMAT);
        let mut presenter = OffscreenPresenter::new(&ctx, 64, 32, FORMAT);
        presenter.available = false;

        let called = Cell::new(false);
        let outcome = frames.render_frame(&ctx, &mut presenter, None, |_, _| called.set(true));

        assert_eq!(outcome, FrameOutcome::Skipped);
        assert!(!called.get());
        assert_eq!(frames.stats().skipped, 1);
        assert_eq!(frames.stats().presented, 0);
    }

    #[test]
    fn game_mode_copies_scene_onto_frame() {
        let Some(ctx) = headless_context() else { return };
        let mut frames = FrameOrchestrator::new(&ctx, OutputMode::Game, FORMAT);
        let mut presenter = OffscreenPresenter::new(&ctx, 64, 32, FORMAT);

        let outcome = frames.render_frame(&ctx, &mut presenter, None, clear_scene(wgpu::Color::RED));

        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!((frames.target().width(), frames.target().height()), (64, 32));
        let pixels = read_texture(&ctx, presenter.texture());
        assert!(pixels.chunks(4).all(|p| p == [255, 0, 0, 255]));
    }

    #[test]
    fn game_mode_blits_into_other_formats() {
        let Some(ctx) = headless_context() else { return };
        let mut frames = FrameOrchestrator::new(&ctx, OutputMode::Game, FORMAT);
        let mut presenter = OffscreenPresenter::new(&ctx, 16, 16, wgpu::TextureFormat::Bgra8UnormSrgb);

        frames.render_frame(&ctx, &mut presenter, None, clear_scene(wgpu::Color::RED));

        let pixels = read_texture(&ctx, presenter.texture());
        assert!(pixels.chunks(4).all(|p| p == [0, 0, 255, 255]));
    }

    #[test]
    fn editor_mode_follows_the_overlay_viewport() {
        let Some(ctx) = headless_context() else { return };
        let mut frames = FrameOrchestrator::new(&ctx, OutputMode::Editor, FORMAT);
        let mut presenter = OffscreenPresenter::new(&ctx, 64, 64, FORMAT);
        let mut overlay = RecordingOverlay {
            viewport: (40, 30),
            ..Default::default()
        };

        for _ in 0..2 {
            frames.render_frame(&ctx, &mut presenter, Some(&mut overlay), clear_scene(wgpu::Color::RED));
        }
        assert_eq!(overlay.images, vec![(40, 30, 2)]);
        assert_eq!((overlay.prepared, overlay.rendered), (2, 2));

        overlay.viewport = (20, 10);
        frames.render_frame(&ctx, &mut presenter, Some(&mut overlay), clear_scene(wgpu::Color::RED));
        assert_eq!(overlay.images.last(), Some(&(20, 10, 3)));
        assert_eq!(frames.stats().scene_passes, 3);

        // A collapsed viewport still composites the UI but skips the scene.
        overlay.viewport = (0, 0);
        let outcome =
            frames.render_frame(&ctx, &mut presenter, Some(&mut overlay), clear_scene(wgpu::Color::RED));
        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(frames.stats().scene_passes, 3);
        assert_eq!(overlay.rendered, 4);

        let pixels = read_texture(&ctx, presenter.texture());
        assert!(pixels.chunks(4).all(|p| p == [0, 0, 0, 255]));
    }
}
