#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod gpu {
    use frame_ngin::{
        Engine, EngineCommand, EngineConfig,
        data_structures::{camera::Camera, registry::Transform},
        frame::FrameOutcome,
        surface::OffscreenPresenter,
    };

    use crate::common::{
        headless_context, read_texture,
        test_utils::{TriangleScene, write_triangle_scene},
    };

    fn headless_engine(config: EngineConfig) -> Option<Engine> {
        // probe first so machines without an adapter skip quietly
        headless_context()?;
        Engine::headless(config).ok()
    }

    #[test]
    fn commands_apply_in_order_without_a_window() {
        let Some(mut engine) = headless_engine(EngineConfig::default()) else { return };
        assert!(engine.is_running());

        let queue = engine.command_queue();
        std::thread::spawn(move || queue.push(EngineCommand::SetVSync(false)))
            .join()
            .expect("pusher thread panicked");
        engine.push_command(EngineCommand::ToggleCursorCapture);
        engine.push_command(EngineCommand::SetFullscreen(true));
        engine.push_command(EngineCommand::Quit);
        engine.dispatch_commands();

        assert!(!engine.settings().vsync);
        assert!(engine.settings().fullscreen);
        assert!(engine.input().cursor_captured);
        assert!(!engine.is_running());
    }

    #[test]
    fn windowless_render_is_skipped() {
        let Some(mut engine) = headless_engine(EngineConfig::default()) else { return };
        assert_eq!(engine.render(None), FrameOutcome::Skipped);
    }

    #[test]
    fn renders_an_imported_scene_in_game_mode() {
        let config = EngineConfig {
            clear_colour: wgpu::Color::RED,
            ..EngineConfig::game()
        };
        let Some(mut engine) = headless_engine(config) else { return };
        let path = write_triangle_scene(
            "engine",
            &TriangleScene {
                nodes: vec![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]],
                ..Default::default()
            },
        );
        let entities = engine.spawn_model(&path, Transform::default());
        assert_eq!(entities.len(), 1);
        let camera = engine.registry.spawn();
        engine.registry.insert(camera, Camera::default());

        let mut presenter = OffscreenPresenter::new(
            engine.context(),
            32,
            32,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        );
        assert_eq!(engine.render_to(&mut presenter, None), FrameOutcome::Presented);
        assert_eq!(engine.last_draw_calls(), 1);

        let pixels = read_texture(engine.context(), presenter.texture());
        let at = |x: usize, y: usize| &pixels[(y * 32 + x) * 4..(y * 32 + x) * 4 + 4];
        assert_eq!(at(0, 31), [255, 0, 0, 255]);
        assert_ne!(at(20, 12), [255, 0, 0, 255]);
    }
}
