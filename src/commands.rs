//! Engine commands.
//!
//! Anything outside the frame loop (UI callbacks, input handlers, another
//! thread) asks the engine to change state by pushing an [`EngineCommand`].
//! The queue is drained once per frame by [`dispatch`], the only place that
//! matches on the command type.

use std::sync::Mutex;

use crate::config::{EngineSettings, InputState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    SetVSync(bool),
    SetFullscreen(bool),
    ToggleCursorCapture,
    Quit,
}

/// Window-side effects of commands. Implemented by the window surface.
pub trait CommandTarget {
    fn set_vsync(&mut self, enabled: bool);
    fn set_fullscreen(&mut self, enabled: bool);
    fn set_cursor_captured(&mut self, captured: bool);
}

/// Thread-safe FIFO of pending commands.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Mutex<Vec<EngineCommand>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: EngineCommand) {
        match self.pending.lock() {
            Ok(mut pending) => pending.push(command),
            Err(poisoned) => poisoned.into_inner().push(command),
        }
    }

    /// Takes every pending command in push order.
    pub fn drain(&self) -> Vec<EngineCommand> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable engine state a command may touch.
pub struct CommandState<'a> {
    pub settings: &'a mut EngineSettings,
    pub input: &'a mut InputState,
    pub running: &'a mut bool,
}

/// Applies `commands` in order. `target` is `None` when there is no window
/// (headless); settings are still updated so they are correct once one exists.
pub fn dispatch(
    commands: impl IntoIterator<Item = EngineCommand>,
    state: CommandState<'_>,
    mut target: Option<&mut dyn CommandTarget>,
) {
    for command in commands {
        log::debug!("dispatching {:?}", command);
        match command {
            EngineCommand::SetVSync(enabled) => {
                state.settings.vsync = enabled;
                if let Some(t) = target.as_deref_mut() {
                    t.set_vsync(enabled);
                }
            }
            EngineCommand::SetFullscreen(enabled) => {
                state.settings.fullscreen = enabled;
                if let Some(t) = target.as_deref_mut() {
                    t.set_fullscreen(enabled);
                }
            }
            EngineCommand::ToggleCursorCapture => {
                state.input.cursor_captured = !state.input.cursor_captured;
                if let Some(t) = target.as_deref_mut() {
                    t.set_cursor_captured(state.input.cursor_captured);
                }
            }
            EngineCommand::Quit => {
                log::info!("quit requested");
                *state.running = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_commands_in_push_order() {
        let queue = CommandQueue::new();
        queue.push(EngineCommand::SetVSync(false));
        queue.push(EngineCommand::Quit);
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.drain(),
            vec![EngineCommand::SetVSync(false), EngineCommand::Quit]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_accepts_pushes_from_other_threads() {
        let queue = std::sync::Arc::new(CommandQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let q = queue.clone();
                std::thread::spawn(move || q.push(EngineCommand::ToggleCursorCapture))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(queue.drain().len(), 4);
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl CommandTarget for Recorder {
        fn set_vsync(&mut self, enabled: bool) {
            self.calls.push(format!("vsync {enabled}"));
        }
        fn set_fullscreen(&mut self, enabled: bool) {
            self.calls.push(format!("fullscreen {enabled}"));
        }
        fn set_cursor_captured(&mut self, captured: bool) {
            self.calls.push(format!("cursor {captured}"));
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings::from(&crate::config::EngineConfig::default())
    }

    #[test]
    fn every_command_updates_state_and_target() {
        let mut settings = settings();
        let mut input = InputState::default();
        let mut running = true;
        let mut target = Recorder::default();
        dispatch(
            [
                EngineCommand::SetVSync(false),
                EngineCommand::SetFullscreen(true),
                EngineCommand::ToggleCursorCapture,
                EngineCommand::ToggleCursorCapture,
                EngineCommand::Quit,
            ],
            CommandState {
                settings: &mut settings,
                input: &mut input,
                running: &mut running,
            },
            Some(&mut target),
        );
        assert!(!settings.vsync);
        assert!(settings.fullscreen);
        assert!(!input.cursor_captured);
        assert!(!running);
        assert_eq!(
            target.calls,
            vec!["vsync false", "fullscreen true", "cursor true", "cursor false"]
        );
    }

    #[test]
    fn headless_dispatch_still_updates_settings() {
        let mut settings = settings();
        let mut input = InputState::default();
        let mut running = true;
        dispatch(
            [EngineCommand::ToggleCursorCapture, EngineCommand::SetVSync(false)],
            CommandState {
                settings: &mut settings,
                input: &mut input,
                running: &mut running,
            },
            None,
        );
        assert!(input.cursor_captured);
        assert!(!settings.vsync);
        assert!(running);
    }
}
