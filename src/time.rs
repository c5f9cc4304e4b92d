use instant::{Duration, Instant};

const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Frame delta tracking with a once-per-second FPS log line.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    window_start: Instant,
    frames_in_window: u32,
    current_fps: u32,
    delta: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            last_frame: now,
            window_start: now,
            frames_in_window: 0,
            current_fps: 0,
            delta: 0.0,
        }
    }

    /// Seconds since the previous tick.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f32 {
        self.delta = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frames_in_window += 1;

        let window = now.saturating_duration_since(self.window_start);
        if window >= FPS_WINDOW {
            self.current_fps = (self.frames_in_window as f32 / window.as_secs_f32()).round() as u32;
            log::info!(
                "FPS: {} (ms per frame: {:.3})",
                self.current_fps,
                window.as_secs_f32() * 1000.0 / self.frames_in_window as f32
            );
            self.frames_in_window = 0;
            self.window_start = now;
        }
        self.delta
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// FPS measured over the last full second, 0 before the first one.
    pub fn current_fps(&self) -> u32 {
        self.current_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_time_between_ticks() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let dt = clock.tick_at(start + Duration::from_millis(20));
        assert!((dt - 0.020).abs() < 1e-4);
        assert_eq!(clock.current_fps(), 0);
    }

    #[test]
    fn fps_updates_once_a_second() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        for i in 1..=50 {
            clock.tick_at(start + Duration::from_millis(20 * i));
        }
        assert_eq!(clock.current_fps(), 50);
        clock.tick_at(start + Duration::from_millis(1020));
        assert_eq!(clock.current_fps(), 50);
    }
}
