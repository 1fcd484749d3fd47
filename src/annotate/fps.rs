use std::time::Instant;

/// Frames per FPS estimate.
pub const FPS_WINDOW: u32 = 10;

/// Windowed frame-rate estimate for the live loop.
///
/// Counts processed frames; once `FPS_WINDOW` frames have been seen the
/// estimate becomes `FPS_WINDOW / seconds since the window opened` and the
/// window restarts. Between updates the last estimate is held.
#[derive(Debug)]
pub struct FpsMeter {
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            window_start: start,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Record one processed frame. Returns the new estimate when the window
    /// closes on this frame.
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        if self.frames < FPS_WINDOW {
            return None;
        }
        let elapsed = now.duration_since(self.window_start).as_secs_f64();
        if elapsed > 0.0 {
            self.fps = f64::from(self.frames) / elapsed;
        }
        self.window_start = now;
        self.frames = 0;
        Some(self.fps)
    }

    /// Last computed estimate (0.0 until the first window closes).
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}
