use std::time::{Duration, Instant};

/// Frame timing owned by the scheduler.
#[derive(Debug, Default, Clone)]
pub struct TimerState {
    then: Option<Instant>,
    delta: Duration,
    fps: f32,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tick at `now` and returns the time since the previous one.
    /// The first tick only sets the reference point.
    pub fn tick(&mut self, now: Instant) -> Duration {
        self.delta = match self.then {
            Some(then) => now.saturating_duration_since(then),
            None => Duration::ZERO,
        };
        self.then = Some(now);
        let secs = self.delta.as_secs_f32();
        self.fps = if secs > 0.0 { 1.0 / secs } else { 0.0 };
        self.delta
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// One decimal below 10 fps, whole frames above.
    pub fn fps_label(&self) -> String {
        if self.fps < 10.0 {
            format!("{:.1}", self.fps)
        } else {
            format!("{:.0}", self.fps)
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
