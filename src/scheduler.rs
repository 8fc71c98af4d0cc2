//! One update-then-draw iteration per display refresh.

use std::time::Instant;

use crate::{error::BoidsError, timer::TimerState};

/// Render target the frame loop draws into.
pub trait RenderSurface {
    /// Whatever the draw batch renders into.
    type Target: ?Sized;

    fn draw_target(&self) -> &Self::Target;
    fn aspect_ratio(&self) -> f32;
    fn is_ready(&self) -> bool;
}

/// Accepts the two batches of a frame, in order.
pub trait SubmissionChannel {
    /// Updates every agent from the last committed frame and commits the
    /// result. Returns the index of the committed frame.
    fn submit_update(&mut self) -> Result<u64, BoidsError>;

    /// Draws `frame`, which is always the frame `submit_update` just returned.
    fn submit_draw(&mut self, frame: u64, aspect: f32) -> Result<(), BoidsError>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    UpdateScheduled,
    DrawScheduled,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Drawn { frame: u64 },
    /// Nothing was drawn this tick. `committed` is set when the update had
    /// already been committed before the draw was aborted.
    Skipped {
        committed: Option<u64>,
        reason: BoidsError,
    },
    /// The target is unusable; the owner has to rebuild it and call
    /// [`FrameScheduler::restart`].
    RestartRequested(BoidsError),
    /// Ticks after a restart request are ignored until `restart`.
    Halted,
}

impl TickOutcome {
    pub fn wants_next_tick(&self) -> bool {
        matches!(self, TickOutcome::Drawn { .. } | TickOutcome::Skipped { .. })
    }
}

#[derive(Debug)]
pub struct FrameScheduler {
    phase: Phase,
    timer: TimerState,
    frames_drawn: u64,
    frames_skipped: u64,
    halted: bool,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        FrameScheduler {
            phase: Phase::Idle,
            timer: TimerState::new(),
            frames_drawn: 0,
            frames_skipped: 0,
            halted: false,
        }
    }

    pub fn tick<T>(&mut self, target: &mut T, now: Instant) -> TickOutcome
    where
        T: RenderSurface + SubmissionChannel + ?Sized,
    {
        if self.halted {
            return TickOutcome::Halted;
        }
        self.timer.tick(now);

        let aspect = target.aspect_ratio();
        if !target.is_ready() {
            return self.fail(
                BoidsError::SurfaceUnavailable("surface is not ready".into()),
                None,
            );
        }

        self.phase = Phase::UpdateScheduled;
        let frame = match target.submit_update() {
            Ok(frame) => frame,
            Err(e) => return self.fail(e, None),
        };

        self.phase = Phase::DrawScheduled;
        if let Err(e) = target.submit_draw(frame, aspect) {
            return self.fail(e, Some(frame));
        }

        self.phase = Phase::Idle;
        self.frames_drawn += 1;
        log::debug!("drew frame {} at aspect {:.3}", frame, aspect);
        TickOutcome::Drawn { frame }
    }

    fn fail(&mut self, err: BoidsError, committed: Option<u64>) -> TickOutcome {
        self.phase = Phase::Idle;
        if err.is_transient() {
            self.frames_skipped += 1;
            log::warn!("skipping draw: {}", err);
            TickOutcome::Skipped {
                committed,
                reason: err,
            }
        } else {
            self.halted = true;
            log::error!("frame loop stopped: {}", err);
            TickOutcome::RestartRequested(err)
        }
    }

    /// Resumes ticking against a freshly built target.
    pub fn restart(&mut self) {
        self.phase = Phase::Idle;
        self.halted = false;
        self.timer.reset();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn timer(&self) -> &TimerState {
        &self.timer
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        ready: bool,
        aspect: f32,
        frame: u64,
        calls: Vec<&'static str>,
        fail_draw: Option<BoidsError>,
        fail_update: Option<BoidsError>,
    }

    impl RenderSurface for Recorder {
        type Target = [&'static str];

        fn draw_target(&self) -> &Self::Target {
            &self.calls
        }

        fn aspect_ratio(&self) -> f32 {
            self.aspect
        }

        fn is_ready(&self) -> bool {
            self.ready
        }
    }

    impl SubmissionChannel for Recorder {
        fn submit_update(&mut self) -> Result<u64, BoidsError> {
            self.calls.push("update");
            if let Some(e) = self.fail_update.take() {
                return Err(e);
            }
            self.frame += 1;
            Ok(self.frame)
        }

        fn submit_draw(&mut self, frame: u64, _aspect: f32) -> Result<(), BoidsError> {
            self.calls.push("draw");
            assert_eq!(frame, self.frame);
            match self.fail_draw.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    fn recorder() -> Recorder {
        Recorder {
            ready: true,
            aspect: 1.5,
            ..Recorder::default()
        }
    }

    #[test]
    fn update_precedes_draw() {
        let mut target = recorder();
        let mut scheduler = FrameScheduler::new();
        let now = Instant::now();
        for expected in 1..=3 {
            assert_eq!(
                scheduler.tick(&mut target, now),
                TickOutcome::Drawn { frame: expected }
            );
            assert_eq!(scheduler.phase(), Phase::Idle);
        }
        assert_eq!(
            target.draw_target(),
            ["update", "draw", "update", "draw", "update", "draw"]
        );
        assert_eq!(scheduler.frames_drawn(), 3);
    }

    #[test]
    fn unready_surface_skips_whole_tick() {
        let mut target = Recorder {
            ready: false,
            ..recorder()
        };
        let mut scheduler = FrameScheduler::new();
        let outcome = scheduler.tick(&mut target, Instant::now());
        assert!(matches!(
            outcome,
            TickOutcome::Skipped {
                committed: None,
                reason: BoidsError::SurfaceUnavailable(_)
            }
        ));
        assert!(outcome.wants_next_tick());
        assert!(target.calls.is_empty());

        target.ready = true;
        assert_eq!(
            scheduler.tick(&mut target, Instant::now()),
            TickOutcome::Drawn { frame: 1 }
        );
    }

    #[test]
    fn aborted_draw_keeps_committed_frame() {
        let mut target = Recorder {
            fail_draw: Some(BoidsError::SurfaceUnavailable("outdated".into())),
            ..recorder()
        };
        let mut scheduler = FrameScheduler::new();
        let outcome = scheduler.tick(&mut target, Instant::now());
        assert!(matches!(outcome, TickOutcome::Skipped { committed: Some(1), .. }));
        assert_eq!(scheduler.frames_skipped(), 1);
        assert_eq!(
            scheduler.tick(&mut target, Instant::now()),
            TickOutcome::Drawn { frame: 2 }
        );
    }

    #[test]
    fn device_loss_halts_until_restart() {
        let mut target = Recorder {
            fail_update: Some(BoidsError::DeviceLost("gone".into())),
            ..recorder()
        };
        let mut scheduler = FrameScheduler::new();
        let outcome = scheduler.tick(&mut target, Instant::now());
        assert_eq!(
            outcome,
            TickOutcome::RestartRequested(BoidsError::DeviceLost("gone".into()))
        );
        assert!(!outcome.wants_next_tick());
        assert!(scheduler.is_halted());

        assert_eq!(scheduler.tick(&mut target, Instant::now()), TickOutcome::Halted);
        assert_eq!(target.calls, ["update"]);

        let mut rebuilt = recorder();
        scheduler.restart();
        assert_eq!(
            scheduler.tick(&mut rebuilt, Instant::now()),
            TickOutcome::Drawn { frame: 1 }
        );
    }
}
