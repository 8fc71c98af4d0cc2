use thiserror::Error;

/// Errors raised by the boid simulation and its frame loop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoidsError {
    /// Invalid startup configuration. The frame loop never starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The render target could not be acquired this tick. The draw is
    /// skipped and retried on the next tick.
    #[error("render surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// The execution context is gone. The owner has to rebuild the engine.
    #[error("device lost: {0}")]
    DeviceLost(String),

    #[error("frame holds {got} agents but the pool holds {expected}")]
    FrameSizeMismatch { expected: usize, got: usize },

    #[error("frame was computed from frame {base} but the pool is at frame {current}")]
    StaleFrame { base: u64, current: u64 },
}

impl BoidsError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        BoidsError::Configuration(msg.into())
    }

    /// Whether the frame loop may keep ticking after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, BoidsError::SurfaceUnavailable(_))
    }
}
