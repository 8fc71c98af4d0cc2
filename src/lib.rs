//! GPU flocking simulation.
//!
//! Agents live in one packed buffer of [`agent::AgentRecord`]s. Each frame
//! the update stage reads a snapshot of the previous frame and commits the
//! next one; the draw stage then renders the committed frame as instanced
//! triangles. [`scheduler::FrameScheduler`] drives the two stages in that
//! order against any [`scheduler::RenderSurface`] +
//! [`scheduler::SubmissionChannel`].

pub mod agent;
pub mod config;
pub mod error;
pub mod flocking;
pub mod inits;
pub mod pool;
pub mod runners;
pub mod scheduler;
pub mod sims;
pub mod timer;

pub use agent::AgentRecord;
pub use config::SimConfig;
pub use error::BoidsError;
pub use flocking::FlockingParams;
pub use pool::{AgentPool, Snapshot};
