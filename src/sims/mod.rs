mod compute;
mod host;

pub use compute::ComputeSim;
pub use host::HostSim;

use crate::{
    agent::AgentRecord, config::SimConfig, error::BoidsError, flocking::FlockingParams,
};

pub const AGENTS_PER_GROUP: u32 = 64;

/// Uniform block of the update kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimUniform {
    pub params: FlockingParams,
    pub agent_count: u32,
}

const _: () = assert!(
    std::mem::size_of::<SimUniform>() == 32,
    "size of SimUniform does not match WGSL"
);

impl SimUniform {
    pub fn new(config: &SimConfig) -> Self {
        SimUniform {
            params: config.params,
            agent_count: config.agent_count,
        }
    }
}

/// Runs the update stage and owns the buffer the draw stage reads.
pub trait Simulator {
    fn new(device: &wgpu::Device, config: &SimConfig) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Records the update of every agent into `encoder` and returns the
    /// index of the frame it commits. Work that has to land on the queue
    /// before the encoder is submitted goes through `queue`.
    fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<u64, BoidsError>;

    /// Commits `records` as the next frame in place of an update. The length
    /// must match the agent count.
    fn load(&mut self, queue: &wgpu::Queue, records: &[AgentRecord]) -> Result<u64, BoidsError>;

    /// Buffer holding the last committed frame, laid out as `AgentRecord`s.
    fn dest_agent_buffer(&self) -> &wgpu::Buffer;

    /// Index of the last committed frame.
    fn frame(&self) -> u64;

    fn agent_count(&self) -> u32;

    fn params(&self) -> FlockingParams;
}
