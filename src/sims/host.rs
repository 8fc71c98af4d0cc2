use super::Simulator;
use crate::{
    agent::AgentRecord,
    config::SimConfig,
    error::BoidsError,
    flocking::{self, FlockingParams},
    pool::AgentPool,
};
use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

/// Update stage on the CPU.
///
/// The pool keeps the authoritative state; every committed frame is
/// uploaded to a vertex buffer before the draw that reads it is submitted.
pub struct HostSim {
    params: FlockingParams,
    pool: AgentPool,
    agent_buffer: wgpu::Buffer,
}

impl HostSim {
    pub fn pool(&self) -> &AgentPool {
        &self.pool
    }
}

impl Simulator for HostSim {
    fn new(device: &wgpu::Device, config: &SimConfig) -> Result<Self> {
        config.validate()?;
        let pool = AgentPool::initialize_random(config.agent_count as usize, &config.seed)
            .context("Failed to seed agent pool")?;

        let agent_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Host Agent Buffer"),
            contents: bytemuck::cast_slice::<AgentRecord, u8>(pool.snapshot().records()),
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        log::info!(
            "host simulator ready: {} agents on {} threads",
            config.agent_count,
            rayon::current_num_threads()
        );

        Ok(Self {
            params: config.params,
            pool,
            agent_buffer,
        })
    }

    fn encode(
        &mut self,
        _device: &wgpu::Device,
        queue: &wgpu::Queue,
        _encoder: &mut wgpu::CommandEncoder,
    ) -> Result<u64, BoidsError> {
        let frame = flocking::step(&self.pool, &self.params)?;
        // queued writes land before the next submission
        queue.write_buffer(
            &self.agent_buffer,
            0,
            bytemuck::cast_slice::<AgentRecord, u8>(self.pool.snapshot().records()),
        );
        Ok(frame)
    }

    fn load(&mut self, queue: &wgpu::Queue, records: &[AgentRecord]) -> Result<u64, BoidsError> {
        let snapshot = self.pool.snapshot();
        let frame = self.pool.commit(snapshot.next_frame(records.to_vec()))?;
        queue.write_buffer(
            &self.agent_buffer,
            0,
            bytemuck::cast_slice::<AgentRecord, u8>(records),
        );
        Ok(frame)
    }

    fn dest_agent_buffer(&self) -> &wgpu::Buffer {
        &self.agent_buffer
    }

    fn frame(&self) -> u64 {
        self.pool.frame()
    }

    fn agent_count(&self) -> u32 {
        self.pool.len() as u32
    }

    fn params(&self) -> FlockingParams {
        self.params
    }
}
