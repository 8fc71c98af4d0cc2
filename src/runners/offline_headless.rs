use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{agent::AgentRecord, config::SimConfig, error::BoidsError, sims::Simulator};
use anyhow::Context;

/// Runs the update stage without a window.
pub struct OfflineHeadless<T>
where
    T: Simulator,
{
    sim: T,
    device: wgpu::Device,
    queue: wgpu::Queue,
    device_lost: Arc<AtomicBool>,
}

impl<T> OfflineHeadless<T>
where
    T: Simulator,
{
    pub async fn new(sim_config: &SimConfig) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::Backends::all());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .context("Failed to get WGPU Adapter")?;
        let (device, queue) = super::get_device_and_queue(&adapter).await?;
        let device_lost = super::watch_device(&device);
        let sim = T::new(&device, sim_config)?;

        Ok(Self {
            sim,
            device,
            queue,
            device_lost,
        })
    }

    pub fn sim(&self) -> &T {
        &self.sim
    }

    /// Submits one update and waits for it. Returns the committed frame.
    pub fn step(&mut self) -> Result<u64, BoidsError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Headless Step"),
            });
        let frame = self.sim.encode(&self.device, &self.queue, &mut encoder)?;
        self.queue.submit(Some(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);

        if self.device_lost.load(Ordering::Acquire) {
            return Err(BoidsError::DeviceLost("device reported an uncaptured error".into()));
        }
        Ok(frame)
    }

    /// Replaces the agents with `records`. Returns the committed frame.
    pub fn load_agents(&mut self, records: &[AgentRecord]) -> Result<u64, BoidsError> {
        self.sim.load(&self.queue, records)
    }

    /// Copies the committed frame back to the host.
    pub fn read_agents(&self) -> anyhow::Result<Vec<AgentRecord>> {
        let size = (self.sim.agent_count() as usize * std::mem::size_of::<AgentRecord>())
            as wgpu::BufferAddress;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Agent Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Agent Readback"),
            });
        encoder.copy_buffer_to_buffer(self.sim.dest_agent_buffer(), 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let mapping = slice.map_async(wgpu::MapMode::Read);
        self.device.poll(wgpu::Maintain::Wait);
        pollster::block_on(mapping).context("Failed to map agent staging buffer")?;

        let agents = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, AgentRecord>(&data).to_vec()
        };
        staging.unmap();
        Ok(agents)
    }
}
