use std::borrow::Cow;

use super::{SimUniform, Simulator, AGENTS_PER_GROUP};
use crate::{
    agent::{AgentRecord, AGENT_SIZE},
    config::SimConfig,
    error::BoidsError,
    flocking::FlockingParams,
    pool::AgentPool,
};
use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

/// Update stage on the GPU.
///
/// Two agent buffers alternate as source and destination. The kernel reads
/// the source through a read-only binding and writes only its own slot of
/// the destination, so no invocation can observe this frame's results.
///
/// Committed frames stay on the device; use
/// [`OfflineHeadless::read_agents`](crate::runners::OfflineHeadless::read_agents)
/// to get them back on the host.
pub struct ComputeSim {
    params: FlockingParams,
    agent_count: u32,
    agent_bind_groups: Vec<wgpu::BindGroup>,
    agent_buffers: Vec<wgpu::Buffer>,
    compute_pipeline: wgpu::ComputePipeline,
    work_group_count: u32,
    step_num: u64,
}

impl Simulator for ComputeSim {
    fn new(device: &wgpu::Device, config: &SimConfig) -> Result<Self> {
        config.validate()?;
        let pool = AgentPool::initialize_random(config.agent_count as usize, &config.seed)
            .context("Failed to seed agent pool")?;
        let initial_agents = pool.snapshot();

        let sim_uniform = SimUniform::new(config);
        let sim_params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Params Buffer"),
            contents: bytemuck::cast_slice(&[sim_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let compute_module = device.create_shader_module(&wgpu::ShaderModuleDescriptor {
            label: Some("Compute Module"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/boids.wgsl"))),
        });

        let agents_size = wgpu::BufferSize::new((config.agent_count as usize * AGENT_SIZE) as _);
        let compute_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Compute Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(
                                std::mem::size_of::<SimUniform>() as _,
                            ),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: agents_size,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: agents_size,
                        },
                        count: None,
                    },
                ],
            });

        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Compute Pipeline Layout"),
                bind_group_layouts: &[&compute_bind_group_layout],
                push_constant_ranges: &[],
            });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Compute Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &compute_module,
            entry_point: "main",
        });

        // both buffers start from the same seeded frame
        let mut agent_buffers = Vec::<wgpu::Buffer>::new();
        let mut agent_bind_groups = Vec::<wgpu::BindGroup>::new();
        for i in 0..2 {
            agent_buffers.push(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Agent Buffer {}", i)),
                contents: bytemuck::cast_slice::<AgentRecord, u8>(initial_agents.records()),
                usage: wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            }));
        }

        // bind group i reads buffer i and writes buffer i + 1
        for i in 0..2 {
            agent_bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Agent Bind Group {}", i)),
                layout: &compute_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: sim_params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: agent_buffers[i].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: agent_buffers[(i + 1) % 2].as_entire_binding(),
                    },
                ],
            }));
        }

        let work_group_count =
            ((config.agent_count as f32) / (AGENTS_PER_GROUP as f32)).ceil() as u32;

        log::info!(
            "compute simulator ready: {} agents in {} work groups",
            config.agent_count,
            work_group_count
        );

        Ok(Self {
            params: config.params,
            agent_count: config.agent_count,
            agent_bind_groups,
            agent_buffers,
            compute_pipeline,
            work_group_count,
            step_num: 0,
        })
    }

    fn encode(
        &mut self,
        _device: &wgpu::Device,
        _queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<u64, BoidsError> {
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Boids Update Pass"),
        });
        cpass.set_pipeline(&self.compute_pipeline);
        cpass.set_bind_group(0, &self.agent_bind_groups[(self.step_num % 2) as usize], &[]);
        cpass.dispatch(self.work_group_count, 1, 1);
        self.step_num += 1;
        Ok(self.step_num)
    }

    fn load(&mut self, queue: &wgpu::Queue, records: &[AgentRecord]) -> Result<u64, BoidsError> {
        if records.len() != self.agent_count as usize {
            return Err(BoidsError::FrameSizeMismatch {
                expected: self.agent_count as usize,
                got: records.len(),
            });
        }
        // the new destination is the source of the next dispatch
        self.step_num += 1;
        queue.write_buffer(
            self.dest_agent_buffer(),
            0,
            bytemuck::cast_slice::<AgentRecord, u8>(records),
        );
        Ok(self.step_num)
    }

    fn dest_agent_buffer(&self) -> &wgpu::Buffer {
        &self.agent_buffers[(self.step_num % 2) as usize]
    }

    fn frame(&self) -> u64 {
        self.step_num
    }

    fn agent_count(&self) -> u32 {
        self.agent_count
    }

    fn params(&self) -> FlockingParams {
        self.params
    }
}
