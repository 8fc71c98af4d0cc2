use std::{
    borrow::Cow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    agent::AgentRecord,
    config::SimConfig,
    error::BoidsError,
    scheduler::{RenderSurface, SubmissionChannel},
    sims::Simulator,
};
use anyhow::Context;
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Unit triangle pointing along +y; scaled per agent in the vertex shader.
const TRIANGLE: [f32; 6] = [-1.0, -1.0, 1.0, -1.0, 0.0, 1.0];

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    aspect: f32,
    _pad: [f32; 3],
}

impl DrawUniform {
    fn new(aspect: f32) -> Self {
        Self {
            aspect,
            _pad: [0.0; 3],
        }
    }
}

/// Window surface plus the draw stage for the agents of `T`.
pub struct OnlineRenderer<T>
where
    T: Simulator,
{
    sim: T,
    surface: wgpu::Surface,
    config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub size: winit::dpi::PhysicalSize<u32>,
    vertices_buffer: wgpu::Buffer,
    render_pipeline: wgpu::RenderPipeline,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    pending: Option<wgpu::CommandEncoder>,
    device_lost: Arc<AtomicBool>,
}

impl<T> OnlineRenderer<T>
where
    T: Simulator,
{
    pub async fn new(win: &Window, sim_config: &SimConfig) -> anyhow::Result<Self> {
        let size = win.inner_size();

        let instance = wgpu::Instance::new(wgpu::Backends::all());
        let surface = unsafe { instance.create_surface(win) };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .context("Failed to get WGPU Adapter")?;
        let (device, queue) = super::get_device_and_queue(&adapter).await?;
        let device_lost = super::watch_device(&device);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface
                .get_preferred_format(&adapter)
                .context("Failed to get preferred surface format.")?,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
        };
        surface.configure(&device, &config);

        let sim = T::new(&device, sim_config)?;

        let vertices_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::bytes_of(&TRIANGLE),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let draw_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw Params Buffer"),
            contents: bytemuck::cast_slice(&[DrawUniform::new(
                config.width as f32 / config.height as f32,
            )]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let draw_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("draw_bind_group_layout"),
            });

        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &draw_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: draw_buffer.as_entire_binding(),
            }],
            label: Some("draw_bind_group"),
        });

        let render_module = device.create_shader_module(&wgpu::ShaderModuleDescriptor {
            label: Some("Render Module"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("draw.wgsl"))),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&draw_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_module,
                entry_point: "main_vs",
                buffers: &[
                    AgentRecord::desc(),
                    wgpu::VertexBufferLayout {
                        array_stride: 2 * 4,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![3 => Float32x2],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_module,
                entry_point: "main_fs",
                targets: &[wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                }],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Ok(Self {
            sim,
            surface,
            config,
            device,
            queue,
            size,
            vertices_buffer,
            render_pipeline,
            draw_buffer,
            draw_bind_group,
            pending: None,
            device_lost,
        })
    }

    pub fn sim(&self) -> &T {
        &self.sim
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn check_device(&self) -> Result<(), BoidsError> {
        if self.device_lost.load(Ordering::Acquire) {
            return Err(BoidsError::DeviceLost("device reported an uncaptured error".into()));
        }
        Ok(())
    }

    fn surface_error(&mut self, e: wgpu::SurfaceError) -> BoidsError {
        match e {
            // Reconfigure the surface if lost
            wgpu::SurfaceError::Lost => {
                self.resize(self.size);
                BoidsError::SurfaceUnavailable("surface lost, reconfigured".into())
            }
            wgpu::SurfaceError::OutOfMemory => BoidsError::DeviceLost("out of memory".into()),
            // Outdated and Timeout should be resolved by the next frame
            e => BoidsError::SurfaceUnavailable(format!("{:?}", e)),
        }
    }
}

impl<T> RenderSurface for OnlineRenderer<T>
where
    T: Simulator,
{
    type Target = wgpu::Surface;

    fn draw_target(&self) -> &wgpu::Surface {
        &self.surface
    }

    fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    fn is_ready(&self) -> bool {
        self.size.width > 0 && self.size.height > 0
    }
}

impl<T> SubmissionChannel for OnlineRenderer<T>
where
    T: Simulator,
{
    fn submit_update(&mut self) -> Result<u64, BoidsError> {
        self.check_device()?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        encoder.push_debug_group("update boids");
        let frame = self.sim.encode(&self.device, &self.queue, &mut encoder)?;
        encoder.pop_debug_group();
        self.pending = Some(encoder);
        Ok(frame)
    }

    fn submit_draw(&mut self, frame: u64, aspect: f32) -> Result<(), BoidsError> {
        let mut encoder = match self.pending.take() {
            Some(encoder) => encoder,
            None => self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                }),
        };
        debug_assert_eq!(frame, self.sim.frame());

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                // the update is recorded already; submit it so the pool keeps its frame
                self.queue.submit(Some(encoder.finish()));
                return Err(self.surface_error(e));
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.queue.write_buffer(
            &self.draw_buffer,
            0,
            bytemuck::cast_slice(&[DrawUniform::new(aspect)]),
        );

        let color_attachements = [wgpu::RenderPassColorAttachment {
            view: &view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: 0.3,
                    g: 0.3,
                    b: 0.3,
                    a: 1.0,
                }),
                store: true,
            },
        }];
        let render_pass_descriptor = wgpu::RenderPassDescriptor {
            label: Some("Boids Draw Pass"),
            color_attachments: &color_attachements,
            depth_stencil_attachment: None,
        };
        encoder.push_debug_group("draw boids");
        {
            let mut rpass = encoder.begin_render_pass(&render_pass_descriptor);
            rpass.set_pipeline(&self.render_pipeline);
            rpass.set_bind_group(0, &self.draw_bind_group, &[]);
            rpass.set_vertex_buffer(0, self.sim.dest_agent_buffer().slice(..));
            rpass.set_vertex_buffer(1, self.vertices_buffer.slice(..));
            rpass.draw(0..3, 0..self.sim.agent_count());
        }
        encoder.pop_debug_group();

        self.queue.submit(Some(encoder.finish()));
        output.present();
        log::debug!("presented frame {}", frame);

        self.check_device()
    }
}
