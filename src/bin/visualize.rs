use std::time::Instant;

use anyhow::Context;
use wgpu_boids::{
    runners::OnlineRenderer,
    scheduler::{FrameScheduler, TickOutcome},
    sims::{ComputeSim, HostSim, Simulator},
    SimConfig,
};

use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

const TITLE_EVERY: u64 = 30;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let sim_config = SimConfig::from_args(std::env::args())?;
    // second argument picks where the update stage runs
    match std::env::args().nth(2).as_deref() {
        None | Some("gpu") => run::<ComputeSim>(sim_config),
        Some("host") => run::<HostSim>(sim_config),
        Some(other) => anyhow::bail!("unknown backend {:?}, expected gpu or host", other),
    }
}

fn run<T>(sim_config: SimConfig) -> anyhow::Result<()>
where
    T: Simulator + 'static,
{
    log::info!("starting with {} agents", sim_config.agent_count);

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("boids")
        .with_inner_size(LogicalSize::new(800, 600))
        .build(&event_loop)
        .context("Failed to create window")?;
    let mut should_render = true;
    window.focus_window();

    let mut state = pollster::block_on(OnlineRenderer::<T>::new(&window, &sim_config))?;
    let mut scheduler = FrameScheduler::new();

    event_loop.run(move |event, _, control_flow| match event {
        Event::RedrawRequested(window_id) if window_id == window.id() => {
            match scheduler.tick(&mut state, Instant::now()) {
                TickOutcome::Drawn { frame } if frame % TITLE_EVERY == 0 => {
                    window.set_title(&format!("boids - {} fps", scheduler.timer().fps_label()));
                }
                TickOutcome::RestartRequested(e) => {
                    log::warn!("rebuilding renderer after: {}", e);
                    // a fresh pool is seeded on rebuild
                    match pollster::block_on(OnlineRenderer::<T>::new(&window, &sim_config)) {
                        Ok(rebuilt) => {
                            state = rebuilt;
                            scheduler.restart();
                        }
                        Err(e) => {
                            log::error!("failed to rebuild renderer: {:?}", e);
                            *control_flow = ControlFlow::Exit;
                        }
                    }
                }
                _ => {}
            }
        }
        Event::MainEventsCleared => {
            // RedrawRequested will only trigger once, unless we manually
            // request it.
            if should_render && !scheduler.is_halted() {
                window.request_redraw();
            }
        }
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == window.id() => match event {
            WindowEvent::Focused(focus) => {
                should_render = *focus;
                *control_flow = match should_render {
                    true => ControlFlow::Poll,
                    false => ControlFlow::Wait,
                };
            }
            WindowEvent::Resized(new_size) => {
                state.resize(*new_size);
            }
            WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                state.resize(**new_inner_size);
            }
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state: ElementState::Pressed,
                        virtual_keycode: Some(VirtualKeyCode::Escape),
                        ..
                    },
                ..
            } => *control_flow = ControlFlow::Exit,
            _ => {}
        },
        _ => {}
    });
}
