use std::time::Instant;

use anyhow::Context;
use wgpu_boids::{runners::OfflineHeadless, sims::ComputeSim, SimConfig};

const STEPS: usize = 100;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let sim_config = SimConfig::from_args(std::env::args())?;

    log::info!("initializing simulation with {} agents", sim_config.agent_count);
    let mut runner = pollster::block_on(OfflineHeadless::<ComputeSim>::new(&sim_config))?;

    log::info!("running {} steps", STEPS);
    for _ in 0..STEPS {
        let now = Instant::now();
        let frame = runner.step()?;
        log::info!("step {} took {} µs", frame, now.elapsed().as_micros());
    }

    let agents = runner.read_agents().context("Failed to read agents back")?;
    let mean_speed = agents
        .iter()
        .map(|a| glam::Vec2::from(a.velocity).length())
        .sum::<f32>()
        / agents.len() as f32;
    log::info!("finished: mean speed {:.5} over {} agents", mean_speed, agents.len());
    Ok(())
}
