//! The flocking update rule.
//!
//! Every agent's next state is a pure function of the frame snapshot, so
//! the per-agent updates are independent and run as a parallel map over
//! agent indices. The WGSL kernel in `sims/shaders/boids.wgsl` is the GPU
//! twin of [`update_agent`] and must stay in step with it.

use glam::Vec2;
use rayon::prelude::*;

use crate::{
    agent::AgentRecord,
    error::BoidsError,
    pool::{AgentPool, NextFrame, Snapshot},
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FlockingParams {
    pub delta_t: f32,
    /// Cohesion radius.
    pub rule1_distance: f32,
    /// Separation radius.
    pub rule2_distance: f32,
    /// Alignment radius.
    pub rule3_distance: f32,
    pub rule1_scale: f32,
    pub rule2_scale: f32,
    pub rule3_scale: f32,
}

impl Default for FlockingParams {
    fn default() -> Self {
        FlockingParams {
            delta_t: 0.04,
            rule1_distance: 0.1,
            rule2_distance: 0.025,
            rule3_distance: 0.025,
            rule1_scale: 0.02,
            rule2_scale: 0.05,
            rule3_scale: 0.005,
        }
    }
}

impl FlockingParams {
    pub fn validate(&self) -> Result<(), BoidsError> {
        if !(self.delta_t.is_finite() && self.delta_t > 0.0) {
            return Err(BoidsError::config(format!(
                "delta_t must be positive, got {}",
                self.delta_t
            )));
        }
        let distances = [
            ("rule1_distance", self.rule1_distance),
            ("rule2_distance", self.rule2_distance),
            ("rule3_distance", self.rule3_distance),
        ];
        for (name, d) in distances {
            if !(d.is_finite() && d >= 0.0) {
                return Err(BoidsError::config(format!(
                    "{} must be a non-negative distance, got {}",
                    name, d
                )));
            }
        }
        let scales = [
            ("rule1_scale", self.rule1_scale),
            ("rule2_scale", self.rule2_scale),
            ("rule3_scale", self.rule3_scale),
        ];
        for (name, s) in scales {
            if !s.is_finite() {
                return Err(BoidsError::config(format!("{} must be finite, got {}", name, s)));
            }
        }
        Ok(())
    }
}

/// Toroidal wrap of one coordinate. `-1.0` itself wraps, `1.0` does not.
#[inline]
pub fn wrap(v: f32) -> f32 {
    if v <= -1.0 {
        1.0
    } else if v > 1.0 {
        -1.0
    } else {
        v
    }
}

/// Next state of `agents[index]`, computed only from `agents`.
pub fn update_agent(agents: &[AgentRecord], index: usize, params: &FlockingParams) -> AgentRecord {
    let me = agents[index];
    let pos = Vec2::from(me.position);
    let mut vel = Vec2::from(me.velocity);

    let mut c_mass = Vec2::ZERO;
    let mut c_mass_count = 0u32;
    let mut col_vel = Vec2::ZERO;
    let mut c_vel = Vec2::ZERO;
    let mut c_vel_count = 0u32;

    for (i, other) in agents.iter().enumerate() {
        if i == index {
            continue;
        }
        let other_pos = Vec2::from(other.position);
        let dist = other_pos.distance(pos);
        if dist < params.rule1_distance {
            c_mass += other_pos;
            c_mass_count += 1;
        }
        if dist < params.rule2_distance {
            col_vel -= other_pos - pos;
        }
        if dist < params.rule3_distance {
            c_vel += Vec2::from(other.velocity);
            c_vel_count += 1;
        }
    }
    // empty neighbourhoods contribute nothing
    if c_mass_count > 0 {
        c_mass = c_mass / c_mass_count as f32 - pos;
    }
    if c_vel_count > 0 {
        c_vel /= c_vel_count as f32;
    }

    vel += c_mass * params.rule1_scale + col_vel * params.rule2_scale + c_vel * params.rule3_scale;
    let next = pos + vel * params.delta_t;

    AgentRecord {
        position: [wrap(next.x), wrap(next.y)],
        velocity: vel.to_array(),
        scale: me.scale,
    }
}

/// Runs the update stage over every agent of `snapshot`.
pub fn update_all(snapshot: &Snapshot, params: &FlockingParams) -> NextFrame {
    let agents = snapshot.records();
    let next = (0..agents.len())
        .into_par_iter()
        .map(|i| update_agent(agents, i, params))
        .collect();
    snapshot.next_frame(next)
}

/// Snapshot, update, commit. Returns the index of the committed frame.
pub fn step(pool: &AgentPool, params: &FlockingParams) -> Result<u64, BoidsError> {
    let snapshot = pool.snapshot();
    pool.commit(update_all(&snapshot, params))
}
