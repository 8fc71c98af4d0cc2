use rand::{distributions::Uniform, prelude::Distribution, Rng};

use crate::{agent::AgentRecord, error::BoidsError};

/// How each agent's footprint is chosen.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ScaleRule {
    Fixed(f32),
    /// Uniform in `[min, max)`.
    Range(f32, f32),
}

/// Generates the initial state of one agent.
pub trait SeedRule {
    fn seed<R: Rng + ?Sized>(&self, rng: &mut R) -> AgentRecord;
}

/// Uniform seeding inside named bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedRanges {
    /// Both position components are drawn from `[-position, position)`.
    pub position: f32,
    /// Both velocity components are drawn from `[-velocity, velocity)`.
    pub velocity: f32,
    pub scale: ScaleRule,
    /// Divides the x footprint so triangles come out narrow.
    pub aspect_divisor: f32,
}

impl Default for SeedRanges {
    fn default() -> Self {
        SeedRanges {
            position: 0.9,
            velocity: 0.01,
            scale: ScaleRule::Fixed(0.05),
            aspect_divisor: 10.0,
        }
    }
}

impl SeedRanges {
    /// Variant with a random footprint per agent and no x squash.
    pub fn tutorial() -> Self {
        SeedRanges {
            scale: ScaleRule::Range(0.1, 0.2),
            aspect_divisor: 1.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), BoidsError> {
        if !(self.position.is_finite() && self.position > 0.0) {
            return Err(BoidsError::config(format!(
                "position bound must be positive, got {}",
                self.position
            )));
        }
        if !(self.velocity.is_finite() && self.velocity >= 0.0) {
            return Err(BoidsError::config(format!(
                "velocity bound must be non-negative, got {}",
                self.velocity
            )));
        }
        match self.scale {
            ScaleRule::Fixed(s) if !(s.is_finite() && s > 0.0) => {
                return Err(BoidsError::config(format!("scale must be positive, got {}", s)));
            }
            ScaleRule::Range(min, max)
                if !(min.is_finite() && max.is_finite() && 0.0 < min && min < max) =>
            {
                return Err(BoidsError::config(format!(
                    "scale range must satisfy 0 < min < max, got {}..{}",
                    min, max
                )));
            }
            _ => {}
        }
        if !(self.aspect_divisor.is_finite() && self.aspect_divisor > 0.0) {
            return Err(BoidsError::config(format!(
                "aspect divisor must be positive, got {}",
                self.aspect_divisor
            )));
        }
        Ok(())
    }

    pub fn contains(&self, record: &AgentRecord) -> bool {
        let within = |v: f32, bound: f32| -bound <= v && v <= bound;
        let base = record.scale[1];
        let scale_ok = match self.scale {
            ScaleRule::Fixed(s) => base == s,
            ScaleRule::Range(min, max) => min <= base && base <= max,
        } && record.scale[0] == base / self.aspect_divisor;
        record.position.iter().all(|&p| within(p, self.position))
            && record.velocity.iter().all(|&v| within(v, self.velocity))
            && scale_ok
    }
}

fn symmetric(bound: f32) -> Uniform<f32> {
    if bound > 0.0 {
        Uniform::new(-bound, bound)
    } else {
        Uniform::new_inclusive(0.0, 0.0)
    }
}

impl SeedRule for SeedRanges {
    fn seed<R: Rng + ?Sized>(&self, rng: &mut R) -> AgentRecord {
        let pos_unif = symmetric(self.position);
        let vel_unif = symmetric(self.velocity);
        let base = match self.scale {
            ScaleRule::Fixed(s) => s,
            ScaleRule::Range(min, max) if min < max => rng.gen_range(min..max),
            ScaleRule::Range(min, _) => min,
        };
        AgentRecord {
            position: [pos_unif.sample(rng), pos_unif.sample(rng)],
            velocity: [vel_unif.sample(rng), vel_unif.sample(rng)],
            scale: [base / self.aspect_divisor, base],
        }
    }
}

impl<F> SeedRule for F
where
    F: Fn(&mut dyn rand::RngCore) -> AgentRecord,
{
    fn seed<R: Rng + ?Sized>(&self, mut rng: &mut R) -> AgentRecord {
        let rng: &mut dyn rand::RngCore = &mut rng;
        self(rng)
    }
}
