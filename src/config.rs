use crate::{error::BoidsError, flocking::FlockingParams, inits::SeedRanges};

/// Agent counts the demos ship with.
pub const PRESET_AGENT_COUNTS: [u32; 4] = [50, 500, 5000, 20000];

/// Everything fixed at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub agent_count: u32,
    pub params: FlockingParams,
    pub seed: SeedRanges,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            agent_count: 20000,
            params: FlockingParams::default(),
            seed: SeedRanges::default(),
        }
    }
}

impl SimConfig {
    pub fn with_agents(agent_count: u32) -> Self {
        SimConfig {
            agent_count,
            ..Self::default()
        }
    }

    /// Small flock with randomly sized triangles.
    pub fn tutorial() -> Self {
        SimConfig {
            agent_count: 50,
            params: FlockingParams::default(),
            seed: SeedRanges::tutorial(),
        }
    }

    /// Reads an optional agent count from the first CLI argument.
    pub fn from_args<I>(mut args: I) -> anyhow::Result<Self>
    where
        I: Iterator<Item = String>,
    {
        use anyhow::Context;

        let config = match args.nth(1) {
            Some(arg) => Self::with_agents(
                arg.parse()
                    .with_context(|| format!("agent count must be an integer, got {:?}", arg))?,
            ),
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BoidsError> {
        if self.agent_count == 0 {
            return Err(BoidsError::config("agent count must be at least 1"));
        }
        self.params.validate()?;
        self.seed.validate()
    }
}
