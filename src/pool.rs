//! Host-visible agent state with snapshot/commit double buffering.
//!
//! The update stage only ever reads a [`Snapshot`] of the last committed
//! frame and writes a separate [`NextFrame`]. [`AgentPool::commit`] swaps
//! the visible frame in one step, so a reader holding a snapshot sees
//! either the whole previous frame or the whole current one.

use std::{ops::Deref, sync::Arc};

use parking_lot::RwLock;
use rand::Rng;

use crate::{
    agent::{self, AgentRecord},
    error::BoidsError,
    inits::SeedRule,
};

struct Committed {
    frame: u64,
    records: Arc<[AgentRecord]>,
}

pub struct AgentPool {
    len: usize,
    visible: RwLock<Committed>,
}

/// Read-only view of one committed frame.
#[derive(Clone, Debug)]
pub struct Snapshot {
    frame: u64,
    records: Arc<[AgentRecord]>,
}

/// Write target of one update pass, tagged with the frame it was derived from.
#[derive(Debug)]
pub struct NextFrame {
    base: u64,
    records: Vec<AgentRecord>,
}

impl AgentPool {
    /// Seeds `count` agents with `rule`.
    pub fn initialize<S, R>(count: usize, rule: &S, rng: &mut R) -> Result<Self, BoidsError>
    where
        S: SeedRule,
        R: Rng + ?Sized,
    {
        let records: Vec<AgentRecord> = (0..count).map(|_| rule.seed(&mut *rng)).collect();
        log::debug!("seeded agent pool with {} agents", count);
        Self::from_records(records)
    }

    /// Seeds from the thread-local rng.
    pub fn initialize_random<S: SeedRule>(count: usize, rule: &S) -> Result<Self, BoidsError> {
        Self::initialize(count, rule, &mut rand::thread_rng())
    }

    pub fn from_records(records: Vec<AgentRecord>) -> Result<Self, BoidsError> {
        if records.is_empty() {
            return Err(BoidsError::config("agent pool needs at least one agent"));
        }
        Ok(AgentPool {
            len: records.len(),
            visible: RwLock::new(Committed {
                frame: 0,
                records: records.into(),
            }),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of the visible frame; 0 right after seeding.
    pub fn frame(&self) -> u64 {
        self.visible.read().frame
    }

    pub fn snapshot(&self) -> Snapshot {
        let visible = self.visible.read();
        Snapshot {
            frame: visible.frame,
            records: Arc::clone(&visible.records),
        }
    }

    /// Makes `next` the visible frame and returns its index.
    ///
    /// `next` must hold exactly one record per agent and must have been
    /// derived from the frame that is visible right now.
    pub fn commit(&self, next: NextFrame) -> Result<u64, BoidsError> {
        if next.records.len() != self.len {
            return Err(BoidsError::FrameSizeMismatch {
                expected: self.len,
                got: next.records.len(),
            });
        }
        let mut visible = self.visible.write();
        if next.base != visible.frame {
            return Err(BoidsError::StaleFrame {
                base: next.base,
                current: visible.frame,
            });
        }
        visible.frame += 1;
        visible.records = next.records.into();
        Ok(visible.frame)
    }

    /// Iterates the visible frame. Every call starts over from a fresh snapshot.
    pub fn iter(&self) -> impl Iterator<Item = AgentRecord> {
        let snapshot = self.snapshot();
        (0..snapshot.len()).map(move |i| snapshot[i])
    }
}

impl Snapshot {
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn records(&self) -> &[AgentRecord] {
        &self.records
    }

    /// Flat scalar buffer, `len() * AGENT_STRIDE` long.
    pub fn scalars(&self) -> &[f32] {
        agent::as_scalars(&self.records)
    }

    /// Starts the write target for the frame after this one.
    pub fn next_frame(&self, records: Vec<AgentRecord>) -> NextFrame {
        NextFrame {
            base: self.frame,
            records,
        }
    }
}

impl Deref for Snapshot {
    type Target = [AgentRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl NextFrame {
    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn records(&self) -> &[AgentRecord] {
        &self.records
    }
}
