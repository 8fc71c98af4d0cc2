//! The GPU kernel against the host update rule. Needs an adapter; without
//! one each test returns early.

use rand::{rngs::StdRng, SeedableRng};
use wgpu_boids::{
    flocking,
    inits::{SeedRanges, SeedRule},
    runners::OfflineHeadless,
    sims::{ComputeSim, HostSim, Simulator},
    AgentPool, AgentRecord, FlockingParams, SimConfig,
};

const AGENTS: usize = 200;
const TOLERANCE: f32 = 1e-6;

fn config() -> SimConfig {
    SimConfig {
        agent_count: AGENTS as u32,
        // exact in f32, so the edge agents land on +-1.0 exactly
        params: FlockingParams {
            delta_t: 0.5,
            ..FlockingParams::default()
        },
        ..SimConfig::default()
    }
}

/// Random flock inside +-0.8 plus two lone agents near the top and bottom
/// edges that reach x = -1.0 and x = 1.0 after one step.
fn agents() -> Vec<AgentRecord> {
    let ranges = SeedRanges {
        position: 0.8,
        ..SeedRanges::default()
    };
    let mut rng = StdRng::seed_from_u64(11);
    let mut records: Vec<AgentRecord> = (0..AGENTS).map(|_| ranges.seed(&mut rng)).collect();
    records[0] = AgentRecord::new([-0.75, 0.95], [-0.5, 0.0], [0.005, 0.05]);
    records[1] = AgentRecord::new([0.75, -0.95], [0.5, 0.0], [0.005, 0.05]);
    records
}

fn runner<T: Simulator>() -> Option<OfflineHeadless<T>> {
    match pollster::block_on(OfflineHeadless::<T>::new(&config())) {
        Ok(runner) => Some(runner),
        Err(e) => {
            eprintln!("no adapter, skipping: {:?}", e);
            None
        }
    }
}

fn assert_close(expected: &[AgentRecord], got: &[AgentRecord]) {
    assert_eq!(expected.len(), got.len());
    for (i, (e, g)) in expected.iter().zip(got).enumerate() {
        for (a, b) in e.encode().iter().zip(g.encode().iter()) {
            assert!((a - b).abs() <= TOLERANCE, "agent {}: {:?} vs {:?}", i, e, g);
        }
    }
}

fn check_steps<T: Simulator>(runner: &mut OfflineHeadless<T>, steps: u64) {
    let params = runner.sim().params();
    for _ in 0..steps {
        let before = runner.read_agents().unwrap();
        let frame = runner.step().unwrap();
        let after = runner.read_agents().unwrap();

        let pool = AgentPool::from_records(before).unwrap();
        let expected = flocking::update_all(&pool.snapshot(), &params);
        assert_close(expected.records(), &after);
        assert_eq!(runner.sim().frame(), frame);
    }
}

#[test]
fn compute_kernel_matches_host_rule() {
    let mut runner = match runner::<ComputeSim>() {
        Some(runner) => runner,
        None => return,
    };
    let seeded = agents();
    assert_eq!(runner.load_agents(&seeded).unwrap(), 1);
    assert_eq!(runner.read_agents().unwrap(), seeded);

    // odd step count covers both bind groups of the ping-pong pair
    check_steps(&mut runner, 3);
}

#[test]
fn compute_kernel_wraps_asymmetrically() {
    let mut runner = match runner::<ComputeSim>() {
        Some(runner) => runner,
        None => return,
    };
    runner.load_agents(&agents()).unwrap();
    runner.step().unwrap();
    let after = runner.read_agents().unwrap();

    // lone agents keep their velocity exactly
    assert_eq!(after[0].velocity, [-0.5, 0.0]);
    assert_eq!(after[1].velocity, [0.5, 0.0]);
    // -1.0 wraps to 1.0, 1.0 stays
    assert_eq!(after[0].position, [1.0, 0.95]);
    assert_eq!(after[1].position, [1.0, -0.95]);
}

#[test]
fn host_sim_uploads_what_it_commits() {
    let mut runner = match runner::<HostSim>() {
        Some(runner) => runner,
        None => return,
    };
    let seeded = agents();
    runner.load_agents(&seeded).unwrap();
    assert_eq!(runner.read_agents().unwrap(), seeded);

    check_steps(&mut runner, 2);
    let committed: Vec<AgentRecord> = runner.sim().pool().iter().collect();
    assert_eq!(runner.read_agents().unwrap(), committed);
}

#[test]
fn load_rejects_wrong_length() {
    let mut runner = match runner::<ComputeSim>() {
        Some(runner) => runner,
        None => return,
    };
    let short = &agents()[..AGENTS - 1];
    assert!(runner.load_agents(short).is_err());
    assert_eq!(runner.sim().frame(), 0);
}
