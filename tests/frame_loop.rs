use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use rand::{rngs::StdRng, SeedableRng};
use wgpu_boids::{
    flocking,
    inits::SeedRanges,
    scheduler::{FrameScheduler, Phase, RenderSurface, SubmissionChannel, TickOutcome},
    AgentPool, AgentRecord, BoidsError, FlockingParams, Snapshot,
};

/// Host-only target: updates through the pool, "draws" by keeping the
/// snapshot it would have rendered.
struct HostTarget {
    pool: Arc<AgentPool>,
    params: FlockingParams,
    width: u32,
    height: u32,
    drawn: Vec<(Snapshot, f32)>,
    lose_device_at: Option<u64>,
}

impl HostTarget {
    fn new(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let pool = AgentPool::initialize(count, &SeedRanges::default(), &mut rng).unwrap();
        HostTarget {
            pool: Arc::new(pool),
            params: FlockingParams::default(),
            width: 1600,
            height: 900,
            drawn: Vec::new(),
            lose_device_at: None,
        }
    }
}

impl RenderSurface for HostTarget {
    type Target = AgentPool;

    fn draw_target(&self) -> &AgentPool {
        &self.pool
    }

    fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl SubmissionChannel for HostTarget {
    fn submit_update(&mut self) -> Result<u64, BoidsError> {
        if self.lose_device_at == Some(self.pool.frame()) {
            return Err(BoidsError::DeviceLost("test".into()));
        }
        flocking::step(&self.pool, &self.params)
    }

    fn submit_draw(&mut self, frame: u64, aspect: f32) -> Result<(), BoidsError> {
        let snapshot = self.pool.snapshot();
        assert_eq!(snapshot.frame(), frame);
        self.drawn.push((snapshot, aspect));
        Ok(())
    }
}

fn ticks(start: Instant) -> impl Iterator<Item = Instant> {
    (0..).map(move |i| start + Duration::from_millis(16 * i))
}

#[test]
fn each_draw_sees_the_frame_just_committed() {
    let mut target = HostTarget::new(128, 1);
    let mut scheduler = FrameScheduler::new();

    for now in ticks(Instant::now()).take(20) {
        let outcome = scheduler.tick(&mut target, now);
        assert!(matches!(outcome, TickOutcome::Drawn { .. }));
        assert_eq!(scheduler.phase(), Phase::Idle);
    }

    assert_eq!(target.drawn.len(), 20);
    assert_eq!(target.draw_target().frame(), 20);
    for (i, (snapshot, aspect)) in target.drawn.iter().enumerate() {
        assert_eq!(snapshot.frame(), i as u64 + 1);
        assert_eq!(*aspect, 1600.0 / 900.0);
    }
    // every drawn frame is exactly the update of the one before it
    for pair in target.drawn.windows(2) {
        let expected = flocking::update_all(&pair[0].0, &target.params);
        assert_eq!(expected.records(), pair[1].0.records());
    }
}

#[test]
fn resize_to_zero_freezes_then_recovers() {
    let mut target = HostTarget::new(64, 2);
    let mut scheduler = FrameScheduler::new();
    let mut clock = ticks(Instant::now());

    scheduler.tick(&mut target, clock.next().unwrap());
    let frozen: Vec<AgentRecord> = target.pool.iter().collect();

    target.height = 0;
    for _ in 0..3 {
        let outcome = scheduler.tick(&mut target, clock.next().unwrap());
        assert!(matches!(
            outcome,
            TickOutcome::Skipped {
                reason: BoidsError::SurfaceUnavailable(_),
                ..
            }
        ));
    }
    assert_eq!(target.pool.iter().collect::<Vec<_>>(), frozen);
    assert_eq!(target.drawn.len(), 1);

    target.height = 900;
    assert_eq!(
        scheduler.tick(&mut target, clock.next().unwrap()),
        TickOutcome::Drawn { frame: 2 }
    );
    assert_eq!(scheduler.frames_skipped(), 3);
}

#[test]
fn device_loss_requests_restart_with_fresh_pool() {
    let mut target = HostTarget::new(32, 3);
    target.lose_device_at = Some(5);
    let mut scheduler = FrameScheduler::new();
    let mut clock = ticks(Instant::now());

    let mut outcome = scheduler.tick(&mut target, clock.next().unwrap());
    while outcome.wants_next_tick() {
        outcome = scheduler.tick(&mut target, clock.next().unwrap());
    }
    assert!(matches!(outcome, TickOutcome::RestartRequested(BoidsError::DeviceLost(_))));
    assert_eq!(target.drawn.len(), 5);

    let mut rebuilt = HostTarget::new(32, 4);
    scheduler.restart();
    assert_eq!(
        scheduler.tick(&mut rebuilt, clock.next().unwrap()),
        TickOutcome::Drawn { frame: 1 }
    );
}

#[test]
fn concurrent_reader_never_sees_mixed_frames() {
    let mut target = HostTarget::new(256, 5);
    target.params = FlockingParams {
        rule1_distance: 0.3,
        ..FlockingParams::default()
    };
    let pool = Arc::clone(&target.pool);
    let reader = std::thread::spawn(move || {
        let mut last = 0;
        for _ in 0..2000 {
            let snapshot = pool.snapshot();
            assert!(snapshot.frame() >= last);
            assert_eq!(snapshot.len(), 256);
            last = snapshot.frame();
        }
        last
    });

    let mut scheduler = FrameScheduler::new();
    for now in ticks(Instant::now()).take(50) {
        scheduler.tick(&mut target, now);
    }
    assert!(reader.join().unwrap() <= 50);

    // replaying from the seed reproduces the drawn frames bit for bit
    let replay = HostTarget::new(256, 5);
    for (snapshot, _) in &target.drawn {
        flocking::step(&replay.pool, &target.params).unwrap();
        assert_eq!(replay.pool.snapshot().records(), snapshot.records());
    }
}
