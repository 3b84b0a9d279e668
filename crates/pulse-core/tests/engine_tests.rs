// Orchestrator tests against recording doubles for the surface, the frame
// scheduler and the feed poll.

use pulse_core::{
    Beat, EngineConfig, FeatureState, FeedCell, FeedSample, FrameScheduler, LoopState,
    PollHandle, RenderSurface, SceneState, StartError, SurfaceError, TickOutcome, Viewport,
    Visualizer,
};
use rand::rngs::mock::StepRng;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Default)]
struct Calls {
    created: u32,
    resized: Vec<Viewport>,
    submitted: u32,
    destroyed: u32,
    requested: u32,
    cancelled: u32,
    poll_cancelled: u32,
}

type Shared = Rc<RefCell<Calls>>;

#[derive(Default)]
struct MockSurface {
    calls: Shared,
    fail_create: bool,
    fail_resize: bool,
    lose_next: bool,
}

impl RenderSurface for MockSurface {
    fn create_surface(&mut self, _size: Viewport) -> Result<(), SurfaceError> {
        if self.fail_create {
            return Err(SurfaceError::Unavailable("no adapter".into()));
        }
        self.calls.borrow_mut().created += 1;
        Ok(())
    }

    fn resize(&mut self, size: Viewport) -> Result<(), SurfaceError> {
        if self.fail_resize {
            return Err(SurfaceError::Unavailable("gone".into()));
        }
        self.calls.borrow_mut().resized.push(size);
        Ok(())
    }

    fn submit(&mut self, scene: &SceneState) -> Result<(), SurfaceError> {
        assert!(scene.is_finite());
        if std::mem::take(&mut self.lose_next) {
            return Err(SurfaceError::Lost);
        }
        self.calls.borrow_mut().submitted += 1;
        Ok(())
    }

    fn destroy_surface(&mut self) {
        self.calls.borrow_mut().destroyed += 1;
    }
}

struct MockScheduler {
    calls: Shared,
}

impl FrameScheduler for MockScheduler {
    fn request_tick(&mut self) {
        self.calls.borrow_mut().requested += 1;
    }

    fn cancel_tick(&mut self) {
        self.calls.borrow_mut().cancelled += 1;
    }
}

struct MockPoll {
    calls: Shared,
}

impl PollHandle for MockPoll {
    fn cancel(&mut self) {
        self.calls.borrow_mut().poll_cancelled += 1;
    }
}

type TestVisualizer = Visualizer<MockSurface, MockScheduler, StepRng>;

fn config() -> EngineConfig {
    EngineConfig {
        particle_count: 256,
        ..EngineConfig::default()
    }
}

fn size() -> Viewport {
    Viewport::new(800, 600)
}

fn build(surface: MockSurface) -> (TestVisualizer, Shared, Arc<FeedCell>) {
    let calls = surface.calls.clone();
    let feed = Arc::new(FeedCell::new());
    let scheduler = MockScheduler {
        calls: calls.clone(),
    };
    let vis = Visualizer::with_rng(config(), surface, scheduler, feed.clone(), StepRng::new(0, 0));
    (vis, calls, feed)
}

fn running() -> (TestVisualizer, Shared, Arc<FeedCell>) {
    let (mut vis, calls, feed) = build(MockSurface::default());
    vis.start(size()).expect("start");
    (vis, calls, feed)
}

fn sample(track: &str, energy: f32, progress_ms: u64, beats: Vec<Beat>) -> FeedSample {
    FeedSample {
        track_id: track.to_string(),
        features: FeatureState {
            energy,
            danceability: 0.5,
            valence: 0.5,
            tempo: 120.0,
        },
        beats,
        sections: vec![],
        progress_ms,
    }
}

fn downbeat() -> Vec<Beat> {
    vec![Beat {
        start: 0.0,
        duration: 0.5,
        confidence: 1.0,
    }]
}

#[test]
fn start_allocates_and_schedules() {
    let (vis, calls, _feed) = running();
    assert_eq!(vis.state(), LoopState::Running);
    let scene = vis.scene().expect("scene");
    assert_eq!(scene.particles.len(), 256);
    assert_eq!(scene.traces.capacity(), 2000);
    assert!(scene.core_mesh.triangle_count() > 0);
    assert_eq!(vis.traces().capacity(), 2000);
    assert_eq!(calls.borrow().created, 1);
    assert_eq!(calls.borrow().requested, 1);
}

#[test]
fn failed_surface_leaves_visualizer_uninitialized() {
    let (mut vis, calls, _feed) = build(MockSurface {
        fail_create: true,
        ..MockSurface::default()
    });
    let err = vis.start(size()).expect_err("must fail");
    assert!(matches!(err, StartError::SurfaceUnavailable(_)));
    assert_eq!(vis.state(), LoopState::Uninitialized);
    assert!(vis.scene().is_none());
    assert_eq!(calls.borrow().requested, 0);
    assert_eq!(vis.tick(0.0), TickOutcome::Idle);
}

#[test]
fn tick_renders_and_requests_the_next_frame() {
    let (mut vis, calls, _feed) = running();
    assert_eq!(vis.tick(0.0), TickOutcome::Rendered);
    assert_eq!(vis.tick(0.016), TickOutcome::Rendered);
    assert_eq!(calls.borrow().submitted, 2);
    assert_eq!(calls.borrow().requested, 3);
    assert_eq!(vis.frames(), 2);
    assert!(vis.now_playing().is_none());
}

#[test]
fn full_energy_downbeat_spawns_six_traces() {
    let (mut vis, _calls, feed) = running();
    feed.publish_sample(sample("t1", 1.0, 0, downbeat()));
    assert_eq!(vis.tick(0.0), TickOutcome::Rendered);

    let scene = vis.scene().expect("scene");
    assert_eq!(scene.time, 0.0);
    assert_eq!(scene.events.beat.map(|b| b.start), Some(0.0));
    assert_eq!(vis.traces().len(), 6);
    assert_eq!(scene.traces.live_count(), 6);
    assert_eq!(scene.bloom, 2.0);
    assert_eq!(vis.now_playing(), Some("t1"));
}

#[test]
fn consistent_samples_keep_the_clock_smooth() {
    let (mut vis, _calls, feed) = running();
    feed.publish_sample(sample("t1", 0.5, 0, vec![]));
    vis.tick(0.0);
    vis.tick(1.0);
    // Reported 1.02 s against 1.05 s extrapolated: within tolerance.
    feed.publish_sample(sample("t1", 0.5, 1020, vec![]));
    vis.tick(1.05);
    let t = vis.scene().expect("scene").time;
    assert!((t - 1.05).abs() < 1e-9, "time jumped to {t}");
}

#[test]
fn track_change_reanchors_and_clears_traces() {
    let (mut vis, _calls, feed) = running();
    feed.publish_sample(sample("a", 1.0, 0, downbeat()));
    vis.tick(0.0);
    assert_eq!(vis.traces().len(), 6);

    feed.publish_sample(sample("b", 0.3, 100, vec![]));
    vis.tick(0.05);
    assert_eq!(vis.now_playing(), Some("b"));
    assert!(vis.traces().is_empty());
    assert!((vis.scene().expect("scene").time - 0.1).abs() < 1e-9);
}

#[test]
fn no_track_pauses_and_holds_the_scene() {
    let (mut vis, _calls, feed) = running();
    feed.publish_sample(sample("a", 1.0, 0, downbeat()));
    vis.tick(0.0);
    vis.tick(0.2);

    feed.publish_no_track();
    assert_eq!(vis.tick(0.3), TickOutcome::Rendered);
    assert!(vis.now_playing().is_none());
    assert!(vis.traces().is_empty());
    assert!(!vis.clock().is_running());

    let held = vis.scene().expect("scene").clone();
    assert_eq!(held.features.energy, 0.0);
    assert_eq!(held.traces.live_count(), 0);

    vis.tick(5.0);
    let later = vis.scene().expect("scene");
    assert_eq!(later.time, held.time);
    assert_eq!(later.core, held.core);
    assert!(vis.traces().is_empty());
}

#[test]
fn playback_resumes_after_no_track() {
    let (mut vis, _calls, feed) = running();
    feed.publish_no_track();
    vis.tick(0.0);
    feed.publish_sample(sample("a", 0.4, 30_000, vec![]));
    vis.tick(1.0);
    assert_eq!(vis.now_playing(), Some("a"));
    assert!((vis.scene().expect("scene").time - 30.0).abs() < 1e-9);
}

#[test]
fn non_finite_frame_is_held() {
    let (mut vis, calls, feed) = running();
    feed.publish_sample(sample("a", 0.5, 0, vec![]));
    vis.tick(0.0);
    let before = vis.scene().expect("scene").clone();

    let mut bad = sample("a", 1.0, 16, vec![]);
    bad.features.tempo = f32::INFINITY;
    feed.publish_sample(bad);
    assert_eq!(vis.tick(0.016), TickOutcome::Held);

    let after = vis.scene().expect("scene");
    assert_eq!(after.time, before.time);
    assert_eq!(after.camera, before.camera);
    assert_eq!(calls.borrow().submitted, 1);
    // The loop keeps going.
    assert_eq!(vis.state(), LoopState::Running);
}

#[test]
fn lost_surface_is_reconfigured() {
    let (mut vis, calls, _feed) = build(MockSurface {
        lose_next: true,
        ..MockSurface::default()
    });
    vis.start(size()).expect("start");
    assert_eq!(vis.tick(0.0), TickOutcome::Held);
    assert_eq!(calls.borrow().resized, vec![size()]);
    assert_eq!(vis.tick(0.016), TickOutcome::Rendered);
}

#[test]
fn resize_updates_aspect_and_ignores_zero() {
    let (mut vis, calls, _feed) = running();
    vis.resize(Viewport::new(1000, 500)).expect("resize");
    assert_eq!(vis.scene().expect("scene").camera.aspect, 2.0);
    vis.resize(Viewport::new(0, 500)).expect("ignored");
    assert_eq!(calls.borrow().resized.len(), 1);
    vis.tick(0.0);
    assert_eq!(vis.scene().expect("scene").camera.aspect, 2.0);
}

#[test]
fn failed_resize_tears_down() {
    let (mut vis, calls, _feed) = build(MockSurface {
        fail_resize: true,
        ..MockSurface::default()
    });
    vis.start(size()).expect("start");
    assert!(vis.resize(Viewport::new(640, 480)).is_err());
    assert_eq!(vis.state(), LoopState::Stopped);
    assert_eq!(calls.borrow().destroyed, 1);
}

#[test]
fn stop_is_idempotent_and_cancels_everything() {
    let (mut vis, calls, _feed) = running();
    vis.attach_poll(Box::new(MockPoll {
        calls: calls.clone(),
    }));
    vis.tick(0.0);

    vis.stop();
    vis.stop();
    {
        let c = calls.borrow();
        assert_eq!(c.cancelled, 1);
        assert_eq!(c.poll_cancelled, 1);
        assert_eq!(c.destroyed, 1);
    }
    assert_eq!(vis.state(), LoopState::Stopped);
    assert!(vis.scene().is_none());
    assert_eq!(vis.tick(1.0), TickOutcome::Idle);
    assert!(matches!(vis.start(size()), Err(StartError::TornDown)));

    drop(vis);
    assert_eq!(calls.borrow().destroyed, 1);
}

#[test]
fn poll_attached_after_stop_is_cancelled_at_once() {
    let (mut vis, calls, _feed) = running();
    vis.stop();
    vis.attach_poll(Box::new(MockPoll {
        calls: calls.clone(),
    }));
    assert_eq!(calls.borrow().poll_cancelled, 1);
}

#[test]
fn dropping_a_running_visualizer_releases_the_surface() {
    let (vis, calls, _feed) = running();
    drop(vis);
    assert_eq!(calls.borrow().destroyed, 1);
    assert_eq!(calls.borrow().cancelled, 1);
}

#[test]
fn stopping_before_start_never_touches_the_surface() {
    let (mut vis, calls, _feed) = build(MockSurface::default());
    vis.stop();
    assert_eq!(calls.borrow().destroyed, 0);
    assert_eq!(vis.state(), LoopState::Stopped);
}
