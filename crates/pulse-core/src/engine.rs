//! Render loop orchestrator.
//!
//! [`Visualizer`] owns the transport clock, the trace pool and the scene, and
//! runs the per-frame pipeline: clock advance, event lookup, trace spawn and
//! update, field compute, apply, submit. The host drives it by calling
//! [`Visualizer::tick`] whenever its frame primitive fires.

use crate::clock::{Resync, TransportClock};
use crate::constants::*;
use crate::error::{StartError, SurfaceError};
use crate::events::ActiveEvents;
use crate::feed::{FeatureState, FeedCell, FeedUpdate};
use crate::field::{self, Orbit, ParticleSeed};
use crate::scene::SceneState;
use crate::state::{Camera, Viewport};
use crate::traces::TracePool;
use glam::Vec3;
use rand::prelude::*;
use std::sync::Arc;

/// Presents finished scenes. Implemented by the GPU front-end and by test
/// doubles.
pub trait RenderSurface {
    fn create_surface(&mut self, size: Viewport) -> Result<(), SurfaceError>;
    fn resize(&mut self, size: Viewport) -> Result<(), SurfaceError>;
    fn submit(&mut self, scene: &SceneState) -> Result<(), SurfaceError>;
    fn destroy_surface(&mut self);
}

/// The host's next-frame primitive.
pub trait FrameScheduler {
    fn request_tick(&mut self);
    fn cancel_tick(&mut self);
}

/// A running feed poll that must be stopped on teardown.
pub trait PollHandle {
    fn cancel(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing was computed.
    Idle,
    Rendered,
    /// The frame was discarded or could not be presented; the previous
    /// scene is still current.
    Held,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub particle_count: usize,
    pub trace_capacity: usize,
    pub resync_tolerance_sec: f64,
    pub seed: u64,
    pub camera_distance: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            particle_count: PARTICLE_COUNT,
            trace_capacity: TRACE_CAPACITY,
            resync_tolerance_sec: RESYNC_TOLERANCE_SEC,
            seed: 0x5EED_F1E1D,
            camera_distance: CAMERA_DISTANCE,
        }
    }
}

pub struct Visualizer<S: RenderSurface, F: FrameScheduler, R: Rng = StdRng> {
    config: EngineConfig,
    state: LoopState,
    surface: S,
    scheduler: F,
    poll: Option<Box<dyn PollHandle>>,
    feed: Arc<FeedCell>,
    applied: Option<Arc<FeedUpdate>>,
    now_playing: Option<String>,
    playing: bool,
    features: FeatureState,
    clock: TransportClock,
    traces: TracePool,
    rng: R,
    seeds: Vec<ParticleSeed>,
    scene: Option<SceneState>,
    orbit: Orbit,
    last_wall: Option<f64>,
    frames: u64,
}

impl<S: RenderSurface, F: FrameScheduler> Visualizer<S, F, StdRng> {
    pub fn new(config: EngineConfig, surface: S, scheduler: F, feed: Arc<FeedCell>) -> Self {
        // Offset so trace draws do not mirror the particle layout stream.
        let rng = StdRng::seed_from_u64(config.seed ^ 0x9E37_79B9_7F4A_7C15);
        Self::with_rng(config, surface, scheduler, feed, rng)
    }
}

impl<S: RenderSurface, F: FrameScheduler, R: Rng> Visualizer<S, F, R> {
    /// Like [`Visualizer::new`] but with an explicit source for trace draws.
    pub fn with_rng(
        config: EngineConfig,
        surface: S,
        scheduler: F,
        feed: Arc<FeedCell>,
        rng: R,
    ) -> Self {
        Self {
            clock: TransportClock::new(config.resync_tolerance_sec),
            traces: TracePool::new(0),
            config,
            state: LoopState::Uninitialized,
            surface,
            scheduler,
            poll: None,
            feed,
            applied: None,
            now_playing: None,
            playing: false,
            features: FeatureState::default(),
            rng,
            seeds: Vec::new(),
            scene: None,
            orbit: Orbit::default(),
            last_wall: None,
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Track id of the sample currently driving the scene.
    pub fn now_playing(&self) -> Option<&str> {
        self.now_playing.as_deref()
    }

    pub fn features(&self) -> &FeatureState {
        &self.features
    }

    pub fn clock(&self) -> &TransportClock {
        &self.clock
    }

    pub fn traces(&self) -> &TracePool {
        &self.traces
    }

    /// The last applied frame. `None` until started and after teardown.
    pub fn scene(&self) -> Option<&SceneState> {
        self.scene.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Register the feed poll so teardown can cancel it.
    pub fn attach_poll(&mut self, mut handle: Box<dyn PollHandle>) {
        if self.state == LoopState::Stopped {
            handle.cancel();
            return;
        }
        if let Some(mut old) = self.poll.replace(handle) {
            old.cancel();
        }
    }

    /// Acquire the surface, then allocate every persistent buffer.
    ///
    /// On failure nothing is allocated and the state stays `Uninitialized`.
    pub fn start(&mut self, size: Viewport) -> Result<(), StartError> {
        match self.state {
            LoopState::Running => return Ok(()),
            LoopState::Stopped => return Err(StartError::TornDown),
            LoopState::Uninitialized => {}
        }
        if let Err(e) = self.surface.create_surface(size) {
            log::error!("[engine] surface unavailable: {}", e);
            return Err(e.into());
        }

        let mut layout_rng = StdRng::seed_from_u64(self.config.seed);
        self.seeds = field::seed_particles(self.config.particle_count, &mut layout_rng);
        self.traces = TracePool::new(self.config.trace_capacity);
        let mut scene = SceneState::new(
            self.config.particle_count,
            self.config.trace_capacity,
            size,
        );
        scene.camera.eye = Vec3::new(0.0, 0.0, self.config.camera_distance);
        self.scene = Some(scene);
        self.orbit = Orbit::default();
        self.last_wall = None;
        self.state = LoopState::Running;
        log::info!(
            "[engine] started {}x{} with {} particles, {} trace slots",
            size.width,
            size.height,
            self.config.particle_count,
            self.config.trace_capacity
        );
        self.scheduler.request_tick();
        Ok(())
    }

    /// Run one frame at wall time `now` (seconds).
    pub fn tick(&mut self, now: f64) -> TickOutcome {
        if self.state != LoopState::Running {
            return TickOutcome::Idle;
        }
        let outcome = self.frame(now);
        if self.state == LoopState::Running {
            self.scheduler.request_tick();
        }
        outcome
    }

    fn frame(&mut self, now: f64) -> TickOutcome {
        let dt = self.last_wall.map_or(0.0, |w| now - w) as f32;
        self.last_wall = Some(now);
        self.sync_feed(now);

        let t = self.clock.advance(now);
        let events = match self.applied.as_deref() {
            Some(FeedUpdate::Sample(sample)) if self.playing => ActiveEvents::lookup(sample, t),
            _ => ActiveEvents::default(),
        };

        if self.playing {
            let batch =
                self.traces
                    .try_spawn(&self.features, events.beat.as_ref(), t, &mut self.rng);
            if !batch.is_empty() {
                log::debug!("[traces] spawned {} at {:.3}", batch.len(), t);
            }
        }
        self.traces.update(t);

        let features = if self.playing {
            self.features
        } else {
            self.features.resting()
        };
        let params = field::compute(&features, t as f32);
        let mut orbit = self.orbit;
        orbit.step(params.orbit_speed, dt);
        let camera = Camera {
            eye: orbit.eye(self.config.camera_distance, params.bob),
            ..Camera::default()
        };
        if !t.is_finite() || !params.is_finite() || !camera.eye.is_finite() {
            log::warn!("[engine] non-finite frame at t={}, holding previous scene", t);
            return TickOutcome::Held;
        }
        self.orbit = orbit;

        let Some(scene) = self.scene.as_mut() else {
            return TickOutcome::Idle;
        };
        scene.apply(
            t,
            &features,
            events,
            &params,
            camera,
            &self.seeds,
            self.traces.live(),
        );
        self.frames += 1;

        match self.surface.submit(scene) {
            Ok(()) => TickOutcome::Rendered,
            Err(SurfaceError::Lost) => {
                log::warn!("[engine] surface lost, reconfiguring");
                if let Err(e) = self.surface.resize(scene.viewport) {
                    log::error!("[engine] reconfigure failed: {}", e);
                }
                TickOutcome::Held
            }
            Err(e) => {
                log::error!("[engine] {}", e);
                TickOutcome::Held
            }
        }
    }

    /// Apply the newest feed update if it differs from the one in use.
    fn sync_feed(&mut self, now: f64) {
        let Some(latest) = self.feed.latest() else {
            return;
        };
        if self
            .applied
            .as_ref()
            .map_or(false, |cur| Arc::ptr_eq(cur, &latest))
        {
            return;
        }
        match latest.as_ref() {
            FeedUpdate::Sample(sample) => {
                let track_changed = self.now_playing.as_deref() != Some(sample.track_id.as_str());
                let resync = self.clock.observe(now, sample.track_time(), track_changed);
                if resync == Resync::Reanchored {
                    self.traces.clear();
                }
                if track_changed {
                    log::info!("[engine] now playing {}", sample.track_id);
                    self.now_playing = Some(sample.track_id.clone());
                }
                log::debug!(
                    "[engine] sample {} at {:.3}s: {:?}",
                    sample.track_id,
                    sample.track_time(),
                    resync
                );
                self.features = sample.features;
                self.playing = true;
            }
            FeedUpdate::NoTrack => {
                if self.playing {
                    log::info!("[engine] playback stopped, holding scene");
                }
                self.clock.hold(now);
                self.traces.clear();
                self.now_playing = None;
                self.playing = false;
            }
        }
        self.applied = Some(latest);
    }

    /// Recompute aspect and drawable size. A zero-sized viewport (minimized
    /// window) is ignored. A surface that cannot be reconfigured tears the
    /// visualizer down.
    pub fn resize(&mut self, size: Viewport) -> Result<(), SurfaceError> {
        if self.state != LoopState::Running || size.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.surface.resize(size) {
            log::error!("[engine] resize to {}x{} failed: {}", size.width, size.height, e);
            self.stop();
            return Err(e);
        }
        if let Some(scene) = self.scene.as_mut() {
            scene.set_viewport(size);
        }
        log::info!("[engine] resized to {}x{}", size.width, size.height);
        Ok(())
    }

    /// Cancel the pending tick and the feed poll, then release the surface.
    /// Safe to call any number of times.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        let was_running = self.state == LoopState::Running;
        self.scheduler.cancel_tick();
        if let Some(mut poll) = self.poll.take() {
            poll.cancel();
        }
        if was_running {
            self.surface.destroy_surface();
        }
        self.scene = None;
        self.seeds = Vec::new();
        self.traces = TracePool::new(0);
        self.state = LoopState::Stopped;
        log::info!("[engine] stopped after {} frames", self.frames);
    }
}

impl<S: RenderSurface, F: FrameScheduler, R: Rng> Drop for Visualizer<S, F, R> {
    fn drop(&mut self) {
        self.stop();
    }
}
