//! Light traces: short-lived arcs spawned on beats.
//!
//! [`TracePool`] owns the live set in a fixed-capacity arena; [`TraceBuffer`]
//! is the matching vertex store handed to the renderer, one line segment per
//! trace.

use crate::color::hsl_to_rgb;
use crate::constants::*;
use crate::feed::{Beat, FeatureState};
use bytemuck::Zeroable;
use glam::Vec3;
use rand::Rng;
use smallvec::SmallVec;
use std::f32::consts::{PI, TAU};

/// Traces created by one spawn attempt; at most six for in-range energy.
pub type SpawnBatch = SmallVec<[LightTrace; 8]>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightTrace {
    pub start_point: Vec3,
    pub end_point: Vec3,
    pub color: Vec3,
    pub spawn_time: f64,
    pub duration: f32,
    /// Normalized age in 0..1, refreshed by [`TracePool::update`].
    pub progress: f32,
}

impl LightTrace {
    pub fn age(&self, t: f64) -> f64 {
        t - self.spawn_time
    }

    pub fn is_live(&self, t: f64) -> bool {
        self.age(t) <= self.duration as f64
    }

    pub fn progress_at(&self, t: f64) -> f32 {
        let d = self.duration.max(TRACE_MIN_DURATION) as f64;
        (self.age(t) / d).clamp(0.0, 1.0) as f32
    }

    /// Bézier control point: the chord midpoint pushed out to the trace's
    /// shell radius and lifted further with energy.
    pub fn control_point(&self, energy: f32) -> Vec3 {
        let mid = (self.start_point + self.end_point) * 0.5;
        let dir = mid
            .try_normalize()
            .or_else(|| self.start_point.try_normalize())
            .unwrap_or(Vec3::Y);
        dir * self.start_point.length() * (1.0 + energy * TRACE_BULGE_GAIN)
    }

    /// Position along the quadratic Bézier at progress `p`.
    pub fn point_at(&self, p: f32, energy: f32) -> Vec3 {
        let c = self.control_point(energy);
        let u = 1.0 - p;
        self.start_point * (u * u) + c * (2.0 * u * p) + self.end_point * (p * p)
    }

    /// Fades in and out over the lifetime, peaking at the midpoint.
    pub fn alpha(&self, energy: f32) -> f32 {
        (self.progress * PI).sin() * (1.0 + energy * TRACE_GLOW_GAIN)
    }
}

/// Probability of a spawn burst on an active beat.
pub fn spawn_probability(energy: f32) -> f32 {
    let p = energy * SPAWN_PROBABILITY_GAIN;
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Number of traces in one burst.
pub fn spawn_count(energy: f32) -> usize {
    // NaN and negatives saturate to zero.
    (SPAWN_BASE_COUNT + energy * SPAWN_ENERGY_COUNT).floor() as usize
}

/// Build one trace at `t`, drawing geometry, color and duration from `rng`.
pub fn create_trace<R: Rng + ?Sized>(features: &FeatureState, t: f64, rng: &mut R) -> LightTrace {
    let radius = TRACE_MIN_RADIUS + rng.gen::<f32>() * TRACE_RADIUS_SPAN;
    let start_phi = rng.gen::<f32>() * TAU;
    let start_theta = rng.gen::<f32>() * PI;
    let end_phi = start_phi + (rng.gen::<f32>() - 0.5) * PI * features.danceability;
    let end_theta = start_theta + (rng.gen::<f32>() - 0.5) * PI * features.energy;

    let color = hsl_to_rgb(
        rng.gen::<f32>() * TRACE_HUE_JITTER + features.valence * 0.5,
        0.8 + features.energy * 0.2,
        0.6 + features.energy * 0.4,
    );
    let duration = TRACE_BASE_DURATION
        + rng.gen::<f32>() * TRACE_DURATION_JITTER
        + features.danceability * TRACE_DANCE_DURATION;

    LightTrace {
        start_point: spherical(radius, start_theta, start_phi),
        end_point: spherical(radius, end_theta, end_phi),
        color,
        spawn_time: t,
        duration,
        progress: 0.0,
    }
}

#[inline]
fn spherical(radius: f32, theta: f32, phi: f32) -> Vec3 {
    Vec3::new(
        radius * theta.sin() * phi.cos(),
        radius * theta.sin() * phi.sin(),
        radius * theta.cos(),
    )
}

/// Fixed-capacity arena of live traces.
///
/// The backing vector is allocated once; spawns that find it full are dropped
/// and counted in [`TracePool::dropped`].
#[derive(Clone, Debug)]
pub struct TracePool {
    traces: Vec<LightTrace>,
    capacity: usize,
    dropped: u64,
}

impl Default for TracePool {
    fn default() -> Self {
        Self::new(TRACE_CAPACITY)
    }
}

impl TracePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            traces: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Total spawns discarded because the arena was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn live(&self) -> &[LightTrace] {
        &self.traces
    }

    /// Store `trace` if a slot is free.
    pub fn insert(&mut self, trace: LightTrace) -> bool {
        if self.traces.len() < self.capacity {
            self.traces.push(trace);
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    /// Attempt a beat-gated burst. Returns the traces created this call, which
    /// includes any that did not fit in the arena.
    pub fn try_spawn<R: Rng + ?Sized>(
        &mut self,
        features: &FeatureState,
        beat: Option<&Beat>,
        t: f64,
        rng: &mut R,
    ) -> SpawnBatch {
        let mut batch = SpawnBatch::new();
        if beat.is_none() {
            return batch;
        }
        if rng.gen::<f32>() >= spawn_probability(features.energy) {
            return batch;
        }
        for _ in 0..spawn_count(features.energy) {
            let trace = create_trace(features, t, rng);
            self.insert(trace);
            batch.push(trace);
        }
        batch
    }

    /// Drop traces whose age exceeds their duration. Returns how many went.
    pub fn cull(&mut self, t: f64) -> usize {
        let before = self.traces.len();
        self.traces.retain(|tr| tr.is_live(t));
        before - self.traces.len()
    }

    /// Cull, then refresh every survivor's progress for time `t`.
    pub fn update(&mut self, t: f64) -> &[LightTrace] {
        self.cull(t);
        for tr in &mut self.traces {
            tr.progress = tr.progress_at(t);
        }
        &self.traces
    }

    pub fn clear(&mut self) {
        self.traces.clear();
    }
}

/// One line-list vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TraceVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Vertex store for traces: two vertices per slot, `capacity` slots.
///
/// Each write fills slots `0..live` and zeroes whatever the previous frame
/// left beyond the new live count, so shrinking never leaves stale segments.
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    vertices: Vec<TraceVertex>,
    capacity: usize,
    live: usize,
}

impl TraceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            vertices: vec![TraceVertex::zeroed(); capacity * 2],
            capacity,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Segments written by the last [`TraceBuffer::write`].
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn vertices(&self) -> &[TraceVertex] {
        &self.vertices
    }

    /// The vertices that carry live segments.
    pub fn live_vertices(&self) -> &[TraceVertex] {
        &self.vertices[..self.live * 2]
    }

    /// Write a segment from each trace's start to its current head. Returns
    /// the number of segments written, never more than the capacity.
    pub fn write(&mut self, traces: &[LightTrace], energy: f32) -> usize {
        let n = traces.len().min(self.capacity);
        for (i, tr) in traces.iter().take(n).enumerate() {
            let head = tr.point_at(tr.progress, energy);
            let alpha = tr.alpha(energy);
            self.vertices[i * 2] = TraceVertex {
                position: tr.start_point.to_array(),
                color: tr.color.to_array(),
            };
            self.vertices[i * 2 + 1] = TraceVertex {
                position: head.to_array(),
                color: (tr.color * alpha).to_array(),
            };
        }
        if self.live > n {
            self.vertices[n * 2..self.live * 2].fill(TraceVertex::zeroed());
        }
        self.live = n;
        n
    }

    pub fn clear(&mut self) {
        self.write(&[], 0.0);
    }
}
