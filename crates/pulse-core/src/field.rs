//! Steady-state field: particle motion, energy-core modulation, camera orbit
//! and bloom, all computed from the current features and track time.
//!
//! Everything here is a pure function of its arguments except [`Orbit`],
//! which integrates azimuth across frames and is owned by the orchestrator.

use crate::color::hsl_to_rgb;
use crate::constants::*;
use crate::feed::FeatureState;
use crate::scene::ParticleInstance;
use glam::{Mat4, Vec3};
use rand::Rng;
use std::f32::consts::{PI, TAU};

/// Per-particle attributes fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSeed {
    pub base: Vec3,
    pub color: Vec3,
    pub size: f32,
    pub speed: f32,
    pub offset: f32,
}

impl ParticleSeed {
    /// Distance from the z axis, which the spiral preserves.
    pub fn axial_radius(&self) -> f32 {
        Vec3::new(self.base.x, self.base.y, 0.0).length()
    }

    /// This particle's phase-shifted time.
    pub fn local_time(&self, t: f32) -> f32 {
        t * self.speed + self.offset
    }
}

/// Scatter `count` particles through a shell of radius 2..5.
pub fn seed_particles<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<ParticleSeed> {
    (0..count)
        .map(|_| {
            let radius = PARTICLE_MIN_RADIUS + rng.gen::<f32>() * PARTICLE_RADIUS_SPAN;
            let phi = rng.gen::<f32>() * TAU;
            let theta = rng.gen::<f32>() * PI;
            ParticleSeed {
                base: Vec3::new(
                    radius * theta.sin() * phi.cos(),
                    radius * theta.sin() * phi.sin(),
                    radius * theta.cos(),
                ),
                color: hsl_to_rgb(rng.gen::<f32>(), PARTICLE_SATURATION, PARTICLE_LIGHTNESS),
                size: rng.gen::<f32>() * PARTICLE_MAX_SIZE,
                speed: rng.gen::<f32>(),
                offset: rng.gen::<f32>() * TAU,
            }
        })
        .collect()
}

/// Radial pulse term shared by position and point size.
pub fn particle_pulse(seed: &ParticleSeed, features: &FeatureState, t: f32) -> f32 {
    (seed.local_time(t) * 2.0).sin() * features.energy
}

/// World position of a particle at track time `t`.
pub fn particle_position(seed: &ParticleSeed, features: &FeatureState, t: f32) -> Vec3 {
    let lt = seed.local_time(t);
    let radius = seed.axial_radius();
    let angle = seed.base.y.atan2(seed.base.x)
        + lt * (SPIRAL_BASE_RATE + features.danceability * SPIRAL_DANCE_RATE);
    let mut pos = Vec3::new(radius * angle.cos(), radius * angle.sin(), seed.base.z);
    pos *= 1.0 + particle_pulse(seed, features, t) * PULSE_RADIAL_GAIN;
    pos.z += (lt + radius * WAVE_RADIUS_FREQ).sin() * WAVE_AMPLITUDE * features.energy;
    pos
}

/// Point size in pixels for a particle `depth` units in front of the camera.
pub fn particle_size(seed: &ParticleSeed, pulse: f32, depth: f32) -> f32 {
    let depth = if depth.is_finite() { depth.max(POINT_MIN_DEPTH) } else { POINT_MIN_DEPTH };
    seed.size * (POINT_PERSPECTIVE_SCALE / depth) * (1.0 + pulse * PULSE_SIZE_GAIN)
}

/// Fades with distance from the center, brightens with energy.
pub fn particle_alpha(position: Vec3, energy: f32) -> f32 {
    ((1.0 - position.length() / FADE_RADIUS) * (0.5 + energy * 0.5)).clamp(0.0, 1.0)
}

/// Fill `out` with the particle field for time `t` seen through `view`.
pub fn write_particles(
    seeds: &[ParticleSeed],
    features: &FeatureState,
    t: f32,
    view: &Mat4,
    out: &mut [ParticleInstance],
) {
    for (seed, slot) in seeds.iter().zip(out.iter_mut()) {
        let pos = particle_position(seed, features, t);
        let pulse = particle_pulse(seed, features, t);
        let depth = -view.transform_point3(pos).z;
        *slot = ParticleInstance {
            position: pos.to_array(),
            size: particle_size(seed, pulse, depth),
            color: seed.color.extend(particle_alpha(pos, features.energy)).to_array(),
        };
    }
}

/// Uniform inputs for the energy core shader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoreParams {
    pub time: f32,
    pub energy: f32,
    pub color1: Vec3,
    pub color2: Vec3,
}

impl Default for CoreParams {
    fn default() -> Self {
        core_params(&FeatureState::default(), 0.0)
    }
}

pub fn core_params(features: &FeatureState, t: f32) -> CoreParams {
    let lightness = CORE_BASE_LIGHTNESS + features.energy * CORE_ENERGY_LIGHTNESS;
    let hue = features.valence * 0.5;
    CoreParams {
        time: t,
        energy: features.energy,
        color1: hsl_to_rgb(hue, CORE_SATURATION, lightness),
        color2: hsl_to_rgb((hue + 0.5).rem_euclid(1.0), CORE_SATURATION, lightness),
    }
}

/// Offset along the surface normal for a core vertex at height `y`.
pub fn core_displacement(t: f32, y: f32, energy: f32) -> f32 {
    (t * 2.0 + y * 5.0).sin() * energy * CORE_DISPLACEMENT_GAIN
}

/// Rim-lit intensity of the core surface: a Fresnel term strongest at
/// grazing angles plus an energy-weighted pulse glow.
pub fn core_intensity(normal: Vec3, view_dir: Vec3, t: f32, dist: f32, energy: f32) -> f32 {
    let pulse = (t * 3.0 + dist * 5.0).sin() * 0.5 + 0.5;
    let facing = normal.normalize_or_zero().dot(view_dir.normalize_or_zero()).abs();
    let fresnel = (1.0 - facing).powi(3);
    fresnel + energy * (0.5 + pulse * 0.5)
}

/// Auto-rotation speed in orbit units (one unit is a turn per minute).
pub fn orbit_speed(features: &FeatureState) -> f32 {
    ORBIT_BASE_SPEED + (features.tempo / ORBIT_REFERENCE_TEMPO) * features.energy
}

pub fn camera_bob(features: &FeatureState, t: f32) -> f32 {
    (t * BOB_FREQUENCY).sin() * features.danceability
}

pub fn bloom_strength(features: &FeatureState) -> f32 {
    BLOOM_BASE + features.energy
}

/// Scalar outputs of the field for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldParams {
    pub core: CoreParams,
    pub orbit_speed: f32,
    pub bob: f32,
    pub bloom: f32,
}

impl FieldParams {
    pub fn is_finite(&self) -> bool {
        [
            self.core.time,
            self.core.energy,
            self.orbit_speed,
            self.bob,
            self.bloom,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.core.color1.is_finite()
            && self.core.color2.is_finite()
    }
}

pub fn compute(features: &FeatureState, t: f32) -> FieldParams {
    FieldParams {
        core: core_params(features, t),
        orbit_speed: orbit_speed(features),
        bob: camera_bob(features, t),
        bloom: bloom_strength(features),
    }
}

/// Camera azimuth integrated from the auto-rotation speed, with damping so
/// speed changes ease in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Orbit {
    pub azimuth: f32,
    pub velocity: f32,
}

impl Orbit {
    pub fn step(&mut self, speed: f32, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let target = speed * ORBIT_RAD_PER_SEC_PER_UNIT;
        let blend = 1.0 - (1.0 - ORBIT_DAMPING_PER_FRAME).powf(dt * 60.0);
        self.velocity += (target - self.velocity) * blend;
        self.azimuth = (self.azimuth + self.velocity * dt).rem_euclid(TAU);
    }

    pub fn eye(&self, distance: f32, bob: f32) -> Vec3 {
        Vec3::new(
            distance * self.azimuth.sin(),
            bob,
            distance * self.azimuth.cos(),
        )
    }
}
