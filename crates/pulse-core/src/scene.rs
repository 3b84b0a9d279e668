//! Per-frame scene snapshot handed to a [`crate::RenderSurface`].

use crate::constants::{CORE_DETAIL, CORE_RADIUS, FOG_DENSITY};
use crate::events::ActiveEvents;
use crate::feed::FeatureState;
use crate::field::{self, CoreParams, FieldParams, ParticleSeed};
use crate::geometry::{icosphere, Mesh};
use crate::state::{Camera, Viewport};
use crate::traces::{LightTrace, TraceBuffer};
use bytemuck::Zeroable;

/// One particle instance as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    /// Point size in pixels.
    pub size: f32,
    /// RGB plus alpha.
    pub color: [f32; 4],
}

/// Shared uniform block for every scene pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// xyz eye, w fog density.
    pub camera_pos: [f32; 4],
    /// rgb core color, w time.
    pub core_color1: [f32; 4],
    /// rgb core rim color, w energy.
    pub core_color2: [f32; 4],
    pub viewport: [f32; 2],
    pub bloom: f32,
    pub _pad: f32,
}

#[derive(Clone, Debug)]
pub struct SceneState {
    /// Track time this frame was computed for, in seconds.
    pub time: f64,
    pub features: FeatureState,
    pub events: ActiveEvents,
    pub camera: Camera,
    pub viewport: Viewport,
    pub core: CoreParams,
    /// Undisplaced core sphere; displacement happens in the vertex stage.
    pub core_mesh: Mesh,
    pub bloom: f32,
    pub particles: Vec<ParticleInstance>,
    pub traces: TraceBuffer,
}

impl SceneState {
    /// Allocate buffers for `particle_count` particles, the core mesh and
    /// `trace_capacity` trace segments.
    pub fn new(particle_count: usize, trace_capacity: usize, viewport: Viewport) -> Self {
        let camera = Camera {
            aspect: viewport.aspect(),
            ..Camera::default()
        };
        Self {
            time: 0.0,
            features: FeatureState::default(),
            events: ActiveEvents::default(),
            camera,
            viewport,
            core: CoreParams::default(),
            core_mesh: icosphere(CORE_RADIUS, CORE_DETAIL),
            bloom: field::bloom_strength(&FeatureState::default()),
            particles: vec![ParticleInstance::zeroed(); particle_count],
            traces: TraceBuffer::new(trace_capacity),
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.aspect = viewport.aspect();
    }

    /// Write a frame. `params` must already have been checked finite.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &mut self,
        t: f64,
        features: &FeatureState,
        events: ActiveEvents,
        params: &FieldParams,
        camera: Camera,
        seeds: &[ParticleSeed],
        traces: &[LightTrace],
    ) {
        self.time = t;
        self.features = *features;
        self.events = events;
        self.camera = Camera {
            aspect: self.viewport.aspect(),
            ..camera
        };
        self.core = params.core;
        self.bloom = params.bloom;
        let view = self.camera.view_matrix();
        field::write_particles(seeds, features, t as f32, &view, &mut self.particles);
        self.traces.write(traces, features.energy);
    }

    pub fn uniforms(&self) -> SceneUniforms {
        let eye = self.camera.eye;
        SceneUniforms {
            view_proj: self.camera.view_proj().to_cols_array_2d(),
            camera_pos: [eye.x, eye.y, eye.z, FOG_DENSITY],
            core_color1: self.core.color1.extend(self.core.time).to_array(),
            core_color2: self.core.color2.extend(self.core.energy).to_array(),
            viewport: [self.viewport.width as f32, self.viewport.height as f32],
            bloom: self.bloom,
            _pad: 0.0,
        }
    }

    /// True when nothing in the frame is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        let p_ok = self.particles.iter().all(|p| {
            p.position.iter().all(|v| v.is_finite())
                && p.size.is_finite()
                && p.color.iter().all(|v| v.is_finite())
        });
        let t_ok = self
            .traces
            .live_vertices()
            .iter()
            .all(|v| v.position.iter().chain(v.color.iter()).all(|c| c.is_finite()));
        self.time.is_finite()
            && self.camera.eye.is_finite()
            && self.core.color1.is_finite()
            && self.core.color2.is_finite()
            && self.bloom.is_finite()
            && p_ok
            && t_ok
    }
}
