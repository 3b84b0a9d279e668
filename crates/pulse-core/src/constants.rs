// Shared visual tuning constants used by the engine and the native frontend.

// Particle field
pub const PARTICLE_COUNT: usize = 15_000;
pub const PARTICLE_MIN_RADIUS: f32 = 2.0;
pub const PARTICLE_RADIUS_SPAN: f32 = 3.0; // shell is 2..5 units
pub const PARTICLE_MAX_SIZE: f32 = 3.0;
pub const PARTICLE_SATURATION: f32 = 0.8;
pub const PARTICLE_LIGHTNESS: f32 = 0.5;
pub const SPIRAL_BASE_RATE: f32 = 0.1;
pub const SPIRAL_DANCE_RATE: f32 = 0.2;
pub const PULSE_RADIAL_GAIN: f32 = 0.1;
pub const PULSE_SIZE_GAIN: f32 = 0.5;
pub const WAVE_RADIUS_FREQ: f32 = 5.0;
pub const WAVE_AMPLITUDE: f32 = 0.2;
pub const POINT_PERSPECTIVE_SCALE: f32 = 350.0; // pixels at unit depth
pub const POINT_MIN_DEPTH: f32 = 0.1;
pub const FADE_RADIUS: f32 = 5.0;

// Energy core
pub const CORE_RADIUS: f32 = 1.0;
pub const CORE_DETAIL: u32 = 4;
pub const CORE_DISPLACEMENT_GAIN: f32 = 0.2;
pub const CORE_SATURATION: f32 = 0.8;
pub const CORE_BASE_LIGHTNESS: f32 = 0.6;
pub const CORE_ENERGY_LIGHTNESS: f32 = 0.4;

// Light traces
pub const TRACE_CAPACITY: usize = 2_000;
pub const SPAWN_PROBABILITY_GAIN: f32 = 1.5;
pub const SPAWN_BASE_COUNT: f32 = 2.0;
pub const SPAWN_ENERGY_COUNT: f32 = 4.0;
pub const TRACE_MIN_RADIUS: f32 = 1.5;
pub const TRACE_RADIUS_SPAN: f32 = 2.0; // shell is 1.5..3.5 units
pub const TRACE_BASE_DURATION: f32 = 0.3;
pub const TRACE_DURATION_JITTER: f32 = 0.4;
pub const TRACE_DANCE_DURATION: f32 = 0.3;
pub const TRACE_HUE_JITTER: f32 = 0.2;
pub const TRACE_BULGE_GAIN: f32 = 0.5; // control point lift per unit energy
pub const TRACE_GLOW_GAIN: f32 = 0.5;
pub const TRACE_MIN_DURATION: f32 = 1e-3;

// Camera
pub const CAMERA_DISTANCE: f32 = 5.0;
pub const CAMERA_FOVY_DEG: f32 = 75.0;
pub const CAMERA_ZNEAR: f32 = 0.1;
pub const CAMERA_ZFAR: f32 = 1000.0;
pub const ORBIT_BASE_SPEED: f32 = 0.2;
pub const ORBIT_REFERENCE_TEMPO: f32 = 120.0;
pub const ORBIT_RAD_PER_SEC_PER_UNIT: f32 = std::f32::consts::TAU / 60.0;
pub const ORBIT_DAMPING_PER_FRAME: f32 = 0.05; // at 60 Hz
pub const BOB_FREQUENCY: f32 = 0.2;

// Post-processing
pub const BLOOM_BASE: f32 = 1.0;
pub const BLOOM_RADIUS: f32 = 0.4;
pub const BLOOM_THRESHOLD: f32 = 0.85;
pub const FOG_DENSITY: f32 = 0.05;

// Transport
pub const RESYNC_TOLERANCE_SEC: f64 = 0.75;
pub const MIN_TEMPO_BPM: f32 = 1.0;

// Synthetic producer
pub const SYNTH_BEATS_PER_SECTION: f64 = 16.0;
pub const SYNTH_REFERENCE_TEMPO: f32 = 120.0;
pub const SYNTH_BASE_LOUDNESS_DB: f32 = -30.0;
pub const SYNTH_ENERGY_LOUDNESS_DB: f32 = 20.0;
