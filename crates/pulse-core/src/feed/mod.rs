//! Music-description feed: the normalized record the engine consumes, the
//! adapter that produces it from upstream payloads, one synthetic producer and
//! the single-slot cell used to hand samples to the render tick.

pub mod adapter;
pub mod cell;
pub mod synthetic;

pub use adapter::*;
pub use cell::*;
pub use synthetic::*;

/// Per-track musical descriptors driving the visuals.
///
/// `energy`, `danceability` and `valence` are normalized to 0..1; `tempo` is
/// in beats per minute and always positive once accepted by the adapter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureState {
    pub energy: f32,
    pub danceability: f32,
    pub valence: f32,
    pub tempo: f32,
}

impl FeatureState {
    /// Features with every motion term switched off, keeping the color and
    /// tempo of `self`. Used to hold the scene still while nothing plays.
    pub fn resting(&self) -> Self {
        Self {
            energy: 0.0,
            danceability: 0.0,
            valence: self.valence,
            tempo: self.tempo,
        }
    }
}

impl Default for FeatureState {
    fn default() -> Self {
        Self {
            energy: 0.5,
            danceability: 0.5,
            valence: 0.5,
            tempo: 120.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Beat {
    pub start: f64,
    pub duration: f64,
    pub confidence: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Section {
    pub start: f64,
    pub duration: f64,
    pub loudness: f32,
    pub tempo: f32,
    pub key: i32,
    pub mode: i32,
    pub time_signature: i32,
}

/// One accepted snapshot for the currently playing track.
///
/// `beats` and `sections` are sorted ascending by `start`.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedSample {
    pub track_id: String,
    pub features: FeatureState,
    pub beats: Vec<Beat>,
    pub sections: Vec<Section>,
    pub progress_ms: u64,
}

impl FeedSample {
    /// Track position reported by the feed, in seconds.
    pub fn track_time(&self) -> f64 {
        self.progress_ms as f64 / 1000.0
    }
}

/// What the polling collaborator last delivered.
#[derive(Clone, Debug, PartialEq)]
pub enum FeedUpdate {
    Sample(FeedSample),
    NoTrack,
}
