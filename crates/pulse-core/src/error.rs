//! Error types for the animation engine.
use thiserror::Error;

/// Which event list an offending entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Beat,
    Section,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Beat => f.write_str("beat"),
            EventKind::Section => f.write_str("section"),
        }
    }
}

/// A feed payload that cannot be turned into a [`crate::FeedSample`].
///
/// The sample is discarded by the caller; the last valid sample stays in use.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("malformed feed: missing track id")]
    MissingTrackId,

    #[error("malformed feed: missing features")]
    MissingFeatures,

    #[error("malformed feed: non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("malformed feed: tempo must be positive, got {0}")]
    NonPositiveTempo(f32),

    #[error("malformed feed: {kind} {index} has negative duration {duration}")]
    NegativeDuration {
        kind: EventKind,
        index: usize,
        duration: f64,
    },

    #[error("malformed feed: negative progress {0} ms")]
    NegativeProgress(i64),

    #[error("malformed feed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by the rendering surface collaborator.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The surface could not be created or reconfigured.
    #[error("surface unavailable: {0}")]
    Unavailable(String),

    /// The surface was lost; it may be recovered by a resize.
    #[error("surface lost")]
    Lost,

    /// A single frame could not be presented.
    #[error("frame submission failed: {0}")]
    Submit(String),
}

/// Why [`crate::Visualizer::start`] refused to enter `Running`.
#[derive(Error, Debug)]
pub enum StartError {
    #[error(transparent)]
    SurfaceUnavailable(#[from] SurfaceError),

    #[error("visualizer was already torn down")]
    TornDown,
}
