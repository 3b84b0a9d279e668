use super::{Beat, FeatureState, FeedSample, Section};
use crate::error::{EventKind, FeedError};
use serde::{Deserialize, Serialize};

/// Upstream payload as delivered by a feed producer.
///
/// Mirrors the JSON shape of the analysis endpoint: either a `synthetic` event
/// grid or a real `analysis`, plus the track id, features and playback
/// position. Everything is optional here; [`normalize`] decides what is
/// required.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawFeed {
    #[serde(rename = "trackId", alias = "track_id")]
    pub track_id: Option<String>,
    #[serde(alias = "progressMs")]
    pub progress_ms: Option<i64>,
    pub features: Option<RawFeatures>,
    pub synthetic: Option<RawEvents>,
    pub analysis: Option<RawEvents>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RawFeatures {
    pub energy: f32,
    pub danceability: f32,
    pub valence: f32,
    pub tempo: f32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawEvents {
    #[serde(default)]
    pub beats: Vec<RawBeat>,
    #[serde(default)]
    pub sections: Vec<RawSection>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RawBeat {
    pub start: f64,
    pub duration: f64,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

/// Section entry; real analysis reports `loudness_max` where the synthetic
/// grid reports `loudness`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RawSection {
    pub start: f64,
    pub duration: f64,
    #[serde(default, alias = "loudness_max")]
    pub loudness: f32,
    #[serde(default)]
    pub tempo: f32,
    #[serde(default)]
    pub key: i32,
    #[serde(default)]
    pub mode: i32,
    #[serde(default = "common_time")]
    pub time_signature: i32,
}

fn full_confidence() -> f32 {
    1.0
}

fn common_time() -> i32 {
    4
}

/// Result of a successful [`FeedAdapter::ingest`].
#[derive(Clone, Debug)]
pub struct Ingested {
    pub sample: FeedSample,
    /// The track id differs from the previously accepted sample.
    pub track_changed: bool,
}

/// Turns raw payloads into [`FeedSample`]s and flags track changes.
///
/// The only state kept is the id of the last accepted track; rejected payloads
/// leave it untouched.
#[derive(Debug, Default)]
pub struct FeedAdapter {
    last_track_id: Option<String>,
}

impl FeedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_track_id(&self) -> Option<&str> {
        self.last_track_id.as_deref()
    }

    pub fn ingest(&mut self, raw: &RawFeed) -> Result<Ingested, FeedError> {
        let sample = normalize(raw)?;
        let track_changed = self.last_track_id.as_deref() != Some(sample.track_id.as_str());
        if track_changed {
            log::info!(
                "[feed] track changed {:?} -> {}",
                self.last_track_id,
                sample.track_id
            );
            self.last_track_id = Some(sample.track_id.clone());
        }
        log::debug!(
            "[feed] accepted track={} progress={}ms beats={} sections={}",
            sample.track_id,
            sample.progress_ms,
            sample.beats.len(),
            sample.sections.len()
        );
        Ok(Ingested {
            sample,
            track_changed,
        })
    }

    pub fn ingest_json(&mut self, json: &str) -> Result<Ingested, FeedError> {
        let raw: RawFeed = serde_json::from_str(json)?;
        self.ingest(&raw)
    }
}

/// Validate and normalize one payload.
pub fn normalize(raw: &RawFeed) -> Result<FeedSample, FeedError> {
    let track_id = match raw.track_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err(FeedError::MissingTrackId),
    };
    let features = normalize_features(raw.features.as_ref().ok_or(FeedError::MissingFeatures)?)?;

    let progress_ms = match raw.progress_ms {
        Some(ms) if ms < 0 => return Err(FeedError::NegativeProgress(ms)),
        Some(ms) => ms as u64,
        None => 0,
    };

    let events = raw.analysis.as_ref().or(raw.synthetic.as_ref());
    let (raw_beats, raw_sections) = match events {
        Some(e) => (e.beats.as_slice(), e.sections.as_slice()),
        None => (&[][..], &[][..]),
    };

    let mut beats = Vec::with_capacity(raw_beats.len());
    for (index, b) in raw_beats.iter().enumerate() {
        check_interval(EventKind::Beat, index, b.start, b.duration)?;
        if !b.confidence.is_finite() {
            return Err(FeedError::NonFinite("beat confidence"));
        }
        beats.push(Beat {
            start: b.start,
            duration: b.duration,
            confidence: b.confidence.clamp(0.0, 1.0),
        });
    }

    let mut sections = Vec::with_capacity(raw_sections.len());
    for (index, s) in raw_sections.iter().enumerate() {
        check_interval(EventKind::Section, index, s.start, s.duration)?;
        if !s.loudness.is_finite() || !s.tempo.is_finite() {
            return Err(FeedError::NonFinite("section"));
        }
        sections.push(Section {
            start: s.start,
            duration: s.duration,
            loudness: s.loudness,
            tempo: s.tempo,
            key: s.key,
            mode: s.mode,
            time_signature: s.time_signature,
        });
    }

    // Stable sort keeps upstream order for equal starts.
    if !beats.windows(2).all(|w| w[0].start <= w[1].start) {
        log::debug!("[feed] reordering {} beats by start", beats.len());
        beats.sort_by(|a, b| a.start.total_cmp(&b.start));
    }
    if !sections.windows(2).all(|w| w[0].start <= w[1].start) {
        log::debug!("[feed] reordering {} sections by start", sections.len());
        sections.sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    Ok(FeedSample {
        track_id,
        features,
        beats,
        sections,
        progress_ms,
    })
}

fn normalize_features(raw: &RawFeatures) -> Result<FeatureState, FeedError> {
    let all_finite = [raw.energy, raw.danceability, raw.valence, raw.tempo]
        .iter()
        .all(|v| v.is_finite());
    if !all_finite {
        return Err(FeedError::NonFinite("features"));
    }
    if raw.tempo <= 0.0 {
        return Err(FeedError::NonPositiveTempo(raw.tempo));
    }
    Ok(FeatureState {
        energy: raw.energy.clamp(0.0, 1.0),
        danceability: raw.danceability.clamp(0.0, 1.0),
        valence: raw.valence.clamp(0.0, 1.0),
        tempo: raw.tempo,
    })
}

fn check_interval(kind: EventKind, index: usize, start: f64, duration: f64) -> Result<(), FeedError> {
    if !start.is_finite() || !duration.is_finite() {
        return Err(FeedError::NonFinite(match kind {
            EventKind::Beat => "beat",
            EventKind::Section => "section",
        }));
    }
    if duration < 0.0 {
        return Err(FeedError::NegativeDuration {
            kind,
            index,
            duration,
        });
    }
    Ok(())
}
