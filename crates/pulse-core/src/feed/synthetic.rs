use super::adapter::{RawBeat, RawEvents, RawFeatures, RawFeed, RawSection};
use crate::constants::*;
use fnv::FnvHasher;
use rand::prelude::*;
use std::hash::Hasher;

/// Coarse description of the playing track, as a now-playing endpoint
/// reports it.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackInfo {
    pub id: String,
    pub name: String,
    /// 0..=100
    pub popularity: u8,
    pub duration_ms: u64,
    pub progress_ms: u64,
}

/// Outcome of one poll of a feed producer.
#[derive(Clone, Debug)]
pub enum PollResult {
    Track(RawFeed),
    NoTrack,
}

/// Anything that can be polled for the latest music description.
pub trait FeedProducer {
    fn poll(&mut self) -> PollResult;
}

/// Derives features and a beat/section grid from popularity and duration.
///
/// The mapping is a heuristic, not analysis: popularity stands in for energy
/// and shifts the tempo around 120 bpm, while danceability, valence, key and
/// mode are drawn from an RNG seeded by the track id so repeated polls of the
/// same track agree.
pub struct SyntheticFeed;

impl SyntheticFeed {
    pub fn generate(track: &TrackInfo) -> RawFeed {
        let mut rng = StdRng::seed_from_u64(track_seed(&track.id));
        let features = Self::features(track, &mut rng);
        let events = Self::events(track, &features, &mut rng);
        RawFeed {
            track_id: Some(track.id.clone()),
            progress_ms: Some(track.progress_ms.min(i64::MAX as u64) as i64),
            features: Some(features),
            synthetic: Some(events),
            analysis: None,
        }
    }

    fn features<R: Rng>(track: &TrackInfo, rng: &mut R) -> RawFeatures {
        let popularity = track.popularity.min(100) as f32;
        RawFeatures {
            energy: popularity / 100.0,
            danceability: rng.gen::<f32>() * 0.5 + 0.5,
            valence: rng.gen::<f32>(),
            tempo: (SYNTH_REFERENCE_TEMPO + (popularity - 50.0)).max(MIN_TEMPO_BPM),
        }
    }

    fn events<R: Rng>(track: &TrackInfo, features: &RawFeatures, rng: &mut R) -> RawEvents {
        let beat_interval = 60.0 / features.tempo.max(MIN_TEMPO_BPM) as f64;
        let duration = track.duration_ms as f64 / 1000.0;

        let beat_count = (duration / beat_interval).ceil() as usize;
        let beats = (0..beat_count)
            .map(|i| RawBeat {
                start: i as f64 * beat_interval,
                duration: beat_interval,
                confidence: 1.0,
            })
            .collect();

        let section_len = SYNTH_BEATS_PER_SECTION * beat_interval;
        let section_count = (duration / section_len).ceil() as usize;
        let loudness = SYNTH_BASE_LOUDNESS_DB + features.energy * SYNTH_ENERGY_LOUDNESS_DB;
        let sections = (0..section_count)
            .map(|i| {
                let start = i as f64 * section_len;
                RawSection {
                    start,
                    duration: section_len.min(duration - start),
                    loudness,
                    tempo: features.tempo,
                    key: rng.gen_range(0..12),
                    mode: if rng.gen_bool(0.5) { 1 } else { 0 },
                    time_signature: 4,
                }
            })
            .collect();

        RawEvents { beats, sections }
    }
}

fn track_seed(id: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(id.as_bytes());
    hasher.finish()
}
