use pulse_core::{
    normalize, FeedAdapter, FeedCell, FeedError, FeedUpdate, RawBeat, RawEvents, RawFeatures,
    RawFeed, SyntheticFeed, TrackInfo,
};
use std::sync::Arc;

fn raw_features() -> RawFeatures {
    RawFeatures {
        energy: 0.7,
        danceability: 0.6,
        valence: 0.3,
        tempo: 128.0,
    }
}

fn raw(track: &str) -> RawFeed {
    RawFeed {
        track_id: Some(track.to_string()),
        progress_ms: Some(1500),
        features: Some(raw_features()),
        synthetic: None,
        analysis: None,
    }
}

fn rb(start: f64, duration: f64) -> RawBeat {
    RawBeat {
        start,
        duration,
        confidence: 1.0,
    }
}

fn track(id: &str, popularity: u8, duration_ms: u64) -> TrackInfo {
    TrackInfo {
        id: id.to_string(),
        name: format!("Track {id}"),
        popularity,
        duration_ms,
        progress_ms: 2_000,
    }
}

#[test]
fn normalize_accepts_minimal_payload() {
    let s = normalize(&raw("abc")).expect("valid");
    assert_eq!(s.track_id, "abc");
    assert_eq!(s.progress_ms, 1500);
    assert!((s.track_time() - 1.5).abs() < 1e-12);
    assert!(s.beats.is_empty() && s.sections.is_empty());
    assert_eq!(s.features.tempo, 128.0);
}

#[test]
fn missing_or_blank_track_id_is_rejected() {
    let mut r = raw("x");
    r.track_id = None;
    assert!(matches!(normalize(&r), Err(FeedError::MissingTrackId)));
    r.track_id = Some("   ".into());
    assert!(matches!(normalize(&r), Err(FeedError::MissingTrackId)));
}

#[test]
fn missing_features_are_rejected() {
    let mut r = raw("x");
    r.features = None;
    assert!(matches!(normalize(&r), Err(FeedError::MissingFeatures)));
}

#[test]
fn non_finite_and_non_positive_tempo_are_rejected() {
    let mut r = raw("x");
    r.features = Some(RawFeatures {
        energy: f32::NAN,
        ..raw_features()
    });
    assert!(matches!(normalize(&r), Err(FeedError::NonFinite(_))));

    r.features = Some(RawFeatures {
        tempo: 0.0,
        ..raw_features()
    });
    assert!(matches!(normalize(&r), Err(FeedError::NonPositiveTempo(_))));
}

#[test]
fn out_of_range_features_are_clamped() {
    let mut r = raw("x");
    r.features = Some(RawFeatures {
        energy: 1.7,
        danceability: -0.2,
        valence: 0.5,
        tempo: 90.0,
    });
    let s = normalize(&r).expect("valid");
    assert_eq!(s.features.energy, 1.0);
    assert_eq!(s.features.danceability, 0.0);
}

#[test]
fn negative_durations_and_progress_are_rejected() {
    let mut r = raw("x");
    r.synthetic = Some(RawEvents {
        beats: vec![rb(0.0, 0.5), rb(0.5, -0.1)],
        sections: vec![],
    });
    match normalize(&r) {
        Err(FeedError::NegativeDuration { index, .. }) => assert_eq!(index, 1),
        other => panic!("unexpected {other:?}"),
    }

    let mut r = raw("x");
    r.progress_ms = Some(-5);
    assert!(matches!(normalize(&r), Err(FeedError::NegativeProgress(-5))));
}

#[test]
fn analysis_wins_over_synthetic() {
    let mut r = raw("x");
    r.synthetic = Some(RawEvents {
        beats: vec![rb(0.0, 0.5)],
        sections: vec![],
    });
    r.analysis = Some(RawEvents {
        beats: vec![rb(0.0, 0.25), rb(0.25, 0.25)],
        sections: vec![],
    });
    assert_eq!(normalize(&r).expect("valid").beats.len(), 2);
}

#[test]
fn unsorted_events_are_sorted_stably() {
    let mut r = raw("x");
    r.synthetic = Some(RawEvents {
        beats: vec![
            rb(2.0, 0.5),
            RawBeat {
                start: 1.0,
                duration: 0.5,
                confidence: 0.2,
            },
            RawBeat {
                start: 1.0,
                duration: 0.5,
                confidence: 0.9,
            },
        ],
        sections: vec![],
    });
    let s = normalize(&r).expect("valid");
    let starts: Vec<f64> = s.beats.iter().map(|b| b.start).collect();
    assert_eq!(starts, vec![1.0, 1.0, 2.0]);
    assert_eq!(s.beats[0].confidence, 0.2);
    assert_eq!(s.beats[1].confidence, 0.9);
}

#[test]
fn json_payload_accepts_analysis_field_names() {
    let json = r#"{
        "trackId": "t1",
        "progressMs": 2500,
        "features": {"energy": 0.5, "danceability": 0.5, "valence": 0.5, "tempo": 100.0},
        "analysis": {
            "beats": [{"start": 0.0, "duration": 0.6}],
            "sections": [{"start": 0.0, "duration": 30.0, "loudness_max": -7.5, "key": 4}]
        }
    }"#;
    let mut adapter = FeedAdapter::new();
    let got = adapter.ingest_json(json).expect("valid");
    assert!(got.track_changed);
    assert_eq!(got.sample.progress_ms, 2500);
    assert_eq!(got.sample.beats[0].confidence, 1.0);
    assert_eq!(got.sample.sections[0].loudness, -7.5);
    assert_eq!(got.sample.sections[0].time_signature, 4);
}

#[test]
fn malformed_json_is_a_feed_error() {
    let mut adapter = FeedAdapter::new();
    assert!(matches!(
        adapter.ingest_json("{not json"),
        Err(FeedError::Json(_))
    ));
    assert!(adapter.last_track_id().is_none());
}

#[test]
fn adapter_flags_track_changes_only() {
    let mut adapter = FeedAdapter::new();
    assert!(adapter.ingest(&raw("a")).expect("valid").track_changed);
    assert!(!adapter.ingest(&raw("a")).expect("valid").track_changed);

    let mut bad = raw("b");
    bad.features = None;
    assert!(adapter.ingest(&bad).is_err());
    assert_eq!(adapter.last_track_id(), Some("a"));

    assert!(adapter.ingest(&raw("b")).expect("valid").track_changed);
}

#[test]
fn synthetic_features_follow_popularity() {
    let feed = SyntheticFeed::generate(&track("id-1", 80, 200_000));
    let f = feed.features.expect("features");
    assert!((f.energy - 0.8).abs() < 1e-6);
    assert!((0.5..1.0).contains(&f.danceability));
    assert!((0.0..1.0).contains(&f.valence));
    assert_eq!(f.tempo, 150.0);
    assert_eq!(feed.progress_ms, Some(2_000));
    assert!(feed.analysis.is_none());
}

#[test]
fn synthetic_grid_covers_the_track() {
    // 120 bpm: half-second beats, eight-second sections.
    let feed = SyntheticFeed::generate(&track("grid", 50, 10_250));
    let events = feed.synthetic.expect("events");
    assert_eq!(events.beats.len(), 21);
    assert_eq!(events.beats[3].start, 1.5);
    assert!(events.beats.iter().all(|b| b.duration == 0.5 && b.confidence == 1.0));

    assert_eq!(events.sections.len(), 2);
    let last = &events.sections[1];
    assert_eq!(last.start, 8.0);
    assert!((last.duration - 2.25).abs() < 1e-9);
    for s in &events.sections {
        assert_eq!(s.loudness, -20.0);
        assert!((0..12).contains(&s.key));
        assert!(s.mode == 0 || s.mode == 1);
        assert_eq!(s.time_signature, 4);
    }
}

#[test]
fn synthetic_is_stable_per_track_and_varies_across_tracks() {
    let a1 = SyntheticFeed::generate(&track("same", 60, 90_000));
    let a2 = SyntheticFeed::generate(&track("same", 60, 90_000));
    let b = SyntheticFeed::generate(&track("other", 60, 90_000));
    let fa1 = a1.features.expect("features");
    let fa2 = a2.features.expect("features");
    let fb = b.features.expect("features");
    assert_eq!(fa1.valence, fa2.valence);
    assert_eq!(fa1.danceability, fa2.danceability);
    assert_ne!(fa1.valence, fb.valence);
}

#[test]
fn synthetic_zero_popularity_keeps_tempo_positive() {
    let feed = SyntheticFeed::generate(&track("quiet", 0, 5_000));
    let f = feed.features.expect("features");
    assert_eq!(f.tempo, 70.0);
    assert_eq!(f.energy, 0.0);
    assert!(normalize(&feed).is_ok());
}

#[test]
fn synthetic_payload_passes_the_adapter() {
    let raw = SyntheticFeed::generate(&track("roundtrip", 73, 180_000));
    let json = serde_json::to_string(&raw).expect("serialize");
    let mut adapter = FeedAdapter::new();
    let got = adapter.ingest_json(&json).expect("valid");
    assert_eq!(got.sample.track_id, "roundtrip");
    assert!(!got.sample.beats.is_empty());
}

#[test]
fn cell_keeps_only_the_latest_update() {
    let cell = FeedCell::new();
    assert!(cell.latest().is_none());

    cell.publish_sample(normalize(&raw("a")).expect("valid"));
    let first = cell.latest().expect("published");
    cell.publish_no_track();
    let second = cell.latest().expect("published");

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*second, FeedUpdate::NoTrack);
    // The old update is still intact for whoever holds it.
    assert!(matches!(&*first, FeedUpdate::Sample(s) if s.track_id == "a"));

    cell.clear();
    assert!(cell.latest().is_none());
}
