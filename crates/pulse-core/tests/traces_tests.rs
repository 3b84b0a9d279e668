use glam::Vec3;
use pulse_core::{
    create_trace, spawn_count, spawn_probability, Beat, FeatureState, LightTrace, TraceBuffer,
    TracePool, TraceVertex,
};
use rand::rngs::mock::StepRng;
use rand::prelude::*;

fn features(energy: f32, danceability: f32) -> FeatureState {
    FeatureState {
        energy,
        danceability,
        valence: 0.5,
        tempo: 120.0,
    }
}

fn trace_at(spawn_time: f64, duration: f32) -> LightTrace {
    LightTrace {
        start_point: Vec3::new(2.0, 0.0, 0.0),
        end_point: Vec3::new(0.0, 2.0, 0.0),
        color: Vec3::new(1.0, 0.5, 0.25),
        spawn_time,
        duration,
        progress: 0.0,
    }
}

fn on_beat() -> Beat {
    Beat {
        start: 0.0,
        duration: 0.5,
        confidence: 1.0,
    }
}

#[test]
fn probability_and_count_follow_energy() {
    assert_eq!(spawn_probability(0.0), 0.0);
    assert!((spawn_probability(0.4) - 0.6).abs() < 1e-6);
    assert_eq!(spawn_probability(1.0), 1.0);
    assert_eq!(spawn_probability(f32::NAN), 0.0);
    assert_eq!(spawn_count(0.0), 2);
    assert_eq!(spawn_count(0.5), 4);
    assert_eq!(spawn_count(1.0), 6);
}

#[test]
fn trace_lives_through_its_duration_and_is_culled_after() {
    let mut pool = TracePool::new(16);
    assert!(pool.insert(trace_at(10.0, 0.5)));

    let live = pool.update(10.4);
    assert_eq!(live.len(), 1);
    assert!((live[0].progress - 0.8).abs() < 1e-4);

    assert!(pool.update(10.6).is_empty());
}

#[test]
fn trace_at_exact_duration_is_still_live() {
    let mut pool = TracePool::new(4);
    pool.insert(trace_at(1.0, 0.5));
    assert_eq!(pool.update(1.5).len(), 1);
    assert_eq!(pool.live()[0].progress, 1.0);
}

#[test]
fn no_beat_means_no_spawn() {
    let mut pool = TracePool::default();
    let mut rng = StepRng::new(0, 0);
    let batch = pool.try_spawn(&features(1.0, 1.0), None, 0.0, &mut rng);
    assert!(batch.is_empty());
    assert!(pool.is_empty());
}

#[test]
fn full_energy_beat_spawns_six() {
    let mut pool = TracePool::default();
    let mut rng = StepRng::new(0, 0);
    let beat = on_beat();
    let batch = pool.try_spawn(&features(1.0, 0.5), Some(&beat), 0.25, &mut rng);
    assert_eq!(batch.len(), 6);
    assert_eq!(pool.len(), 6);
    assert!(batch.iter().all(|t| t.spawn_time == 0.25));
}

#[test]
fn silent_track_never_spawns() {
    let mut pool = TracePool::default();
    let mut rng = StepRng::new(0, 0);
    let beat = on_beat();
    let batch = pool.try_spawn(&features(0.0, 0.5), Some(&beat), 0.0, &mut rng);
    assert!(batch.is_empty());
}

#[test]
fn created_traces_stay_on_their_shell() {
    let mut rng = StdRng::seed_from_u64(7);
    let f = features(0.8, 0.6);
    for _ in 0..500 {
        let tr = create_trace(&f, 3.0, &mut rng);
        let r = tr.start_point.length();
        assert!((1.5..=3.5 + 1e-4).contains(&r), "radius {r}");
        assert!((tr.end_point.length() - r).abs() < 1e-3);
        let max_duration = 0.3 + 0.4 + f.danceability * 0.3;
        assert!(tr.duration >= 0.3 + f.danceability * 0.3 - 1e-6);
        assert!(tr.duration <= max_duration + 1e-6);
        assert!(tr.color.min_element() >= 0.0 && tr.color.max_element() <= 1.0);
    }
}

#[test]
fn bezier_runs_from_start_to_end() {
    let tr = trace_at(0.0, 1.0);
    assert!((tr.point_at(0.0, 0.7) - tr.start_point).length() < 1e-6);
    assert!((tr.point_at(1.0, 0.7) - tr.end_point).length() < 1e-6);
    // Control point bulges outward with energy.
    let calm = tr.point_at(0.5, 0.0).length();
    let loud = tr.point_at(0.5, 1.0).length();
    assert!(loud > calm);
}

#[test]
fn alpha_peaks_mid_life() {
    let mut tr = trace_at(0.0, 1.0);
    tr.progress = 0.0;
    assert!(tr.alpha(1.0).abs() < 1e-6);
    tr.progress = 0.5;
    assert!((tr.alpha(1.0) - 1.5).abs() < 1e-5);
}

#[test]
fn overflowing_the_arena_drops_without_error() {
    let mut pool = TracePool::new(2000);
    for i in 0..10_000 {
        pool.insert(trace_at(i as f64 * 1e-6, 5.0));
    }
    assert_eq!(pool.len(), 2000);
    assert_eq!(pool.dropped(), 8000);

    let mut buf = TraceBuffer::new(pool.capacity());
    let live = pool.update(0.1).to_vec();
    assert_eq!(buf.write(&live, 0.5), 2000);
    assert_eq!(buf.live_vertices().len(), 4000);

    // Shrink: everything past the new live count must be zeroed.
    assert_eq!(buf.write(&live[..10], 0.5), 10);
    assert!(buf.vertices()[20..]
        .iter()
        .all(|v| *v == TraceVertex::default()));
}

#[test]
fn buffer_write_is_capped_at_capacity() {
    let traces: Vec<LightTrace> = (0..50).map(|_| trace_at(0.0, 1.0)).collect();
    let mut buf = TraceBuffer::new(8);
    assert_eq!(buf.write(&traces, 1.0), 8);
    assert_eq!(buf.vertices().len(), 16);
}

#[test]
fn segment_colors_fade_at_the_head() {
    let mut tr = trace_at(0.0, 1.0);
    tr.progress = 0.5;
    let mut buf = TraceBuffer::new(4);
    buf.write(&[tr], 0.0);
    let v = buf.live_vertices();
    assert_eq!(v[0].color, tr.color.to_array());
    assert_eq!(v[0].position, tr.start_point.to_array());
    let head = (tr.color * tr.alpha(0.0)).to_array();
    assert_eq!(v[1].color, head);

    buf.clear();
    assert_eq!(buf.live_count(), 0);
    assert!(buf.vertices().iter().all(|v| *v == TraceVertex::default()));
}
