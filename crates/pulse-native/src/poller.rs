//! Background feed polling for the desktop front-end.
//!
//! A named thread polls a [`FeedProducer`] every [`POLL_INTERVAL`], runs the
//! payload through a [`FeedAdapter`] and publishes the result into the shared
//! [`FeedCell`]. The thread sleeps on a channel so cancelling wakes it at
//! once.

use crate::constants::{DEMO_GAP, POLL_INTERVAL, POLL_THREAD_NAME};
use pulse_core::{
    FeedAdapter, FeedCell, FeedProducer, PollHandle, PollResult, SyntheticFeed, TrackInfo,
    WallClock,
};
use rand::Rng;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Demo tracks standing in for a now-playing service.
pub fn demo_tracks() -> Vec<TrackInfo> {
    [
        ("demo-bohemian-rhapsody", "Bohemian Rhapsody - Queen", 90, 354_000),
        ("demo-dancing-queen", "Dancing Queen - ABBA", 85, 231_000),
        ("demo-stairway-to-heaven", "Stairway to Heaven - Led Zeppelin", 80, 482_000),
    ]
    .into_iter()
    .map(|(id, name, popularity, duration_ms)| TrackInfo {
        id: id.to_string(),
        name: name.to_string(),
        popularity,
        duration_ms,
        progress_ms: 0,
    })
    .collect()
}

/// Cycles through a fixed track list in real time, with a short silence
/// between tracks.
pub struct DemoPlaylist {
    tracks: Vec<TrackInfo>,
    clock: WallClock,
    /// Offset into the playlist loop at `clock` zero, in seconds.
    start_offset: f64,
}

impl DemoPlaylist {
    pub fn new(tracks: Vec<TrackInfo>) -> Self {
        // Join the first track somewhere in its opening minute.
        let start_offset = rand::thread_rng().gen_range(0.0..60.0);
        Self {
            tracks,
            clock: WallClock::new(),
            start_offset,
        }
    }

    fn cycle_secs(&self) -> f64 {
        self.tracks
            .iter()
            .map(|t| t.duration_ms as f64 / 1000.0 + DEMO_GAP.as_secs_f64())
            .sum()
    }

    /// What is playing `elapsed` seconds into the loop.
    fn at(&self, elapsed: f64) -> Option<TrackInfo> {
        let cycle = self.cycle_secs();
        if cycle <= 0.0 {
            return None;
        }
        let mut pos = elapsed.rem_euclid(cycle);
        for track in &self.tracks {
            let len = track.duration_ms as f64 / 1000.0;
            if pos < len {
                return Some(TrackInfo {
                    progress_ms: (pos * 1000.0) as u64,
                    ..track.clone()
                });
            }
            pos -= len + DEMO_GAP.as_secs_f64();
            if pos < 0.0 {
                return None;
            }
        }
        None
    }
}

impl FeedProducer for DemoPlaylist {
    fn poll(&mut self) -> PollResult {
        match self.at(self.clock.now_secs() + self.start_offset) {
            Some(track) => PollResult::Track(SyntheticFeed::generate(&track)),
            None => PollResult::NoTrack,
        }
    }
}

/// Handle to the polling thread; cancelling signals and joins it.
pub struct FeedPoller {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FeedPoller {
    pub fn spawn<P>(mut producer: P, cell: Arc<FeedCell>) -> anyhow::Result<Self>
    where
        P: FeedProducer + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = std::thread::Builder::new()
            .name(POLL_THREAD_NAME.into())
            .spawn(move || {
                let mut adapter = FeedAdapter::new();
                loop {
                    poll_once(&mut producer, &mut adapter, &cell);
                    match stop_rx.recv_timeout(POLL_INTERVAL) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::info!("[poll] stopped");
            })?;
        log::info!("[poll] polling every {:?}", POLL_INTERVAL);
        Ok(Self {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

fn poll_once<P: FeedProducer>(producer: &mut P, adapter: &mut FeedAdapter, cell: &FeedCell) {
    match producer.poll() {
        PollResult::Track(raw) => match adapter.ingest(&raw) {
            Ok(ingested) => cell.publish_sample(ingested.sample),
            Err(e) => log::warn!("[poll] discarding sample: {}", e),
        },
        PollResult::NoTrack => cell.publish_no_track(),
    }
}

impl PollHandle for FeedPoller {
    fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("[poll] poller thread panicked");
            }
        }
    }
}

impl Drop for FeedPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}
