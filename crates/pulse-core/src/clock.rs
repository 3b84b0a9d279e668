//! Mapping from wall-clock time to track-position time.
//!
//! The feed reports the playback position only every few seconds, so between
//! samples the clock extrapolates linearly from its last anchor. Samples that
//! agree with the extrapolation leave the anchor alone; samples that disagree
//! (seek, pause, new track) snap it.

use crate::constants::RESYNC_TOLERANCE_SEC;
use instant::Instant;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Anchor {
    wall: f64,
    track: f64,
    running: bool,
}

/// How an observed sample was reconciled with the running clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resync {
    /// Sample agreed with the extrapolation within tolerance; `drift` is
    /// reported minus extrapolated track time.
    Continuous { drift: f64 },
    /// The anchor was replaced by the sample's track time.
    Reanchored,
}

#[derive(Clone, Debug)]
pub struct TransportClock {
    anchor: Option<Anchor>,
    tolerance: f64,
}

impl Default for TransportClock {
    fn default() -> Self {
        Self::new(RESYNC_TOLERANCE_SEC)
    }
}

impl TransportClock {
    pub fn new(tolerance_sec: f64) -> Self {
        Self {
            anchor: None,
            tolerance: tolerance_sec.abs(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.anchor.map_or(false, |a| a.running)
    }

    /// Current track time at wall time `now` (seconds). Zero before the first
    /// anchor.
    pub fn advance(&self, now: f64) -> f64 {
        match self.anchor {
            Some(a) if a.running => a.track + (now - a.wall).max(0.0),
            Some(a) => a.track,
            None => 0.0,
        }
    }

    /// Discard extrapolation and restart from `track_time` at `now`.
    pub fn reanchor(&mut self, now: f64, track_time: f64) {
        self.anchor = Some(Anchor {
            wall: now,
            track: track_time.max(0.0),
            running: true,
        });
    }

    /// Reconcile an accepted sample reporting `reported` track time.
    pub fn observe(&mut self, now: f64, reported: f64, track_changed: bool) -> Resync {
        let anchor = match self.anchor {
            Some(a) if a.running && !track_changed => a,
            _ => {
                self.reanchor(now, reported);
                return Resync::Reanchored;
            }
        };
        let extrapolated = anchor.track + (now - anchor.wall).max(0.0);
        let drift = reported - extrapolated;
        if drift.abs() > self.tolerance {
            log::debug!(
                "[clock] drift {:.3}s exceeds {:.3}s, re-anchoring at {:.3}",
                drift,
                self.tolerance,
                reported
            );
            self.reanchor(now, reported);
            Resync::Reanchored
        } else {
            Resync::Continuous { drift }
        }
    }

    /// Freeze track time at its value for `now`; the next [`observe`] snaps.
    ///
    /// [`observe`]: TransportClock::observe
    pub fn hold(&mut self, now: f64) {
        if let Some(a) = self.anchor {
            if a.running {
                self.anchor = Some(Anchor {
                    wall: now,
                    track: self.advance(now),
                    running: false,
                });
            }
        }
    }
}

/// Monotonic wall time in seconds since construction.
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    origin: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
