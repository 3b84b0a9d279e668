use crate::feed::{Beat, FeedSample, Section};

/// A timed event occupying `[start, start + duration)` on the track.
pub trait Interval {
    fn start(&self) -> f64;
    fn duration(&self) -> f64;

    fn contains(&self, t: f64) -> bool {
        self.start() <= t && t < self.start() + self.duration()
    }
}

impl Interval for Beat {
    fn start(&self) -> f64 {
        self.start
    }
    fn duration(&self) -> f64 {
        self.duration
    }
}

impl Interval for Section {
    fn start(&self) -> f64 {
        self.start
    }
    fn duration(&self) -> f64 {
        self.duration
    }
}

/// First interval, in ascending start order, that contains `t`.
///
/// `items` must be sorted by start. Overlapping entries resolve to the
/// earliest one; a gap yields `None`.
pub fn active_at<T: Interval>(items: &[T], t: f64) -> Option<&T> {
    if t.is_nan() {
        return None;
    }
    items
        .iter()
        .take_while(|item| item.start() <= t)
        .find(|item| item.contains(t))
}

pub fn active_beat(beats: &[Beat], t: f64) -> Option<&Beat> {
    active_at(beats, t)
}

pub fn active_section(sections: &[Section], t: f64) -> Option<&Section> {
    active_at(sections, t)
}

/// The beat and section in effect for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActiveEvents {
    pub beat: Option<Beat>,
    pub section: Option<Section>,
}

impl ActiveEvents {
    pub fn lookup(sample: &FeedSample, t: f64) -> Self {
        Self {
            beat: active_beat(&sample.beats, t).copied(),
            section: active_section(&sample.sections, t).copied(),
        }
    }
}
