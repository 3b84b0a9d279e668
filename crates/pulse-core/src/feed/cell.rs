use super::{FeedSample, FeedUpdate};
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Single-slot hand-off between the polling cycle and the render tick.
///
/// Producers replace the whole update by reference; readers always observe
/// either the previous update or the new one in full. Only the newest update
/// is kept.
#[derive(Debug, Default)]
pub struct FeedCell {
    slot: ArcSwapOption<FeedUpdate>,
}

impl FeedCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, update: FeedUpdate) {
        self.slot.store(Some(Arc::new(update)));
    }

    pub fn publish_sample(&self, sample: FeedSample) {
        self.publish(FeedUpdate::Sample(sample));
    }

    pub fn publish_no_track(&self) {
        self.publish(FeedUpdate::NoTrack);
    }

    /// The latest update, if any producer has published yet.
    pub fn latest(&self) -> Option<Arc<FeedUpdate>> {
        self.slot.load_full()
    }

    pub fn clear(&self) {
        self.slot.store(None);
    }
}
