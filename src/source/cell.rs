//! Published-frame handoff between a source and the scheduler.

use super::Frame;
use std::sync::{Mutex, PoisonError};

/// Single-writer, single-reader slot holding the latest published frame.
///
/// The writer replaces the slot only after a frame is fully assembled, and
/// the reader clones the cheap handle out, so the reader only ever sees a
/// complete image. The mutex guards nothing but the O(1) swap itself; pixel
/// writes happen outside it, on buffers the reader cannot be holding.
#[derive(Debug, Default)]
pub struct FrameCell {
    slot: Mutex<Option<Frame>>,
}

impl FrameCell {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a newly completed frame, replacing the previous one.
    pub fn publish(&self, frame: Frame) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(frame);
    }

    /// Returns a handle to the most recently published frame, if any.
    pub fn latest(&self) -> Option<Frame> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clears the published frame.
    pub fn clear(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}
