//! Frame batch bookkeeping shared by the incremental components.
//!
//! Each component may be fed consecutive frame ranges (`0..25`, `25..50`, ...)
//! instead of the whole video at once. The cursor enforces that ranges are
//! contiguous and increasing, and that every detection in a batch belongs to
//! that batch. A rejected batch leaves the component untouched.

use std::ops::Range;

use crate::detect::Detection;
use crate::error::{AnalyticsError, Result};

#[derive(Clone, Debug)]
pub(crate) struct FrameCursor {
    next: u32,
    total: u32,
}

impl FrameCursor {
    pub(crate) fn new(total: u32) -> Self {
        Self { next: 0, total }
    }

    /// Checks a batch without consuming it.
    pub(crate) fn admit(&self, frames: &Range<u32>, detections: &[Detection]) -> Result<()> {
        if frames.start != self.next || frames.end < frames.start {
            return Err(AnalyticsError::FrameOutOfOrder {
                expected: self.next,
                found: frames.clone(),
            });
        }
        if frames.end > self.total {
            return Err(AnalyticsError::InvalidFrameIndex {
                frame_index: frames.end - 1,
                valid: 0..self.total,
            });
        }
        if let Some(stray) = detections
            .iter()
            .find(|det| !frames.contains(&det.frame_index))
        {
            let valid = if stray.frame_index >= self.total {
                0..self.total
            } else {
                frames.clone()
            };
            return Err(AnalyticsError::InvalidFrameIndex {
                frame_index: stray.frame_index,
                valid,
            });
        }
        Ok(())
    }

    pub(crate) fn advance(&mut self, frames: &Range<u32>) {
        self.next = frames.end;
    }

    pub(crate) fn next_frame(&self) -> u32 {
        self.next
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.next == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_must_be_contiguous() {
        let mut cursor = FrameCursor::new(10);
        assert!(cursor.admit(&(0..4), &[]).is_ok());
        cursor.advance(&(0..4));
        assert_eq!(cursor.next_frame(), 4);

        assert!(matches!(
            cursor.admit(&(5..8), &[]),
            Err(AnalyticsError::FrameOutOfOrder { expected: 4, .. })
        ));
        assert!(matches!(
            cursor.admit(&(0..4), &[]),
            Err(AnalyticsError::FrameOutOfOrder { .. })
        ));
        // Empty batch at the cursor is a no-op.
        assert!(cursor.admit(&(4..4), &[]).is_ok());
    }

    #[test]
    fn detections_must_belong_to_the_batch() {
        let cursor = FrameCursor::new(10);
        let inside = [Detection::new(3, "person", 0.9)];
        assert!(cursor.admit(&(0..5), &inside).is_ok());

        let later = [Detection::new(7, "person", 0.9)];
        match cursor.admit(&(0..5), &later) {
            Err(AnalyticsError::InvalidFrameIndex { frame_index, valid }) => {
                assert_eq!(frame_index, 7);
                assert_eq!(valid, 0..5);
            }
            other => panic!("unexpected {:?}", other),
        }

        let beyond = [Detection::new(10, "person", 0.9)];
        match cursor.admit(&(0..5), &beyond) {
            Err(AnalyticsError::InvalidFrameIndex { valid, .. }) => assert_eq!(valid, 0..10),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn batch_cannot_run_past_total() {
        let cursor = FrameCursor::new(3);
        assert!(matches!(
            cursor.admit(&(0..4), &[]),
            Err(AnalyticsError::InvalidFrameIndex { frame_index: 3, .. })
        ));
    }
}
