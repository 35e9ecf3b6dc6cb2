use anyhow::Result;
use std::collections::BTreeMap;

use crate::detect::result::Detection;
use crate::detect::source::DetectionSource;
use crate::error::AnalyticsError;

/// Replays a previously recorded detection list frame by frame.
///
/// Every frame index is checked against `0..total_frames` up front, so a
/// recording can never be silently truncated by the frame loop.
pub struct RecordedSource {
    frames: BTreeMap<u32, Vec<Detection>>,
}

impl RecordedSource {
    pub fn new(detections: Vec<Detection>, total_frames: u32) -> Result<Self, AnalyticsError> {
        let mut frames: BTreeMap<u32, Vec<Detection>> = BTreeMap::new();
        for det in detections {
            if det.frame_index >= total_frames {
                return Err(AnalyticsError::InvalidFrameIndex {
                    frame_index: det.frame_index,
                    valid: 0..total_frames,
                });
            }
            frames.entry(det.frame_index).or_default().push(det);
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl DetectionSource for RecordedSource {
    fn name(&self) -> &'static str {
        "recorded"
    }

    fn produce_detections(&mut self, frame_index: u32) -> Result<Vec<Detection>> {
        Ok(self.frames.get(&frame_index).cloned().unwrap_or_default())
    }
}
