use anyhow::Result;

use crate::detect::result::Detection;

/// Detection source trait.
///
/// The analytics core depends on this capability but never implements real
/// detection. Implementations MUST be deterministic per frame: the same
/// `frame_index` yields the same detections no matter how many frames were
/// requested before it.
///
/// The pipeline calls `produce_detections` once per frame, from `0` to
/// `total_frames - 1`, in increasing order.
pub trait DetectionSource: Send {
    /// Source identifier.
    fn name(&self) -> &'static str;

    /// Detections observed in `frame_index`. An empty vector is a valid frame.
    fn produce_detections(&mut self, frame_index: u32) -> Result<Vec<Detection>>;
}
