//! Frame aggregation.
//!
//! Folds the detection stream into one `FrameSummary` per frame (empty frames
//! included as zero-count rows) and keeps the person/overview accumulators the
//! summarizer needs.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::batch::FrameCursor;
use crate::config::AnalysisConfig;
use crate::detect::{Detection, ObjectClass};
use crate::error::{AnalyticsError, Result};

/// Per-frame occupancy row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameSummary {
    pub frame_index: u32,
    pub timestamp: f64,
    /// Every configured class is present, zero when unseen.
    pub counts_by_class: BTreeMap<ObjectClass, u32>,
}

impl FrameSummary {
    fn empty(frame_index: u32, config: &AnalysisConfig) -> Self {
        Self {
            frame_index,
            timestamp: config.timestamp(frame_index),
            counts_by_class: config.classes.iter().map(|c| (c.clone(), 0)).collect(),
        }
    }

    pub fn count(&self, class: &ObjectClass) -> u32 {
        self.counts_by_class.get(class).copied().unwrap_or(0)
    }
}

/// Person-class accumulators.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PersonStats {
    pub detections: u64,
    /// Person detections that carry a protective-equipment flag.
    pub equipment_observed: u64,
    /// Person detections flagged as wearing protective equipment.
    pub equipment_worn: u64,
    /// Person detections that carry a speed.
    pub speed_observed: u64,
    pub speed_sum: f64,
}

impl PersonStats {
    fn record(&mut self, det: &Detection) {
        self.detections += 1;
        if let Some(worn) = det.has_protective_equipment {
            self.equipment_observed += 1;
            if worn {
                self.equipment_worn += 1;
            }
        }
        if let Some(speed) = det.speed {
            self.speed_observed += 1;
            self.speed_sum += speed;
        }
    }
}

/// Whole-stream accumulators across all classes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DetectionOverview {
    pub total_detections: u64,
    pub confidence_sum: f64,
    pub classes_seen: BTreeSet<ObjectClass>,
}

impl DetectionOverview {
    fn record(&mut self, det: &Detection) {
        self.total_detections += 1;
        self.confidence_sum += f64::from(det.confidence);
        if !self.classes_seen.contains(&det.object_class) {
            self.classes_seen.insert(det.object_class.clone());
        }
    }
}

/// Aggregator output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameAggregation {
    pub frames: Vec<FrameSummary>,
    pub persons: PersonStats,
    pub overview: DetectionOverview,
}

/// Incremental frame aggregator.
///
/// Feeding consecutive frame batches yields the same output as a single
/// `process(0..total_frames, ..)` call over the concatenated stream.
pub struct FrameAggregator<'a> {
    config: &'a AnalysisConfig,
    cursor: FrameCursor,
    frames: Vec<FrameSummary>,
    persons: PersonStats,
    overview: DetectionOverview,
}

impl<'a> FrameAggregator<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            cursor: FrameCursor::new(config.total_frames),
            frames: Vec::new(),
            persons: PersonStats::default(),
            overview: DetectionOverview::default(),
        }
    }

    /// Aggregates one batch of frames. The whole batch is rejected on error.
    pub fn process(&mut self, frames: Range<u32>, detections: &[Detection]) -> Result<()> {
        self.cursor.admit(&frames, detections)?;
        for det in detections {
            if !self.config.has_class(&det.object_class) {
                return Err(AnalyticsError::UnknownObjectClass {
                    frame_index: det.frame_index,
                    class: det.object_class.to_string(),
                });
            }
            det.validate()?;
        }

        let mut batch: Vec<FrameSummary> = frames
            .clone()
            .map(|frame_index| FrameSummary::empty(frame_index, self.config))
            .collect();
        for det in detections {
            let row = &mut batch[(det.frame_index - frames.start) as usize];
            if let Some(count) = row.counts_by_class.get_mut(&det.object_class) {
                *count += 1;
            }
            self.overview.record(det);
            if det.object_class == self.config.person_class {
                self.persons.record(det);
            }
        }

        log::debug!(
            "aggregated frames {}..{} ({} detections)",
            frames.start,
            frames.end,
            detections.len()
        );
        self.frames.extend(batch);
        self.cursor.advance(&frames);
        Ok(())
    }

    /// Summaries for every frame fed so far.
    pub fn finish(self) -> FrameAggregation {
        if !self.cursor.is_complete() {
            log::warn!(
                "frame aggregation stopped at frame {} of {}",
                self.cursor.next_frame(),
                self.config.total_frames
            );
        }
        FrameAggregation {
            frames: self.frames,
            persons: self.persons,
            overview: self.overview,
        }
    }
}

/// One-shot aggregation over a complete detection list.
pub fn aggregate_frames(
    config: &AnalysisConfig,
    detections: &[Detection],
) -> Result<FrameAggregation> {
    let mut aggregator = FrameAggregator::new(config);
    aggregator.process(0..config.total_frames, detections)?;
    Ok(aggregator.finish())
}
