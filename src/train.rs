//! Train presence tracking.
//!
//! This is a labeling function, not a validator: every frame gets exactly one
//! status taken from that frame's train detection (or `absent` without one).
//! Transition order between frames is not checked.

use serde::Serialize;
use std::ops::Range;

use crate::batch::FrameCursor;
use crate::config::AnalysisConfig;
use crate::detect::{Detection, TrainStatus};
use crate::error::{AnalyticsError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrainStatusRecord {
    pub frame_index: u32,
    pub timestamp: f64,
    pub status: TrainStatus,
}

/// Arrival of the train: the first frame whose status is not `absent`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrainArrival {
    pub frame_index: u32,
    pub timestamp: f64,
}

/// A status change between two consecutive frames.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrainTransition {
    pub frame_index: u32,
    pub timestamp: f64,
    pub from: TrainStatus,
    pub to: TrainStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainTimeline {
    pub records: Vec<TrainStatusRecord>,
    pub arrival: Option<TrainArrival>,
}

impl TrainTimeline {
    pub fn arrival_timestamp(&self) -> Option<f64> {
        self.arrival.map(|arrival| arrival.timestamp)
    }

    /// Status of the last labeled frame.
    pub fn final_status(&self) -> TrainStatus {
        self.records
            .last()
            .map(|record| record.status)
            .unwrap_or_default()
    }

    /// Frames whose status differs from the previous frame's.
    pub fn transitions(&self) -> Vec<TrainTransition> {
        self.records
            .windows(2)
            .filter(|pair| pair[0].status != pair[1].status)
            .map(|pair| TrainTransition {
                frame_index: pair[1].frame_index,
                timestamp: pair[1].timestamp,
                from: pair[0].status,
                to: pair[1].status,
            })
            .collect()
    }
}

pub struct TrainTracker<'a> {
    config: &'a AnalysisConfig,
    cursor: FrameCursor,
    records: Vec<TrainStatusRecord>,
    arrival: Option<TrainArrival>,
}

impl<'a> TrainTracker<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            cursor: FrameCursor::new(config.total_frames),
            records: Vec::new(),
            arrival: None,
        }
    }

    /// Labels one batch of frames. The whole batch is rejected on error.
    pub fn process(&mut self, frames: Range<u32>, detections: &[Detection]) -> Result<()> {
        self.cursor.admit(&frames, detections)?;

        let mut trains: Vec<Option<&Detection>> = vec![None; frames.len()];
        for det in detections.iter().filter(|d| self.config.is_train(&d.object_class)) {
            let slot = &mut trains[(det.frame_index - frames.start) as usize];
            if slot.is_some() {
                let count = detections
                    .iter()
                    .filter(|d| d.frame_index == det.frame_index)
                    .filter(|d| self.config.is_train(&d.object_class))
                    .count();
                return Err(AnalyticsError::AmbiguousTrainDetection {
                    frame_index: det.frame_index,
                    count,
                });
            }
            *slot = Some(det);
        }

        let mut batch = Vec::with_capacity(trains.len());
        for (frame_index, train) in frames.clone().zip(trains) {
            let status = match train {
                None => TrainStatus::Absent,
                Some(det) => parse_status(det)?,
            };
            batch.push(TrainStatusRecord {
                frame_index,
                timestamp: self.config.timestamp(frame_index),
                status,
            });
        }

        if self.arrival.is_none() {
            if let Some(first) = batch.iter().find(|record| record.status.is_present()) {
                log::info!(
                    "train arrival at frame {} ({:.2}s, {})",
                    first.frame_index,
                    first.timestamp,
                    first.status
                );
                self.arrival = Some(TrainArrival {
                    frame_index: first.frame_index,
                    timestamp: first.timestamp,
                });
            }
        }
        self.records.extend(batch);
        self.cursor.advance(&frames);
        Ok(())
    }

    pub fn finish(self) -> TrainTimeline {
        TrainTimeline {
            records: self.records,
            arrival: self.arrival,
        }
    }
}

fn parse_status(det: &Detection) -> Result<TrainStatus> {
    det.status
        .as_deref()
        .and_then(|tag| tag.parse().ok())
        .ok_or_else(|| AnalyticsError::InvalidTrainStatus {
            frame_index: det.frame_index,
            status: det.status.clone(),
        })
}

/// One-shot tracking over a complete detection list.
pub fn track_train(config: &AnalysisConfig, detections: &[Detection]) -> Result<TrainTimeline> {
    let mut tracker = TrainTracker::new(config);
    tracker.process(0..config.total_frames, detections)?;
    Ok(tracker.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(frame: u32, status: &str) -> Detection {
        Detection::new(frame, "train", 0.95).with_status(status)
    }

    #[test]
    fn no_train_means_absent_everywhere() {
        let config = AnalysisConfig::new(10).unwrap();
        let timeline = track_train(&config, &[Detection::new(4, "person", 0.9)]).unwrap();

        assert_eq!(timeline.records.len(), 10);
        assert!(timeline
            .records
            .iter()
            .all(|r| r.status == TrainStatus::Absent));
        assert_eq!(timeline.arrival, None);
        assert_eq!(timeline.arrival_timestamp(), None);
        assert_eq!(timeline.final_status(), TrainStatus::Absent);
    }

    #[test]
    fn huge_frame_count_grows_per_batch() {
        let config = AnalysisConfig::new(u32::MAX).unwrap();
        let mut tracker = TrainTracker::new(&config);
        tracker.process(0..2, &[train(1, "arriving")]).unwrap();

        let timeline = tracker.finish();
        assert_eq!(timeline.records.len(), 2);
        assert_eq!(timeline.arrival.unwrap().frame_index, 1);
    }

    #[test]
    fn arrival_is_first_present_frame() {
        let config = AnalysisConfig::new(100).unwrap();
        let timeline = track_train(&config, &[train(20, "arriving")]).unwrap();

        assert_eq!(timeline.arrival_timestamp(), Some(20.0 / 30.0));
        assert_eq!(timeline.arrival.unwrap().frame_index, 20);
        assert_eq!(timeline.records[19].status, TrainStatus::Absent);
        assert_eq!(timeline.records[20].status, TrainStatus::Arriving);
        assert_eq!(timeline.records[21].status, TrainStatus::Absent);
    }

    #[test]
    fn two_trains_in_one_frame_are_ambiguous() {
        let config = AnalysisConfig::new(5).unwrap();
        let err = track_train(&config, &[train(2, "arriving"), train(2, "stationary")])
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::AmbiguousTrainDetection {
                frame_index: 2,
                count: 2
            }
        ));
    }

    #[test]
    fn missing_or_unknown_status_is_rejected() {
        let config = AnalysisConfig::new(5).unwrap();
        let missing = track_train(&config, &[Detection::new(1, "train", 0.9)]).unwrap_err();
        assert!(matches!(
            missing,
            AnalyticsError::InvalidTrainStatus { status: None, .. }
        ));

        let unknown = track_train(&config, &[train(1, "boarding")]).unwrap_err();
        match unknown {
            AnalyticsError::InvalidTrainStatus { status, .. } => {
                assert_eq!(status.as_deref(), Some("boarding"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn labels_without_enforcing_transition_order() {
        let config = AnalysisConfig::new(4).unwrap();
        let timeline = track_train(
            &config,
            &[train(0, "departing"), train(1, "arriving"), train(3, "absent")],
        )
        .unwrap();
        let statuses: Vec<_> = timeline.records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                TrainStatus::Departing,
                TrainStatus::Arriving,
                TrainStatus::Absent,
                TrainStatus::Absent
            ]
        );
        assert_eq!(timeline.arrival.unwrap().frame_index, 0);
        let transitions = timeline.transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].frame_index, 1);
        assert_eq!(transitions[1].from, TrainStatus::Arriving);
        assert_eq!(transitions[1].to, TrainStatus::Absent);
    }

    #[test]
    fn disabled_train_class_ignores_train_like_detections() {
        let mut config = AnalysisConfig::new(3).unwrap();
        config.train_class = None;
        let timeline = track_train(&config, &[train(1, "arriving"), train(1, "arriving")])
            .unwrap();
        assert!(timeline.arrival.is_none());
    }

    #[test]
    fn batches_match_single_pass() {
        let config = AnalysisConfig::new(60).unwrap();
        let detections: Vec<Detection> = (25..45)
            .map(|frame| train(frame, if frame < 35 { "arriving" } else { "stationary" }))
            .collect();
        let whole = track_train(&config, &detections).unwrap();

        let mut tracker = TrainTracker::new(&config);
        for start in (0..60).step_by(20) {
            let frames = start..start + 20;
            let batch: Vec<Detection> = detections
                .iter()
                .filter(|d| frames.contains(&d.frame_index))
                .cloned()
                .collect();
            tracker.process(frames, &batch).unwrap();
        }
        assert_eq!(tracker.finish(), whole);
    }
}
