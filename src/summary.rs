//! Scalar safety rollups for one analysis run.
//!
//! Division by zero never happens here: every ratio has a fixed default for
//! the empty case. Compliance is the share of all person detections wearing
//! protective equipment (an absent flag counts as not worn) and defaults to
//! `1.0` with no person detections. Average speed defaults to `0.0`.

use serde::Serialize;

use crate::aggregate::{FrameAggregation, FrameSummary};
use crate::danger::DangerReport;
use crate::detect::{ObjectClass, TrainStatus};
use crate::train::TrainTimeline;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SafetySummary {
    pub max_concurrent_people: u32,
    /// Earliest frame reaching `max_concurrent_people`.
    pub max_concurrent_people_frame: u32,
    pub danger_event_count: usize,
    pub protective_equipment_compliance_rate: f64,
    pub average_person_speed: f64,
    pub train_arrival_timestamp: Option<f64>,
    pub train_arrival_frame: Option<u32>,
    pub final_train_status: TrainStatus,
    pub person_detections: u64,
    pub total_detections: u64,
    pub distinct_classes_seen: usize,
    pub mean_confidence: f64,
}

/// Peak per-frame count of `class`, ties resolved to the earliest frame.
pub fn peak_occupancy(frames: &[FrameSummary], class: &ObjectClass) -> (u32, u32) {
    frames
        .iter()
        .fold((0, 0), |(best, best_frame), frame| {
            let count = frame.count(class);
            if count > best {
                (count, frame.frame_index)
            } else {
                (best, best_frame)
            }
        })
}

pub fn summarize(
    person_class: &ObjectClass,
    aggregation: &FrameAggregation,
    train: &TrainTimeline,
    dangers: &DangerReport,
) -> SafetySummary {
    let (max_concurrent_people, max_concurrent_people_frame) =
        peak_occupancy(&aggregation.frames, person_class);
    let persons = &aggregation.persons;
    let overview = &aggregation.overview;

    let protective_equipment_compliance_rate = if persons.detections == 0 {
        1.0
    } else {
        persons.equipment_worn as f64 / persons.detections as f64
    };
    let average_person_speed = if persons.speed_observed == 0 {
        0.0
    } else {
        persons.speed_sum / persons.speed_observed as f64
    };
    let mean_confidence = if overview.total_detections == 0 {
        0.0
    } else {
        overview.confidence_sum / overview.total_detections as f64
    };

    SafetySummary {
        max_concurrent_people,
        max_concurrent_people_frame,
        danger_event_count: dangers.events.len(),
        protective_equipment_compliance_rate,
        average_person_speed,
        train_arrival_timestamp: train.arrival_timestamp(),
        train_arrival_frame: train.arrival.map(|arrival| arrival.frame_index),
        final_train_status: train.final_status(),
        person_detections: persons.detections,
        total_detections: overview.total_detections,
        distinct_classes_seen: overview.classes_seen.len(),
        mean_confidence,
    }
}
