use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::aggregate::{FrameAggregation, FrameSummary};
use crate::config::AnalysisConfig;
use crate::danger::{DangerEvent, DangerKindCount, DangerReport, DangerTimelineEntry};
use crate::summary::{summarize, SafetySummary};
use crate::train::{TrainStatusRecord, TrainTimeline, TrainTransition};

/// Everything one analysis run produces, as read-only tables.
///
/// This is the hand-off to presentation: each `Vec` is a table of records with
/// named fields, and `summary` is the headline row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub config: AnalysisConfig,
    pub frames: Vec<FrameSummary>,
    pub train_statuses: Vec<TrainStatusRecord>,
    pub train_transitions: Vec<TrainTransition>,
    pub danger_events: Vec<DangerEvent>,
    pub danger_timeline: Vec<DangerTimelineEntry>,
    pub danger_by_kind: Vec<DangerKindCount>,
    pub summary: SafetySummary,
}

impl AnalysisReport {
    pub(crate) fn assemble(
        config: &AnalysisConfig,
        aggregation: FrameAggregation,
        train: TrainTimeline,
        dangers: DangerReport,
    ) -> Self {
        let summary = summarize(&config.person_class, &aggregation, &train, &dangers);
        let train_transitions = train.transitions();
        Self {
            config: config.clone(),
            frames: aggregation.frames,
            train_statuses: train.records,
            train_transitions,
            danger_events: dangers.events,
            danger_timeline: dangers.timeline,
            danger_by_kind: dangers.by_kind,
            summary,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Compact canonical encoding used for the digest.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Hex SHA-256 of the canonical encoding. Identical inputs give identical
    /// digests.
    pub fn digest(&self) -> serde_json::Result<String> {
        let bytes = self.to_json_bytes()?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
