//! Danger event extraction.
//!
//! Every detection is inspected independently. One detection can raise several
//! events (a speeding person without protective equipment raises two) and
//! events are never deduplicated across kinds. An attribute that is absent
//! never raises anything: absence is not `false`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::batch::FrameCursor;
use crate::config::{AnalysisConfig, DangerSignals};
use crate::detect::Detection;
use crate::error::Result;

/// Danger event kind. Explicit action tags are carried through verbatim.
///
/// Serialized as `{"kind": "speed-exceeded"}` for attribute signals and
/// `{"kind": "action", "tag": "..."}` for action tags, so a tag that spells
/// an attribute signal stays distinguishable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "tag", rename_all = "kebab-case")]
pub enum DangerKind {
    SpeedExceeded,
    MissingProtectiveEquipment,
    InDangerZone,
    Action(String),
}

impl DangerKind {
    /// Signal name, or the raw tag for actions.
    pub fn as_str(&self) -> &str {
        match self {
            DangerKind::SpeedExceeded => "speed-exceeded",
            DangerKind::MissingProtectiveEquipment => "missing-protective-equipment",
            DangerKind::InDangerZone => "in-danger-zone",
            DangerKind::Action(tag) => tag.as_str(),
        }
    }
}

impl fmt::Display for DangerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DangerKind::Action(tag) => write!(f, "action:{}", tag),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DangerEvent {
    pub frame_index: u32,
    pub timestamp: f64,
    #[serde(flatten)]
    pub kind: DangerKind,
}

/// Number of events raised in one frame. Only frames with events appear.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DangerTimelineEntry {
    pub frame_index: u32,
    pub timestamp: f64,
    pub event_count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DangerKindCount {
    #[serde(flatten)]
    pub kind: DangerKind,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DangerReport {
    pub events: Vec<DangerEvent>,
    pub timeline: Vec<DangerTimelineEntry>,
    /// Ordered by first appearance in `events`.
    pub by_kind: Vec<DangerKindCount>,
}

impl DangerReport {
    fn from_events(events: Vec<DangerEvent>) -> Self {
        let mut per_frame: BTreeMap<u32, DangerTimelineEntry> = BTreeMap::new();
        let mut by_kind: Vec<DangerKindCount> = Vec::new();
        for event in &events {
            per_frame
                .entry(event.frame_index)
                .or_insert(DangerTimelineEntry {
                    frame_index: event.frame_index,
                    timestamp: event.timestamp,
                    event_count: 0,
                })
                .event_count += 1;
            match by_kind.iter_mut().find(|entry| entry.kind == event.kind) {
                Some(entry) => entry.count += 1,
                None => by_kind.push(DangerKindCount {
                    kind: event.kind.clone(),
                    count: 1,
                }),
            }
        }
        Self {
            events,
            timeline: per_frame.into_values().collect(),
            by_kind,
        }
    }
}

/// Danger kinds raised by one detection, in emission order.
pub fn detection_dangers(
    det: &Detection,
    speed_threshold: f64,
    signals: &DangerSignals,
) -> Vec<DangerKind> {
    let mut kinds = Vec::new();
    if signals.speed && det.speed.is_some_and(|speed| speed > speed_threshold) {
        kinds.push(DangerKind::SpeedExceeded);
    }
    if signals.protective_equipment && det.has_protective_equipment == Some(false) {
        kinds.push(DangerKind::MissingProtectiveEquipment);
    }
    if signals.danger_zone && det.in_danger_zone == Some(true) {
        kinds.push(DangerKind::InDangerZone);
    }
    if signals.danger_action {
        if let Some(tag) = &det.danger_action {
            kinds.push(DangerKind::Action(tag.clone()));
        }
    }
    kinds
}

pub struct DangerExtractor<'a> {
    config: &'a AnalysisConfig,
    cursor: FrameCursor,
    events: Vec<DangerEvent>,
}

impl<'a> DangerExtractor<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            cursor: FrameCursor::new(config.total_frames),
            events: Vec::new(),
        }
    }

    /// Extracts events from one batch, preserving detection order.
    pub fn process(&mut self, frames: Range<u32>, detections: &[Detection]) -> Result<()> {
        self.cursor.admit(&frames, detections)?;
        let before = self.events.len();
        for det in detections {
            let timestamp = self.config.timestamp(det.frame_index);
            self.events.extend(
                detection_dangers(det, self.config.speed_threshold, &self.config.danger_signals)
                    .into_iter()
                    .map(|kind| DangerEvent {
                        frame_index: det.frame_index,
                        timestamp,
                        kind,
                    }),
            );
        }
        let raised = self.events.len() - before;
        if raised > 0 {
            log::debug!(
                "{} danger events in frames {}..{}",
                raised,
                frames.start,
                frames.end
            );
        }
        self.cursor.advance(&frames);
        Ok(())
    }

    pub fn finish(self) -> DangerReport {
        DangerReport::from_events(self.events)
    }
}

/// One-shot extraction over a complete detection list.
pub fn extract_dangers(config: &AnalysisConfig, detections: &[Detection]) -> Result<DangerReport> {
    let mut extractor = DangerExtractor::new(config);
    extractor.process(0..config.total_frames, detections)?;
    Ok(extractor.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speeding_unprotected_person_in_zone_raises_three_in_order() {
        let config = AnalysisConfig::new(1).unwrap();
        let det = Detection::new(0, "person", 0.9)
            .with_speed(5.0)
            .with_protective_equipment(false)
            .with_danger_zone(true);

        let report = extract_dangers(&config, &[det]).unwrap();
        let kinds: Vec<_> = report.events.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                DangerKind::SpeedExceeded,
                DangerKind::MissingProtectiveEquipment,
                DangerKind::InDangerZone,
            ]
        );
    }

    #[test]
    fn absent_fields_raise_nothing() {
        let config = AnalysisConfig::new(1).unwrap();
        let report = extract_dangers(&config, &[Detection::new(0, "person", 0.9)]).unwrap();
        assert!(report.events.is_empty());
        assert!(report.timeline.is_empty());
    }

    #[test]
    fn threshold_is_strict_and_safe_values_are_quiet() {
        let signals = DangerSignals::default();
        let at_threshold = Detection::new(0, "person", 0.9)
            .with_speed(3.0)
            .with_protective_equipment(true)
            .with_danger_zone(false);
        assert!(detection_dangers(&at_threshold, 3.0, &signals).is_empty());
    }

    #[test]
    fn action_tags_pass_through_verbatim() {
        let config = AnalysisConfig::new(3).unwrap();
        let detections = vec![
            Detection::new(1, "person", 0.9).with_danger_action("on-tracks"),
            Detection::new(1, "person", 0.9)
                .with_danger_zone(true)
                .with_danger_action("падение"),
        ];
        let report = extract_dangers(&config, &detections).unwrap();
        let kinds: Vec<&str> = report.events.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["on-tracks", "in-danger-zone", "падение"]);

        let json = serde_json::to_value(&report.events[0]).unwrap();
        assert_eq!(json["kind"], "action");
        assert_eq!(json["tag"], "on-tracks");
        let json = serde_json::to_value(&report.events[1]).unwrap();
        assert_eq!(json["kind"], "in-danger-zone");
        assert!(json.get("tag").is_none());
    }

    #[test]
    fn action_tag_named_like_a_signal_stays_separate() {
        let config = AnalysisConfig::new(1).unwrap();
        let det = Detection::new(0, "person", 0.9)
            .with_speed(5.0)
            .with_danger_action("speed-exceeded");
        let report = extract_dangers(&config, &[det]).unwrap();

        assert_eq!(
            report.by_kind,
            vec![
                DangerKindCount {
                    kind: DangerKind::SpeedExceeded,
                    count: 1
                },
                DangerKindCount {
                    kind: DangerKind::Action("speed-exceeded".to_string()),
                    count: 1
                },
            ]
        );
        let json = serde_json::to_value(&report.by_kind).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"kind": "speed-exceeded", "count": 1},
                {"kind": "action", "tag": "speed-exceeded", "count": 1},
            ])
        );
        assert_ne!(report.by_kind[0].kind.to_string(), report.by_kind[1].kind.to_string());
    }

    #[test]
    fn disabled_signals_are_ignored() {
        let signals = DangerSignals {
            speed: false,
            protective_equipment: true,
            danger_zone: false,
            danger_action: false,
        };
        let det = Detection::new(0, "person", 0.9)
            .with_speed(9.0)
            .with_protective_equipment(false)
            .with_danger_zone(true)
            .with_danger_action("fall");
        assert_eq!(
            detection_dangers(&det, 3.0, &signals),
            vec![DangerKind::MissingProtectiveEquipment]
        );
    }

    #[test]
    fn timeline_and_kind_counts() {
        let config = AnalysisConfig::new(10).unwrap();
        let detections = vec![
            Detection::new(2, "person", 0.9).with_danger_zone(true),
            Detection::new(2, "vehicle", 0.9).with_speed(4.0),
            Detection::new(7, "person", 0.9).with_danger_zone(true),
        ];
        let report = extract_dangers(&config, &detections).unwrap();

        assert_eq!(report.timeline.len(), 2);
        assert_eq!(report.timeline[0].frame_index, 2);
        assert_eq!(report.timeline[0].event_count, 2);
        assert_eq!(report.timeline[1].frame_index, 7);
        assert_eq!(report.timeline[1].timestamp, 7.0 / 30.0);

        assert_eq!(
            report.by_kind,
            vec![
                DangerKindCount {
                    kind: DangerKind::InDangerZone,
                    count: 2
                },
                DangerKindCount {
                    kind: DangerKind::SpeedExceeded,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn batches_match_single_pass() {
        let config = AnalysisConfig::new(4).unwrap();
        let detections = vec![
            Detection::new(0, "person", 0.9).with_speed(4.5),
            Detection::new(1, "person", 0.9).with_protective_equipment(false),
            Detection::new(3, "person", 0.9).with_danger_action("fall"),
        ];
        let whole = extract_dangers(&config, &detections).unwrap();

        let mut extractor = DangerExtractor::new(&config);
        extractor.process(0..1, &detections[..1]).unwrap();
        extractor.process(1..3, &detections[1..2]).unwrap();
        extractor.process(3..4, &detections[2..]).unwrap();
        assert_eq!(extractor.finish(), whole);
    }
}
