use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AnalyticsError, Result};

/// Side length of the normalized position plane.
pub const PLANE_EXTENT: f32 = 100.0;

/// Object class label. The class vocabulary is configuration, not code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectClass(String);

impl ObjectClass {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectClass {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Train lifecycle label assigned to every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainStatus {
    #[default]
    Absent,
    Arriving,
    Stationary,
    Departing,
}

impl TrainStatus {
    pub const ALL: &'static [TrainStatus] = &[
        TrainStatus::Absent,
        TrainStatus::Arriving,
        TrainStatus::Stationary,
        TrainStatus::Departing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrainStatus::Absent => "absent",
            TrainStatus::Arriving => "arriving",
            TrainStatus::Stationary => "stationary",
            TrainStatus::Departing => "departing",
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, TrainStatus::Absent)
    }
}

impl FromStr for TrainStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TrainStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim())
            .ok_or(())
    }
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position in the normalized `[0,100] x [0,100]` plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    fn in_plane(&self) -> bool {
        (0.0..=PLANE_EXTENT).contains(&self.x) && (0.0..=PLANE_EXTENT).contains(&self.y)
    }
}

/// One observed object instance in one frame.
///
/// Optional attributes are kept as `Option` so that an absent field is never
/// confused with a `false` one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub frame_index: u32,
    pub object_class: ObjectClass,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Distance units per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_danger_zone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_protective_equipment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danger_action: Option<String>,
    /// Raw train status tag. Parsed (and rejected) by the train tracker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Detection {
    pub fn new(frame_index: u32, object_class: impl Into<ObjectClass>, confidence: f32) -> Self {
        Self {
            frame_index,
            object_class: object_class.into(),
            confidence,
            position: None,
            speed: None,
            in_danger_zone: None,
            has_protective_equipment: None,
            danger_action: None,
            status: None,
        }
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_danger_zone(mut self, in_zone: bool) -> Self {
        self.in_danger_zone = Some(in_zone);
        self
    }

    pub fn with_protective_equipment(mut self, equipped: bool) -> Self {
        self.has_protective_equipment = Some(equipped);
        self
    }

    pub fn with_danger_action(mut self, tag: impl Into<String>) -> Self {
        self.danger_action = Some(tag.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Seconds from the start of the video.
    pub fn timestamp(&self, frame_rate: f64) -> f64 {
        frame_timestamp(self.frame_index, frame_rate)
    }

    /// Checks attribute domains. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| AnalyticsError::InvalidDetection {
            frame_index: self.frame_index,
            reason,
        };
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(invalid(format!(
                "confidence {} outside 0..=1",
                self.confidence
            )));
        }
        if let Some(position) = self.position {
            if !position.in_plane() {
                return Err(invalid(format!(
                    "position ({}, {}) outside the normalized plane",
                    position.x, position.y
                )));
            }
        }
        if let Some(speed) = self.speed {
            if !speed.is_finite() || speed < 0.0 {
                return Err(invalid(format!("speed {} must be finite and >= 0", speed)));
            }
        }
        Ok(())
    }
}

pub fn frame_timestamp(frame_index: u32, frame_rate: f64) -> f64 {
    frame_index as f64 / frame_rate
}
