use anyhow::{anyhow, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::AnalysisConfig;
use crate::detect::result::{Detection, ObjectClass, TrainStatus, PLANE_EXTENT};
use crate::detect::source::DetectionSource;
use crate::error::AnalyticsError;

/// Free-form danger tags emitted by the platform profile, with sampling weights.
const PLATFORM_DANGER_ACTIONS: [(&str, f64); 5] = [
    ("near-platform-edge", 0.85),
    ("on-tracks", 0.05),
    ("fast-movement-near-edge", 0.05),
    ("fall", 0.03),
    ("pushing", 0.02),
];
const PLATFORM_MAX_PEOPLE: u32 = 8;
const PLATFORM_DANGER_ACTION_P: f64 = 0.2;

const ARRIVING_FRAMES: (u32, u32) = (20, 40);
const STATIONARY_FRAMES: (u32, u32) = (41, 70);
const DEPARTING_FRAMES: (u32, u32) = (71, 90);

/// What the simulated detector pretends to see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationProfile {
    /// 1-3 objects per frame, classes and confidence only.
    Basic,
    /// Basic plus speed, danger-zone and protective-equipment attributes.
    Workplace,
    /// 0-8 people on a platform with danger tags, plus a scripted train.
    #[default]
    Platform,
}

impl SimulationProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationProfile::Basic => "basic",
            SimulationProfile::Workplace => "workplace",
            SimulationProfile::Platform => "platform",
        }
    }
}

impl FromStr for SimulationProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(SimulationProfile::Basic),
            "workplace" => Ok(SimulationProfile::Workplace),
            "platform" => Ok(SimulationProfile::Platform),
            other => Err(anyhow!(
                "unknown simulation profile '{}' (expected basic, workplace or platform)",
                other
            )),
        }
    }
}

/// Pseudo-random detector reseeded with the frame index on every call.
///
/// Output depends only on the frame index and the profile, never on which
/// frames were requested earlier.
pub struct SimulatedSource {
    profile: SimulationProfile,
    /// Classes the basic/workplace profiles draw from (train class excluded).
    roaming_classes: Vec<ObjectClass>,
    person_class: ObjectClass,
    train_class: Option<ObjectClass>,
    danger_actions: WeightedIndex<f64>,
}

impl SimulatedSource {
    pub fn new(
        profile: SimulationProfile,
        config: &AnalysisConfig,
    ) -> Result<Self, AnalyticsError> {
        let roaming_classes: Vec<ObjectClass> = config
            .classes
            .iter()
            .filter(|class| Some(*class) != config.train_class.as_ref())
            .cloned()
            .collect();
        if roaming_classes.is_empty() {
            return Err(AnalyticsError::config(
                "simulated source needs at least one non-train class",
            ));
        }
        let danger_actions =
            WeightedIndex::new(PLATFORM_DANGER_ACTIONS.iter().map(|(_, weight)| *weight))
                .map_err(|e| AnalyticsError::config(format!("danger action weights: {}", e)))?;
        Ok(Self {
            profile,
            roaming_classes,
            person_class: config.person_class.clone(),
            train_class: config.train_class.clone(),
            danger_actions,
        })
    }

    pub fn profile(&self) -> SimulationProfile {
        self.profile
    }

    fn roaming(&self, rng: &mut StdRng, frame_index: u32, with_safety: bool) -> Vec<Detection> {
        let count = rng.gen_range(1..=3);
        (0..count)
            .map(|_| {
                let class = &self.roaming_classes[rng.gen_range(0..self.roaming_classes.len())];
                let det = Detection::new(frame_index, class.clone(), rng.gen_range(0.6..0.95));
                if !with_safety {
                    return det;
                }
                det.with_speed(rng.gen_range(0.5..5.0))
                    .with_danger_zone(rng.gen_bool(0.2))
                    .with_protective_equipment(rng.gen_bool(0.7))
            })
            .collect()
    }

    fn platform(&self, rng: &mut StdRng, frame_index: u32) -> Vec<Detection> {
        let people = rng.gen_range(0..=PLATFORM_MAX_PEOPLE);
        let mut detections: Vec<Detection> = (0..people)
            .map(|_| {
                let mut det =
                    Detection::new(frame_index, self.person_class.clone(), rng.gen_range(0.7..0.98))
                        .with_position(
                            rng.gen_range(0.0..PLANE_EXTENT),
                            rng.gen_range(0.0..PLANE_EXTENT),
                        )
                        .with_danger_zone(rng.gen_bool(0.15));
                if rng.gen_bool(PLATFORM_DANGER_ACTION_P) {
                    let (tag, _) = PLATFORM_DANGER_ACTIONS[self.danger_actions.sample(rng)];
                    det = det.with_danger_action(tag);
                }
                det
            })
            .collect();

        if let (Some(train_class), Some(status)) = (&self.train_class, scripted_train(frame_index))
        {
            detections.push(
                Detection::new(frame_index, train_class.clone(), rng.gen_range(0.9..0.99))
                    .with_status(status.as_str()),
            );
        }
        detections
    }
}

fn scripted_train(frame_index: u32) -> Option<TrainStatus> {
    let within = |(start, end): (u32, u32)| (start..=end).contains(&frame_index);
    if within(ARRIVING_FRAMES) {
        Some(TrainStatus::Arriving)
    } else if within(STATIONARY_FRAMES) {
        Some(TrainStatus::Stationary)
    } else if within(DEPARTING_FRAMES) {
        Some(TrainStatus::Departing)
    } else {
        None
    }
}

impl DetectionSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn produce_detections(&mut self, frame_index: u32) -> Result<Vec<Detection>> {
        let mut rng = StdRng::seed_from_u64(u64::from(frame_index));
        let detections = match self.profile {
            SimulationProfile::Basic => self.roaming(&mut rng, frame_index, false),
            SimulationProfile::Workplace => self.roaming(&mut rng, frame_index, true),
            SimulationProfile::Platform => self.platform(&mut rng, frame_index),
        };
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(profile: SimulationProfile) -> SimulatedSource {
        let config = AnalysisConfig::new(100).unwrap();
        SimulatedSource::new(profile, &config).unwrap()
    }

    #[test]
    fn same_frame_same_detections_regardless_of_order() {
        let mut forward = source(SimulationProfile::Workplace);
        let mut backward = source(SimulationProfile::Workplace);

        let forward_frames: Vec<_> = (0..10)
            .map(|i| forward.produce_detections(i).unwrap())
            .collect();
        let mut backward_frames: Vec<_> = (0..10)
            .rev()
            .map(|i| backward.produce_detections(i).unwrap())
            .collect();
        backward_frames.reverse();

        assert_eq!(forward_frames, backward_frames);
    }

    #[test]
    fn roaming_profiles_emit_one_to_three_non_train_objects() {
        let mut basic = source(SimulationProfile::Basic);
        for frame in 0..50 {
            let dets = basic.produce_detections(frame).unwrap();
            assert!((1..=3).contains(&dets.len()));
            for det in dets {
                assert_ne!(det.object_class.as_str(), "train");
                assert!(det.speed.is_none());
                assert!(det.validate().is_ok());
            }
        }

        let mut workplace = source(SimulationProfile::Workplace);
        let dets = workplace.produce_detections(7).unwrap();
        assert!(dets.iter().all(|d| d.speed.is_some()
            && d.in_danger_zone.is_some()
            && d.has_protective_equipment.is_some()));
    }

    #[test]
    fn platform_train_follows_script() {
        let mut platform = source(SimulationProfile::Platform);
        let train_status = |dets: Vec<Detection>| {
            let trains: Vec<_> = dets
                .into_iter()
                .filter(|d| d.object_class.as_str() == "train")
                .collect();
            assert!(trains.len() <= 1);
            trains.into_iter().next().and_then(|d| d.status)
        };

        assert_eq!(train_status(platform.produce_detections(19).unwrap()), None);
        assert_eq!(
            train_status(platform.produce_detections(20).unwrap()).as_deref(),
            Some("arriving")
        );
        assert_eq!(
            train_status(platform.produce_detections(55).unwrap()).as_deref(),
            Some("stationary")
        );
        assert_eq!(
            train_status(platform.produce_detections(90).unwrap()).as_deref(),
            Some("departing")
        );
        assert_eq!(train_status(platform.produce_detections(91).unwrap()), None);
    }

    #[test]
    fn profile_parses_case_insensitively() {
        assert_eq!(
            "Platform".parse::<SimulationProfile>().unwrap(),
            SimulationProfile::Platform
        );
        assert!("factory".parse::<SimulationProfile>().is_err());
    }
}
