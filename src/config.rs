use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use crate::detect::{frame_timestamp, ObjectClass};
use crate::error::AnalyticsError;

const DEFAULT_TOTAL_FRAMES: u32 = 100;
const DEFAULT_FRAME_RATE: f64 = 30.0;
const DEFAULT_SPEED_THRESHOLD: f64 = 3.0;
const DEFAULT_CLASSES: [&str; 4] = ["person", "train", "vehicle", "equipment"];
const DEFAULT_PERSON_CLASS: &str = "person";
const DEFAULT_TRAIN_CLASS: &str = "train";
const DEFAULT_BATCH_FRAMES: u32 = 25;

#[derive(Debug, Deserialize, Default)]
struct AnalysisConfigFile {
    total_frames: Option<u32>,
    frame_rate: Option<f64>,
    speed_threshold: Option<f64>,
    classes: Option<Vec<String>>,
    person_class: Option<String>,
    train: Option<TrainConfigFile>,
    danger_signals: Option<DangerSignalsFile>,
    batch_frames: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct TrainConfigFile {
    class: Option<String>,
    enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct DangerSignalsFile {
    speed: Option<bool>,
    protective_equipment: Option<bool>,
    danger_zone: Option<bool>,
    danger_action: Option<bool>,
}

/// Which detection attributes are treated as danger signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerSignals {
    pub speed: bool,
    pub protective_equipment: bool,
    pub danger_zone: bool,
    pub danger_action: bool,
}

impl Default for DangerSignals {
    fn default() -> Self {
        Self {
            speed: true,
            protective_equipment: true,
            danger_zone: true,
            danger_action: true,
        }
    }
}

/// Request-scoped configuration passed into the analytics core.
///
/// Display-only settings (confidence filter, analysis cadence) are not part of
/// this struct: they change what is shown, not what is computed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub total_frames: u32,
    /// Frames per second used to derive timestamps.
    pub frame_rate: f64,
    /// Speeds strictly above this raise a `speed-exceeded` event.
    pub speed_threshold: f64,
    pub classes: Vec<ObjectClass>,
    pub person_class: ObjectClass,
    /// `None` disables train tracking; every frame is then `absent`.
    pub train_class: Option<ObjectClass>,
    pub danger_signals: DangerSignals,
    /// Frames per incremental batch when driving a detection source.
    pub batch_frames: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            total_frames: DEFAULT_TOTAL_FRAMES,
            frame_rate: DEFAULT_FRAME_RATE,
            speed_threshold: DEFAULT_SPEED_THRESHOLD,
            classes: DEFAULT_CLASSES.iter().map(|c| ObjectClass::from(*c)).collect(),
            person_class: ObjectClass::from(DEFAULT_PERSON_CLASS),
            train_class: Some(ObjectClass::from(DEFAULT_TRAIN_CLASS)),
            danger_signals: DangerSignals::default(),
            batch_frames: DEFAULT_BATCH_FRAMES,
        }
    }
}

impl AnalysisConfig {
    /// Default configuration for `total_frames` frames.
    pub fn new(total_frames: u32) -> Result<Self, AnalyticsError> {
        let cfg = Self {
            total_frames,
            ..Self::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Replaces the class vocabulary.
    pub fn with_classes<I, C>(mut self, classes: I) -> Result<Self, AnalyticsError>
    where
        I: IntoIterator<Item = C>,
        C: Into<ObjectClass>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self.validate()?;
        Ok(self)
    }

    /// Loads from the file named by `SAFETY_CONFIG` (if any), then applies
    /// `SAFETY_*` environment overrides, then validates.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SAFETY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads a config file without consulting the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AnalysisConfigFile) -> Self {
        let defaults = Self::default();
        let classes = file
            .classes
            .map(|classes| classes.into_iter().map(ObjectClass::new).collect())
            .unwrap_or(defaults.classes);
        let train_class = match file.train {
            Some(TrainConfigFile {
                enabled: Some(false),
                ..
            }) => None,
            Some(TrainConfigFile {
                class: Some(class), ..
            }) => Some(ObjectClass::new(class)),
            _ => defaults.train_class,
        };
        let signals = file.danger_signals.unwrap_or_default();
        let danger_signals = DangerSignals {
            speed: signals.speed.unwrap_or(true),
            protective_equipment: signals.protective_equipment.unwrap_or(true),
            danger_zone: signals.danger_zone.unwrap_or(true),
            danger_action: signals.danger_action.unwrap_or(true),
        };
        Self {
            total_frames: file.total_frames.unwrap_or(defaults.total_frames),
            frame_rate: file.frame_rate.unwrap_or(defaults.frame_rate),
            speed_threshold: file.speed_threshold.unwrap_or(defaults.speed_threshold),
            classes,
            person_class: file
                .person_class
                .map(ObjectClass::new)
                .unwrap_or(defaults.person_class),
            train_class,
            danger_signals,
            batch_frames: file.batch_frames.unwrap_or(defaults.batch_frames),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(frames) = std::env::var("SAFETY_TOTAL_FRAMES") {
            self.total_frames = frames
                .trim()
                .parse()
                .map_err(|_| anyhow!("SAFETY_TOTAL_FRAMES must be a non-negative integer"))?;
        }
        if let Ok(rate) = std::env::var("SAFETY_FRAME_RATE") {
            self.frame_rate = rate
                .trim()
                .parse()
                .map_err(|_| anyhow!("SAFETY_FRAME_RATE must be a number"))?;
        }
        if let Ok(threshold) = std::env::var("SAFETY_SPEED_THRESHOLD") {
            self.speed_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("SAFETY_SPEED_THRESHOLD must be a number"))?;
        }
        if let Ok(classes) = std::env::var("SAFETY_CLASSES") {
            let parsed = split_csv(&classes);
            if !parsed.is_empty() {
                self.classes = parsed.into_iter().map(ObjectClass::new).collect();
            }
        }
        if let Ok(train_class) = std::env::var("SAFETY_TRAIN_CLASS") {
            let train_class = train_class.trim();
            self.train_class = match train_class {
                "" | "none" => None,
                class => Some(ObjectClass::from(class)),
            };
        }
        if let Ok(batch) = std::env::var("SAFETY_BATCH_FRAMES") {
            self.batch_frames = batch
                .trim()
                .parse()
                .map_err(|_| anyhow!("SAFETY_BATCH_FRAMES must be a positive integer"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.total_frames == 0 {
            return Err(AnalyticsError::config("total_frames must be greater than zero"));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(AnalyticsError::config(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !(self.speed_threshold.is_finite() && self.speed_threshold > 0.0) {
            return Err(AnalyticsError::config(format!(
                "speed_threshold must be positive, got {}",
                self.speed_threshold
            )));
        }
        if self.classes.is_empty() {
            return Err(AnalyticsError::config("class set must not be empty"));
        }
        let mut seen = HashSet::new();
        for class in &self.classes {
            validate_class_label(class)?;
            if !seen.insert(class) {
                return Err(AnalyticsError::config(format!(
                    "class '{}' listed more than once",
                    class
                )));
            }
        }
        if !self.has_class(&self.person_class) {
            return Err(AnalyticsError::config(format!(
                "person class '{}' is not in the class set",
                self.person_class
            )));
        }
        if let Some(train_class) = &self.train_class {
            if !self.has_class(train_class) {
                return Err(AnalyticsError::config(format!(
                    "train class '{}' is not in the class set",
                    train_class
                )));
            }
            if *train_class == self.person_class {
                return Err(AnalyticsError::config(
                    "train class and person class must differ",
                ));
            }
        }
        if self.batch_frames == 0 {
            return Err(AnalyticsError::config("batch_frames must be greater than zero"));
        }
        Ok(())
    }

    pub fn has_class(&self, class: &ObjectClass) -> bool {
        self.classes.contains(class)
    }

    pub fn is_train(&self, class: &ObjectClass) -> bool {
        self.train_class.as_ref() == Some(class)
    }

    pub fn timestamp(&self, frame_index: u32) -> f64 {
        frame_timestamp(frame_index, self.frame_rate)
    }
}

fn validate_class_label(class: &ObjectClass) -> Result<(), AnalyticsError> {
    static CLASS_LABEL_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = CLASS_LABEL_RE.get_or_init(|| {
        regex::Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} _-]{0,63}$").expect("static class regex")
    });
    if !re.is_match(class.as_str()) {
        return Err(AnalyticsError::config(format!(
            "class label '{}' must be 1..64 letters, digits, spaces, '_' or '-'",
            class
        )));
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<AnalysisConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
