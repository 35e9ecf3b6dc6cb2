//! Safety analytics engine
//!
//! This crate turns a stream of per-frame object detections from a video into
//! safety analytics for a dashboard.
//!
//! # Architecture
//!
//! Data flows one way:
//!
//! 1. **Detection source** (`detect::DetectionSource`): injected, deterministic
//!    per frame. The crate ships a seeded simulator and a recorded-list replay.
//! 2. **Frame aggregator** (`aggregate`): one `FrameSummary` per frame with
//!    counts for every configured class, empty frames included.
//! 3. **Train tracker** (`train`): one `TrainStatus` per frame plus arrival.
//! 4. **Danger extractor** (`danger`): independent events per detection,
//!    with a per-frame timeline and per-kind counts.
//! 5. **Summarizer** (`summary`): scalar `SafetySummary` rollups.
//!
//! Components 2-4 read the same detections and share no state, and each can be
//! fed in consecutive frame batches with results identical to a single pass.
//! `pipeline::AnalysisPipeline` drives all of them and returns an
//! `AnalysisReport` for presentation.
//!
//! # Module Structure
//!
//! - `config`: request-scoped `AnalysisConfig` (file + env + validation)
//! - `detect`: detection model, source trait, simulated/recorded sources
//! - `error`: typed `AnalyticsError`
//! - `ui`: terminal progress for the `safety_report` binary

mod batch;

pub mod aggregate;
pub mod config;
pub mod danger;
pub mod detect;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod summary;
pub mod train;
pub mod ui;

pub use aggregate::{aggregate_frames, FrameAggregation, FrameAggregator, FrameSummary};
pub use config::{AnalysisConfig, DangerSignals};
pub use danger::{
    extract_dangers, DangerEvent, DangerExtractor, DangerKind, DangerKindCount, DangerReport,
    DangerTimelineEntry,
};
pub use detect::{
    Detection, DetectionSource, ObjectClass, RecordedSource, SimulatedSource, SimulationProfile,
    TrainStatus,
};
pub use error::{AnalyticsError, Result};
pub use pipeline::{analyze_detections, AnalysisPipeline};
pub use report::AnalysisReport;
pub use summary::{summarize, SafetySummary};
pub use train::{track_train, TrainStatusRecord, TrainTimeline, TrainTracker, TrainTransition};
