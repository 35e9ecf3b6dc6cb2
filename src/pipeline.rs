//! Analysis pipeline.
//!
//! Pulls detections from a `DetectionSource` one frame at a time, in
//! increasing order, and feeds them in `batch_frames`-sized batches to the
//! aggregator, train tracker and danger extractor. All three consume the same
//! batch independently; none sees the others' output. The summarizer runs once
//! at the end.

use crate::aggregate::FrameAggregator;
use crate::config::AnalysisConfig;
use crate::danger::DangerExtractor;
use crate::detect::{Detection, DetectionSource, RecordedSource};
use crate::error::{AnalyticsError, Result};
use crate::report::AnalysisReport;
use crate::train::TrainTracker;

pub struct AnalysisPipeline {
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run<S>(&self, source: &mut S) -> Result<AnalysisReport>
    where
        S: DetectionSource + ?Sized,
    {
        self.run_with_progress(source, |_| {})
    }

    /// Like `run`, calling `on_frame` for each frame once its batch has been
    /// accepted by every component. Frames of a rejected batch are never
    /// reported.
    pub fn run_with_progress<S, F>(&self, source: &mut S, mut on_frame: F) -> Result<AnalysisReport>
    where
        S: DetectionSource + ?Sized,
        F: FnMut(u32),
    {
        let config = &self.config;
        let source_name = source.name();
        let mut aggregator = FrameAggregator::new(config);
        let mut tracker = TrainTracker::new(config);
        let mut extractor = DangerExtractor::new(config);

        log::info!(
            "analyzing {} frames from '{}' source ({} frames per batch)",
            config.total_frames,
            source_name,
            config.batch_frames
        );

        let mut start = 0u32;
        while start < config.total_frames {
            let end = start
                .saturating_add(config.batch_frames)
                .min(config.total_frames);
            let mut detections: Vec<Detection> = Vec::new();
            for frame_index in start..end {
                let produced = source.produce_detections(frame_index).map_err(|error| {
                    AnalyticsError::Source {
                        source_name,
                        frame_index,
                        error,
                    }
                })?;
                if let Some(stray) = produced.iter().find(|d| d.frame_index != frame_index) {
                    return Err(AnalyticsError::InvalidFrameIndex {
                        frame_index: stray.frame_index,
                        valid: frame_index..frame_index + 1,
                    });
                }
                detections.extend(produced);
            }

            aggregator.process(start..end, &detections)?;
            tracker.process(start..end, &detections)?;
            extractor.process(start..end, &detections)?;
            (start..end).for_each(&mut on_frame);
            start = end;
        }

        let report = AnalysisReport::assemble(
            config,
            aggregator.finish(),
            tracker.finish(),
            extractor.finish(),
        );
        log::info!(
            "analysis complete: {} detections, {} danger events, peak {} people at frame {}",
            report.summary.total_detections,
            report.summary.danger_event_count,
            report.summary.max_concurrent_people,
            report.summary.max_concurrent_people_frame
        );
        Ok(report)
    }
}

/// Analyzes a complete in-memory detection list.
pub fn analyze_detections(
    config: &AnalysisConfig,
    detections: Vec<Detection>,
) -> Result<AnalysisReport> {
    let pipeline = AnalysisPipeline::new(config.clone())?;
    let mut source = RecordedSource::new(detections, config.total_frames)?;
    pipeline.run(&mut source)
}
