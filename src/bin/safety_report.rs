//! safety_report - run one safety analysis and write the report as JSON
//!
//! Detections come either from the seeded simulator (`--profile`) or from a
//! recorded detection file (`--detections`, JSON array or JSON Lines).
//! Configuration is read from `--config`, or from the file named by
//! `SAFETY_CONFIG` plus `SAFETY_*` overrides.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use safety_analytics::detect::load_detections;
use safety_analytics::ui::{Ui, UiMode};
use safety_analytics::{
    AnalysisConfig, AnalysisPipeline, AnalysisReport, DetectionSource, RecordedSource,
    SimulatedSource, SimulationProfile,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML by extension). Skips environment overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of frames to analyze (overrides config).
    #[arg(long)]
    frames: Option<u32>,
    /// Simulated detector profile: basic, workplace or platform.
    #[arg(long, default_value = "platform", conflicts_with = "detections")]
    profile: SimulationProfile,
    /// Recorded detections to analyze instead of the simulator.
    #[arg(long)]
    detections: Option<PathBuf>,
    /// Output path for the JSON report.
    #[arg(long, env = "SAFETY_REPORT_OUT", default_value = "safety_report.json")]
    out: PathBuf,
    /// Terminal output: auto, plain or pretty.
    #[arg(long, default_value = "auto")]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_path(path)?,
        None => AnalysisConfig::load()?,
    };
    if let Some(frames) = args.frames {
        config.total_frames = frames;
    }
    let pipeline = AnalysisPipeline::new(config)?;
    let config = pipeline.config();
    let ui = Ui::new(
        args.ui,
        std::io::stderr().is_terminal(),
        std::env::var_os("CI").is_some(),
    );

    let mut source: Box<dyn DetectionSource> = match &args.detections {
        Some(path) => {
            let _stage = ui.stage("load recorded detections");
            let detections = load_detections(path)?;
            log::info!("loaded {} detections from {}", detections.len(), path.display());
            Box::new(RecordedSource::new(detections, config.total_frames)?)
        }
        None => {
            log::info!("using simulated '{}' detector", args.profile.as_str());
            Box::new(SimulatedSource::new(args.profile, config)?)
        }
    };

    let report = {
        let _stage = ui.stage("analyze frames");
        let progress = ui.frames(config.total_frames);
        pipeline.run_with_progress(source.as_mut(), |frame| progress.frame_done(frame))?
    };

    {
        let _stage = ui.stage("write report");
        write_report(&report, &args.out)?;
    }
    print_summary(&report);
    log::info!(
        "report written to {} (sha256 {})",
        args.out.display(),
        report.digest()?
    );
    Ok(())
}

fn write_report(report: &AnalysisReport, out: &Path) -> Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = report.to_json_pretty()?;
    std::fs::write(out, json).with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    let summary = &report.summary;
    log::info!(
        "peak occupancy: {} people at frame {}",
        summary.max_concurrent_people,
        summary.max_concurrent_people_frame
    );
    log::info!(
        "danger events: {} across {} frames",
        summary.danger_event_count,
        report.danger_timeline.len()
    );
    for entry in &report.danger_by_kind {
        log::info!("  {}: {}", entry.kind, entry.count);
    }
    log::info!(
        "protective equipment compliance: {:.0}%",
        summary.protective_equipment_compliance_rate * 100.0
    );
    log::info!("average person speed: {:.2}", summary.average_person_speed);
    match summary.train_arrival_timestamp {
        Some(ts) => log::info!(
            "train arrival: {:.2}s (final status: {})",
            ts,
            summary.final_train_status
        ),
        None => log::info!("train arrival: not detected"),
    }
    if summary.danger_event_count > 0 {
        log::warn!("{} danger events need review", summary.danger_event_count);
    }
}
