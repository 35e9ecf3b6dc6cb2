//! Terminal feedback for the `safety_report` binary.
//!
//! Pretty mode draws indicatif spinners and a frame progress bar on stderr;
//! plain mode prints one line per stage and a line every tenth of the run.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::str::FromStr;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UiMode {
    #[default]
    Auto,
    Plain,
    Pretty,
}

impl FromStr for UiMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "auto" => Ok(UiMode::Auto),
            "plain" => Ok(UiMode::Plain),
            "pretty" => Ok(UiMode::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown ui mode '{}' (expected auto, plain or pretty)",
                other
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ui {
    pretty: bool,
}

impl Ui {
    /// `disable_pretty` only affects `Auto` (e.g. when running under CI).
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        let pretty = is_tty
            && match mode {
                UiMode::Pretty => true,
                UiMode::Auto => !disable_pretty,
                UiMode::Plain => false,
            };
        Self { pretty }
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        let spinner = self.pretty.then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message(format!("{name}…"));
            spinner
        });
        if spinner.is_none() {
            eprintln!("==> {}", name);
        }
        StageGuard {
            name: name.to_string(),
            start: Instant::now(),
            spinner,
        }
    }

    /// Progress over `total_frames` analyzed frames.
    pub fn frames(&self, total_frames: u32) -> FrameProgress {
        let bar = self.pretty.then(|| {
            let bar = ProgressBar::new(u64::from(total_frames));
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} frames ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        });
        FrameProgress {
            bar,
            total_frames,
            step: (total_frames / 10).max(1),
        }
    }
}

pub struct FrameProgress {
    bar: Option<ProgressBar>,
    total_frames: u32,
    step: u32,
}

impl FrameProgress {
    pub fn frame_done(&self, frame_index: u32) {
        let done = frame_index + 1;
        match &self.bar {
            Some(bar) => bar.set_position(u64::from(done)),
            None if done % self.step == 0 || done == self.total_frames => {
                eprintln!("    frame {}/{}", done, self.total_frames);
            }
            None => {}
        }
    }
}

impl Drop for FrameProgress {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
