//! Recorded detection input.
//!
//! Accepts either a JSON array of detections or JSON Lines (one detection
//! object per line, blank lines ignored).

use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::detect::result::Detection;

pub fn load_detections(path: &Path) -> Result<Vec<Detection>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read detections {}: {}", path.display(), e))?;
    parse_detections(&raw).with_context(|| format!("invalid detections in {}", path.display()))
}

pub fn parse_detections(raw: &str) -> Result<Vec<Detection>> {
    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(raw).context("detections must be a JSON array");
    }
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}", idx + 1))
        })
        .collect()
}
