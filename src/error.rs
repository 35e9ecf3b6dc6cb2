use std::ops::Range;

/// Errors raised by the analytics core.
///
/// Every variant is raised synchronously at the point of aggregation. The core
/// performs no I/O of its own, so nothing here is transient or retried.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// A detection references a frame outside the configured (or batch) range.
    #[error("detection references frame {frame_index}, outside {}..{}", .valid.start, .valid.end)]
    InvalidFrameIndex { frame_index: u32, valid: Range<u32> },

    /// A train detection carries no status tag, or one outside the vocabulary.
    #[error("train detection in frame {frame_index} has invalid status {status:?}")]
    InvalidTrainStatus {
        frame_index: u32,
        status: Option<String>,
    },

    /// More than one train detection in a single frame.
    #[error("{count} train detections in frame {frame_index}, at most one can be tracked")]
    AmbiguousTrainDetection { frame_index: u32, count: usize },

    /// A detection class is not part of the configured class set.
    #[error("detection in frame {frame_index} has unknown class '{class}'")]
    UnknownObjectClass { frame_index: u32, class: String },

    /// A detection attribute is outside its valid domain.
    #[error("invalid detection in frame {frame_index}: {reason}")]
    InvalidDetection { frame_index: u32, reason: String },

    /// A batch did not continue where the previous one ended.
    #[error("frame batch {found:?} does not continue at frame {expected}")]
    FrameOutOfOrder { expected: u32, found: Range<u32> },

    /// Invalid analysis configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The injected detection source failed.
    #[error("detection source '{source_name}' failed at frame {frame_index}: {error}")]
    Source {
        source_name: &'static str,
        frame_index: u32,
        error: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl AnalyticsError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        AnalyticsError::Configuration(message.into())
    }
}
