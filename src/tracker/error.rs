use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the tracking core.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A configuration value is out of range. Values are never clamped.
    #[error("invalid tracker configuration: `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The frame has no pixels or is not 3-channel.
    #[error("frame is empty or malformed ({width}x{height}x{channels})")]
    EmptyFrame {
        width: usize,
        height: usize,
        channels: usize,
    },

    /// Frame dimensions differ from the first frame of the session.
    #[error("frame dimensions changed from {expected:?} to {got:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("failed to read tracker configuration from {path:?}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tracker configuration")]
    ParseConfig(#[from] serde_json::Error),

    /// Failure inside an image-processing backend.
    #[error("image backend failed")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TrackerError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
