use std::path::PathBuf;

use thiserror::Error;

use crate::integration::preprocess::Roi;
use crate::tracker::TrackerError;

/// Errors raised while acquiring frames.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to list frames in {path:?}")]
    ListFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no .png/.jpg/.jpeg frames found in {0:?}")]
    NoFrames(PathBuf),

    #[error("frame rate must be positive and finite, got {0}")]
    InvalidFps(f64),

    #[error("frame index {index} out of range (source has {len} frames)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid time range: start {start_seconds}s, duration {duration_seconds}s")]
    InvalidTimeRange {
        start_seconds: f64,
        duration_seconds: f64,
    },

    #[error("start time {start_seconds}s is beyond the available {total_frames} frames")]
    StartBeyondEnd {
        start_seconds: f64,
        total_frames: usize,
    },

    #[error("could not read frame from {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("region of interest {roi:?} does not fit a {width}x{height} frame")]
    RoiOutOfBounds {
        roi: Roi,
        width: usize,
        height: usize,
    },

    #[error("failed to preprocess frame")]
    Preprocess(#[source] TrackerError),
}

/// Errors raised while writing or reading tracking output.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("csv error on tracking log")]
    Csv(#[from] csv::Error),

    #[error("i/o error on tracking log")]
    Io(#[from] std::io::Error),

    #[error("failed to write frame image {path:?}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Errors raised by a [`TrackingSession`](crate::integration::TrackingSession).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("center zone percentage must be within (0, 100], got {0}")]
    InvalidCenterPercent(f32),
}
