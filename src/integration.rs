//! Integration layer connecting frame sources, the tracker and output sinks.
//!
//! [`TrackingSession`] drives a [`MotionTracker`](crate::tracker::MotionTracker)
//! over any [`FrameSource`], classifies each coordinate against the central
//! zone and writes the per-frame log.

mod csv_sink;
mod equalize;
mod error;
mod image_sequence;
mod pipeline;
mod preprocess;
mod source;
mod stats;

#[cfg(feature = "opencv-backend")]
mod opencv_backend;

pub use csv_sink::{CsvSink, TrackRecord, read_records};
pub use error::{SessionError, SinkError, SourceError};
pub use image_sequence::{ImageSequence, save_frame};
pub use pipeline::{SessionReport, TrackingSession};
pub use equalize::Clahe;
pub use preprocess::{Enhancement, Preprocess, Preprocessor, Roi};
pub use source::{FrameSource, InMemorySource, time_range};
pub use stats::{CenterZone, SessionStats, distances_from_center};

#[cfg(feature = "opencv-backend")]
pub use opencv_backend::{OpenCvBackend, OpenCvPreprocess};
