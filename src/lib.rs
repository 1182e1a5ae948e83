//! Single-subject motion tracking for top-down rodent behaviour videos.
//!
//! Each frame goes through an adaptive background model, a morphological
//! mask refiner and a connected-region extractor; a selector then reports one
//! coordinate per frame, holding the last position while the subject is
//! still. The [`integration`] module runs the tracker over image folders and
//! writes a CSV log with central-zone statistics.

pub mod integration;
pub mod tracker;

pub use integration::{
    CenterZone, CsvSink, FrameSource, ImageSequence, SessionError, SessionReport, SessionStats,
    SinkError, SourceError, TrackRecord, TrackingSession,
};
pub use tracker::{
    Candidate, Frame, MotionTracker, Observation, SelectionPolicy, TrackOutput, TrackerConfig,
    TrackerError,
};
