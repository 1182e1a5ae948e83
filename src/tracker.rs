mod backend;
mod background;
mod candidates;
mod config;
mod error;
mod frame;
mod motion_tracker;
mod rect;
mod refiner;
mod selector;
mod track_state;

pub use backend::{MotionBackend, NativeBackend};
pub use background::{BACKGROUND, BackgroundModel, FOREGROUND, SHADOW};
pub use candidates::{Candidate, CandidateExtractor, Moments, Region, external_regions};
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use frame::{BLUE, ForegroundMask, Frame, GREEN, RED, Rgb};
pub use motion_tracker::{MotionTracker, TrackOutput};
pub use rect::Rect;
pub use refiner::{MaskRefiner, RefinerConfig, StructuringElement, dilate, erode, threshold};
pub use selector::{
    CandidateSelector, Observation, SelectionPolicy, draw_observation, largest_area, nearest_within,
};
pub use track_state::{TrackState, TrackStatus};
