//! Construction-time tracker configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tracker::error::TrackerError;
use crate::tracker::refiner::RefinerConfig;
use crate::tracker::selector::SelectionPolicy;

/// Configuration for the [`MotionTracker`](crate::tracker::MotionTracker).
///
/// Deserialises from JSON with every field optional; missing fields take
/// their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Smallest region, in pixels, that counts as the subject
    pub min_area: f64,
    /// Largest accepted jump, in pixels, for the proximity policy
    pub max_jump_distance: f32,
    /// Frames the background model effectively remembers
    pub history_length: u32,
    /// Squared Mahalanobis distance under which a pixel matches the background
    pub variance_threshold: f32,
    /// Classify darkened background as shadow (then discarded by the refiner)
    pub detect_shadows: bool,
    pub selection_policy: SelectionPolicy,
    /// Consecutive frames without a detection before the track is dropped.
    /// `None` keeps reporting the last coordinate forever.
    pub max_fallback_frames: Option<u32>,
    pub refiner: RefinerConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_area: 100.0,
            max_jump_distance: 100.0,
            history_length: 500,
            variance_threshold: 16.0,
            detect_shadows: true,
            selection_policy: SelectionPolicy::LargestArea,
            max_fallback_frames: None,
            refiner: RefinerConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TrackerError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TrackerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(TrackerError::invalid(
                "min_area",
                format!("must be a finite, non-negative pixel count, got {}", self.min_area),
            ));
        }
        if !self.max_jump_distance.is_finite() || self.max_jump_distance <= 0.0 {
            return Err(TrackerError::invalid(
                "max_jump_distance",
                format!("must be finite and positive, got {}", self.max_jump_distance),
            ));
        }
        if self.history_length == 0 {
            return Err(TrackerError::invalid("history_length", "must be at least 1"));
        }
        if !self.variance_threshold.is_finite() || self.variance_threshold <= 0.0 {
            return Err(TrackerError::invalid(
                "variance_threshold",
                format!("must be finite and positive, got {}", self.variance_threshold),
            ));
        }
        self.refiner.validate()
    }
}
