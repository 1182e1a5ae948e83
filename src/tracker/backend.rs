//! Image-processing stages the tracker delegates to.

use crate::tracker::background::BackgroundModel;
use crate::tracker::candidates::{Region, external_regions};
use crate::tracker::config::TrackerConfig;
use crate::tracker::error::TrackerError;
use crate::tracker::frame::{ForegroundMask, Frame};
use crate::tracker::refiner::MaskRefiner;
use crate::tracker::selector::{Observation, SelectionPolicy, draw_observation};

/// Background subtraction, mask clean-up, region labelling and drawing.
///
/// Candidate filtering, selection and the track state stay in
/// [`MotionTracker`](crate::tracker::MotionTracker); a backend only turns
/// pixels into regions and draws the decision back.
///
/// # Example
///
/// ```ignore
/// use mousetrack_rs::tracker::{MotionBackend, MotionTracker, TrackerConfig};
///
/// let config = TrackerConfig::default();
/// let backend = MyBackend::new(&config);
/// let mut tracker = MotionTracker::with_backend(config, backend)?;
/// ```
pub trait MotionBackend {
    /// Feed `frame` to the background model and return the refined binary
    /// mask (0 or 255). The first frame of a session is all background.
    fn segment(&mut self, frame: &Frame) -> Result<ForegroundMask, TrackerError>;

    /// Hole-filled external regions of a refined mask, in raster order of
    /// their first pixel.
    fn regions(&self, mask: &ForegroundMask) -> Result<Vec<Region>, TrackerError>;

    /// Burn `observation` into `frame`.
    fn annotate(
        &self,
        frame: &mut Frame,
        observation: &Observation,
        policy: SelectionPolicy,
    ) -> Result<(), TrackerError>;
}

/// Pure-Rust backend over `ndarray`.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    background: BackgroundModel,
    refiner: MaskRefiner,
}

impl NativeBackend {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            background: BackgroundModel::new(
                config.history_length,
                config.variance_threshold,
                config.detect_shadows,
            ),
            refiner: MaskRefiner::new(config.refiner.clone()),
        }
    }
}

impl MotionBackend for NativeBackend {
    fn segment(&mut self, frame: &Frame) -> Result<ForegroundMask, TrackerError> {
        let scores = self.background.update_and_segment(frame);
        Ok(self.refiner.refine(&scores))
    }

    fn regions(&self, mask: &ForegroundMask) -> Result<Vec<Region>, TrackerError> {
        Ok(external_regions(mask))
    }

    fn annotate(
        &self,
        frame: &mut Frame,
        observation: &Observation,
        policy: SelectionPolicy,
    ) -> Result<(), TrackerError> {
        draw_observation(frame, observation, policy);
        Ok(())
    }
}
