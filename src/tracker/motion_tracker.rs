//! Per-frame motion tracking of a single subject.

use log::{debug, trace};
use nalgebra::Point2;

use crate::tracker::backend::{MotionBackend, NativeBackend};
use crate::tracker::candidates::CandidateExtractor;
use crate::tracker::config::TrackerConfig;
use crate::tracker::error::TrackerError;
use crate::tracker::frame::{ForegroundMask, Frame};
use crate::tracker::selector::{CandidateSelector, Observation};
use crate::tracker::track_state::TrackState;

/// Result of tracking one frame.
#[derive(Debug, Clone)]
pub struct TrackOutput {
    /// Copy of the input frame with the decision drawn on it
    pub annotated: Frame,
    /// Reported position, `None` when the frame is a gap
    pub coordinate: Option<Point2<f32>>,
    pub observation: Observation,
}

/// Stateful single-subject tracker.
///
/// Owns the background model (through its [`MotionBackend`]) and the track
/// state of one video. Frames must be fed in order; use one tracker per video.
pub struct MotionTracker<B = NativeBackend> {
    config: TrackerConfig,
    backend: B,
    extractor: CandidateExtractor,
    selector: CandidateSelector,
    state: TrackState,
    dimensions: Option<(usize, usize)>,
    frame_id: u64,
}

impl MotionTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        let backend = NativeBackend::new(&config);
        Self::with_backend(config, backend)
    }
}

impl<B: MotionBackend> MotionTracker<B> {
    pub fn with_backend(config: TrackerConfig, backend: B) -> Result<Self, TrackerError> {
        config.validate()?;
        debug!("creating motion tracker with {config:?}");
        Ok(Self {
            backend,
            extractor: CandidateExtractor::new(config.min_area),
            selector: CandidateSelector::new(
                config.selection_policy,
                config.max_jump_distance,
                config.max_fallback_frames,
            ),
            state: TrackState::new(),
            dimensions: None,
            frame_id: 0,
            config,
        })
    }

    /// Track the subject in the next frame of the session.
    pub fn process(&mut self, frame: &Frame) -> Result<TrackOutput, TrackerError> {
        let mask = self.segment(frame)?;
        let candidates = self.extractor.filter(self.backend.regions(&mask)?);
        trace!(
            "frame {}: {} candidate(s) above {} px",
            self.frame_id,
            candidates.len(),
            self.extractor.min_area()
        );

        let observation = self.selector.select(candidates, &mut self.state);
        let mut annotated = frame.clone();
        self.backend
            .annotate(&mut annotated, &observation, self.selector.policy())?;

        Ok(TrackOutput {
            annotated,
            coordinate: observation.coordinate(),
            observation,
        })
    }

    /// Update the background model with `frame` and return the refined
    /// binary mask, without touching the track state.
    pub fn segment(&mut self, frame: &Frame) -> Result<ForegroundMask, TrackerError> {
        self.check_frame(frame)?;
        self.frame_id += 1;
        self.backend.segment(frame)
    }

    pub fn track_state(&self) -> &TrackState {
        &self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of frames accepted so far.
    pub fn frames_processed(&self) -> u64 {
        self.frame_id
    }

    fn check_frame(&mut self, frame: &Frame) -> Result<(), TrackerError> {
        if frame.is_empty() {
            return Err(TrackerError::EmptyFrame {
                width: frame.width(),
                height: frame.height(),
                channels: frame.channels(),
            });
        }
        match self.dimensions {
            Some(expected) if expected != frame.dimensions() => {
                Err(TrackerError::DimensionMismatch {
                    expected,
                    got: frame.dimensions(),
                })
            }
            Some(_) => Ok(()),
            None => {
                self.dimensions = Some(frame.dimensions());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::candidates::{Moments, Region};
    use crate::tracker::rect::Rect;
    use crate::tracker::selector::SelectionPolicy;
    use crate::tracker::track_state::TrackStatus;
    use ndarray::Array3;

    const FLOOR: [u8; 3] = [200, 200, 200];
    const MOUSE: [u8; 3] = [30, 30, 30];

    fn frame_with_blob(cx: usize, cy: usize, half: usize) -> Frame {
        let mut frame = Frame::filled(100, 80, FLOOR);
        frame.fill_block(cx - half, cy - half, cx + half, cy + half, MOUSE);
        frame
    }

    fn warmed_tracker(config: TrackerConfig) -> MotionTracker {
        let mut tracker = MotionTracker::new(config).unwrap();
        let background = Frame::filled(100, 80, FLOOR);
        for _ in 0..20 {
            let output = tracker.process(&background).unwrap();
            assert_eq!(output.coordinate, None);
        }
        tracker
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let config = TrackerConfig {
            min_area: -5.0,
            ..Default::default()
        };
        assert!(MotionTracker::new(config).is_err());
    }

    #[test]
    fn test_rejects_empty_and_resized_frames() {
        let mut tracker = MotionTracker::new(TrackerConfig::default()).unwrap();
        assert!(matches!(
            tracker.process(&Frame::new(Array3::zeros((0, 0, 3)))),
            Err(TrackerError::EmptyFrame { .. })
        ));

        tracker.process(&Frame::filled(10, 10, FLOOR)).unwrap();
        assert!(matches!(
            tracker.process(&Frame::filled(12, 10, FLOOR)),
            Err(TrackerError::DimensionMismatch { .. })
        ));
        assert_eq!(tracker.frames_processed(), 1);
    }

    #[test]
    fn test_detects_blob_after_warm_up() {
        let mut tracker = warmed_tracker(TrackerConfig::default());
        let output = tracker.process(&frame_with_blob(40, 30, 7)).unwrap();

        assert_eq!(output.coordinate, Some(Point2::new(40.0, 30.0)));
        assert_eq!(tracker.track_state().status(), TrackStatus::Tracking);
        assert_eq!(output.annotated.pixel(40, 30), crate::tracker::frame::RED);
    }

    #[test]
    fn test_small_blob_is_noise() {
        let mut tracker = warmed_tracker(TrackerConfig {
            min_area: 400.0,
            ..Default::default()
        });
        let output = tracker.process(&frame_with_blob(40, 30, 4)).unwrap();
        assert_eq!(output.observation, Observation::Gap);
    }

    #[test]
    fn test_segment_leaves_track_untouched() {
        let mut tracker = warmed_tracker(TrackerConfig::default());
        let mask = tracker.segment(&frame_with_blob(40, 30, 7)).unwrap();
        assert_eq!(mask[[30, 40]], 255);
        assert_eq!(tracker.track_state().status(), TrackStatus::NoTrack);
    }

    /// Reports one fixed region on every frame and records what it is asked to draw.
    struct FixedRegion {
        drawn: std::cell::Cell<usize>,
    }

    impl MotionBackend for FixedRegion {
        fn segment(&mut self, frame: &Frame) -> Result<ForegroundMask, TrackerError> {
            Ok(ForegroundMask::zeros((frame.height(), frame.width())))
        }

        fn regions(&self, _mask: &ForegroundMask) -> Result<Vec<Region>, TrackerError> {
            Ok(vec![Region {
                moments: Moments {
                    m00: 200.0,
                    m10: 200.0 * 12.0,
                    m01: 200.0 * 7.0,
                },
                bounds: Rect::new(5.0, 0.0, 15.0, 15.0),
            }])
        }

        fn annotate(
            &self,
            _frame: &mut Frame,
            observation: &Observation,
            policy: SelectionPolicy,
        ) -> Result<(), TrackerError> {
            assert!(observation.is_detection());
            assert_eq!(policy, SelectionPolicy::ProximityFirst);
            self.drawn.set(self.drawn.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn test_custom_backend_feeds_selection() {
        let config = TrackerConfig {
            selection_policy: SelectionPolicy::ProximityFirst,
            ..Default::default()
        };
        let backend = FixedRegion {
            drawn: std::cell::Cell::new(0),
        };
        let mut tracker = MotionTracker::with_backend(config, backend).unwrap();
        let output = tracker.process(&Frame::filled(30, 20, FLOOR)).unwrap();
        assert_eq!(output.coordinate, Some(Point2::new(12.0, 7.0)));
        assert_eq!(tracker.backend.drawn.get(), 1);
    }
}
