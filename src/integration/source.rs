//! Trait for frame providers feeding the tracker.

use std::ops::Range;

use crate::integration::SourceError;
use crate::tracker::Frame;

/// A random-access sequence of frames with a known frame rate.
///
/// Implement this trait to feed any decoder or image store to a
/// [`TrackingSession`](crate::integration::TrackingSession).
///
/// # Example
///
/// ```ignore
/// use mousetrack_rs::{Frame, FrameSource, SourceError};
///
/// struct Camera { /* decoder state */ }
///
/// impl FrameSource for Camera {
///     fn fps(&self) -> f64 { 30.0 }
///     fn len(&self) -> usize { 9000 }
///     fn frame(&mut self, index: usize) -> Result<Frame, SourceError> {
///         // Decode and return frame `index`
///     }
/// }
/// ```
pub trait FrameSource {
    /// Frames per second of the recording.
    fn fps(&self) -> f64;

    /// Total number of frames available.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load frame `index` (zero-based).
    fn frame(&mut self, index: usize) -> Result<Frame, SourceError>;

    /// Frame indices covering `duration_seconds` starting at `start_seconds`,
    /// clamped to the available frames.
    fn frame_range(
        &self,
        start_seconds: f64,
        duration_seconds: f64,
    ) -> Result<Range<usize>, SourceError> {
        time_range(self.fps(), self.len(), start_seconds, duration_seconds)
    }
}

/// Convert a time window into frame indices.
///
/// The start index is `floor(start_seconds * fps)` and the frame count
/// `floor(duration_seconds * fps)`; the end is clamped to `total_frames`.
/// An infinite duration runs to the end.
pub fn time_range(
    fps: f64,
    total_frames: usize,
    start_seconds: f64,
    duration_seconds: f64,
) -> Result<Range<usize>, SourceError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(SourceError::InvalidFps(fps));
    }
    if !start_seconds.is_finite()
        || start_seconds < 0.0
        || duration_seconds.is_nan()
        || duration_seconds < 0.0
    {
        return Err(SourceError::InvalidTimeRange {
            start_seconds,
            duration_seconds,
        });
    }

    let start = (start_seconds * fps).floor() as usize;
    let count = (duration_seconds * fps).floor() as usize;
    if start >= total_frames {
        return Err(SourceError::StartBeyondEnd {
            start_seconds,
            total_frames,
        });
    }
    Ok(start..start.saturating_add(count).min(total_frames))
}

/// Frames held in memory, mostly useful for tests and synthetic input.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    frames: Vec<Frame>,
    fps: f64,
}

impl InMemorySource {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        Self { frames, fps }
    }
}

impl FrameSource for InMemorySource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    fn frame(&mut self, index: usize) -> Result<Frame, SourceError> {
        self.frames
            .get(index)
            .cloned()
            .ok_or(SourceError::IndexOutOfRange {
                index,
                len: self.frames.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_converts_seconds() {
        assert_eq!(time_range(30.0, 1000, 2.0, 10.0).unwrap(), 60..360);
        assert_eq!(time_range(25.0, 100, 0.5, 1.0).unwrap(), 12..37);
    }

    #[test]
    fn test_time_range_clamps_end() {
        assert_eq!(time_range(30.0, 100, 3.0, 60.0).unwrap(), 90..100);
        assert_eq!(time_range(30.0, 100, 0.0, f64::INFINITY).unwrap(), 0..100);
    }

    #[test]
    fn test_time_range_start_beyond_end() {
        assert!(matches!(
            time_range(30.0, 100, 4.0, 1.0),
            Err(SourceError::StartBeyondEnd { .. })
        ));
    }

    #[test]
    fn test_time_range_rejects_bad_input() {
        assert!(matches!(
            time_range(0.0, 100, 0.0, 1.0),
            Err(SourceError::InvalidFps(_))
        ));
        assert!(matches!(
            time_range(30.0, 100, -1.0, 1.0),
            Err(SourceError::InvalidTimeRange { .. })
        ));
        assert!(matches!(
            time_range(30.0, 100, 0.0, f64::NAN),
            Err(SourceError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn test_in_memory_source() {
        let mut source = InMemorySource::new(vec![Frame::filled(2, 2, [1, 2, 3])], 10.0);
        assert_eq!(source.len(), 1);
        assert!(source.frame(0).is_ok());
        assert!(matches!(
            source.frame(1),
            Err(SourceError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }
}
