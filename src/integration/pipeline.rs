//! TrackingSession for running a tracker over a frame source.

use std::io::Write;
use std::ops::Range;

use log::{debug, info};

use crate::integration::csv_sink::{CsvSink, TrackRecord};
use crate::integration::source::FrameSource;
use crate::integration::stats::{CenterZone, SessionStats};
use crate::integration::{SessionError, SourceError};
use crate::tracker::{MotionBackend, MotionTracker, NativeBackend, TrackOutput, TrackerConfig};

/// Everything a finished session produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// One row per processed frame, in frame order
    pub records: Vec<TrackRecord>,
    pub stats: SessionStats,
    /// `None` when no frame was processed
    pub zone: Option<CenterZone>,
}

/// A frame source bundled with the tracker that consumes it.
///
/// One session covers one video: the tracker keeps background and track
/// state across calls to [`run`](Self::run).
pub struct TrackingSession<S: FrameSource, B = NativeBackend> {
    source: S,
    tracker: MotionTracker<B>,
}

impl<S: FrameSource> TrackingSession<S> {
    pub fn new(source: S, config: TrackerConfig) -> Result<Self, SessionError> {
        Ok(Self::with_tracker(source, MotionTracker::new(config)?))
    }

    pub fn with_default_config(source: S) -> Result<Self, SessionError> {
        Self::new(source, TrackerConfig::default())
    }
}

impl<S: FrameSource, B: MotionBackend> TrackingSession<S, B> {
    /// Bundle `source` with an already built tracker, e.g. one using a
    /// non-default backend.
    pub fn with_tracker(source: S, tracker: MotionTracker<B>) -> Self {
        Self { source, tracker }
    }

    /// Track every frame of `range` in order.
    ///
    /// The center zone is laid out from the first frame's dimensions. The
    /// callback sees each frame's record and tracker output, e.g. to export
    /// annotated images.
    pub fn run<F>(
        &mut self,
        range: Range<usize>,
        center_percent: f32,
        mut on_frame: F,
    ) -> Result<SessionReport, SessionError>
    where
        F: FnMut(&TrackRecord, &TrackOutput) -> Result<(), SessionError>,
    {
        if range.end > self.source.len() {
            return Err(SourceError::IndexOutOfRange {
                index: range.end.saturating_sub(1),
                len: self.source.len(),
            }
            .into());
        }
        info!(
            "tracking frames {}..{} at {} fps",
            range.start,
            range.end,
            self.source.fps()
        );

        let mut zone: Option<CenterZone> = None;
        let mut records = Vec::with_capacity(range.len());
        for index in range {
            let frame = self.source.frame(index)?;
            let zone = match zone {
                Some(zone) => zone,
                None => {
                    let (width, height) = frame.dimensions();
                    let built = CenterZone::new(width, height, center_percent)?;
                    debug!("center zone {:?} in a {width}x{height} arena", built.bounds());
                    zone = Some(built);
                    built
                }
            };

            let output = self.tracker.process(&frame)?;
            let record = zone.record(index, output.coordinate);
            on_frame(&record, &output)?;
            records.push(record);
        }

        let stats = match &zone {
            Some(zone) => SessionStats::from_records(&records, zone, self.source.fps()),
            None => SessionStats::default(),
        };
        info!(
            "{} frames tracked, {:.2}% in center",
            stats.total_frames,
            stats.percent_in_center()
        );
        Ok(SessionReport {
            records,
            stats,
            zone,
        })
    }

    /// Track a time window and log every frame to `sink`.
    ///
    /// `duration_seconds = None` runs to the end of the source.
    pub fn analyze<W: Write>(
        &mut self,
        start_seconds: f64,
        duration_seconds: Option<f64>,
        center_percent: f32,
        sink: &mut CsvSink<W>,
    ) -> Result<SessionReport, SessionError> {
        let range = self
            .source
            .frame_range(start_seconds, duration_seconds.unwrap_or(f64::INFINITY))?;
        let report = self.run(range, center_percent, |record, _| {
            sink.write(record)?;
            Ok(())
        })?;
        sink.flush()?;
        Ok(report)
    }

    /// Get a reference to the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &MotionTracker<B> {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::source::InMemorySource;
    use crate::tracker::Frame;

    const FLOOR: [u8; 3] = [200, 200, 200];
    const MOUSE: [u8; 3] = [30, 30, 30];

    fn recording() -> Vec<Frame> {
        let mut frames = vec![Frame::filled(80, 60, FLOOR); 20];
        // Disjoint positions, so no pixel stays dark long enough to be absorbed.
        for cx in [25, 40, 55] {
            let mut frame = Frame::filled(80, 60, FLOOR);
            frame.fill_block(cx - 6, 24, cx + 6, 36, MOUSE);
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_run_produces_one_record_per_frame() {
        let source = InMemorySource::new(recording(), 10.0);
        let mut session = TrackingSession::with_default_config(source).unwrap();

        let mut seen = 0;
        let report = session
            .run(0..23, 50.0, |_, _| {
                seen += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, 23);
        assert_eq!(report.records.len(), 23);
        assert!(report.records[..20].iter().all(|r| r.x.is_none()));
        let last = report.records[22];
        assert_eq!((last.frame, last.x, last.y), (22, Some(55.0), Some(30.0)));
        assert!(last.in_center);
        assert_eq!(session.tracker().frames_processed(), 23);
        assert_eq!(session.source().len(), 23);

        assert_eq!(report.stats.tracked_frames, 3);
        assert_eq!(report.stats.frames_in_center, 3);
        assert_eq!(report.stats.frames_out_of_center, 20);
        assert_eq!(report.stats.seconds_in_center, 0.3);
    }

    #[test]
    fn test_analyze_writes_csv() {
        let source = InMemorySource::new(recording(), 10.0);
        let mut session = TrackingSession::with_default_config(source).unwrap();
        let mut sink = CsvSink::from_writer(Vec::new());

        // 1.5 s at 10 fps: frames 15..23, clamped to the end.
        let report = session.analyze(1.5, Some(60.0), 50.0, &mut sink).unwrap();
        assert_eq!(report.records.first().map(|r| r.frame), Some(15));
        assert_eq!(sink.rows(), 8);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert!(text.starts_with("frame,x,y,in_center\n15,,,false\n"));
    }

    #[test]
    fn test_errors_propagate() {
        let source = InMemorySource::new(recording(), 10.0);
        let mut session = TrackingSession::with_default_config(source).unwrap();
        assert!(matches!(
            session.run(0..5, 0.0, |_, _| Ok(())),
            Err(SessionError::InvalidCenterPercent(_))
        ));
        assert!(matches!(
            session.run(0..40, 50.0, |_, _| Ok(())),
            Err(SessionError::Source(SourceError::IndexOutOfRange { .. }))
        ));

        let mut sink = CsvSink::from_writer(Vec::new());
        assert!(matches!(
            session.analyze(10.0, None, 50.0, &mut sink),
            Err(SessionError::Source(SourceError::StartBeyondEnd { .. }))
        ));
    }

    #[test]
    fn test_empty_range() {
        let source = InMemorySource::new(recording(), 10.0);
        let mut session = TrackingSession::with_default_config(source).unwrap();
        let report = session.run(5..5, 50.0, |_, _| Ok(())).unwrap();
        assert!(report.records.is_empty());
        assert!(report.zone.is_none());
        assert_eq!(report.stats, SessionStats::default());
    }
}
