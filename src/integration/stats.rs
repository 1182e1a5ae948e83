//! Central-zone occupancy and summary statistics of a tracked session.

use nalgebra::{Point2, distance};
use serde::{Deserialize, Serialize};

use crate::integration::SessionError;
use crate::integration::csv_sink::TrackRecord;
use crate::tracker::Rect;

/// Box covering `center_percent` of the arena's width and height, centred in
/// the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterZone {
    bounds: Rect,
    arena_center: Point2<f32>,
}

impl CenterZone {
    pub fn new(arena_width: usize, arena_height: usize, center_percent: f32) -> Result<Self, SessionError> {
        if !(center_percent > 0.0 && center_percent <= 100.0) {
            return Err(SessionError::InvalidCenterPercent(center_percent));
        }
        let (width, height) = (arena_width as f32, arena_height as f32);
        Ok(Self {
            bounds: Rect::centered_fraction(width, height, center_percent),
            arena_center: Point2::new(width / 2.0, height / 2.0),
        })
    }

    pub fn bounds(&self) -> &Rect {
        &self.bounds
    }

    pub fn arena_center(&self) -> Point2<f32> {
        self.arena_center
    }

    /// Edges count as inside.
    pub fn contains(&self, point: &Point2<f32>) -> bool {
        self.bounds.contains(point.x, point.y)
    }

    pub fn distance_from_center(&self, point: &Point2<f32>) -> f32 {
        distance(&self.arena_center, point)
    }

    /// Build the log row for `frame`. A frame without a coordinate is out of
    /// the zone.
    pub fn record(&self, frame: usize, coordinate: Option<Point2<f32>>) -> TrackRecord {
        TrackRecord {
            frame,
            x: coordinate.map(|p| p.x),
            y: coordinate.map(|p| p.y),
            in_center: coordinate.is_some_and(|p| self.contains(&p)),
        }
    }
}

/// Occupancy summary over a list of [`TrackRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_frames: usize,
    /// Frames with a reported coordinate
    pub tracked_frames: usize,
    pub frames_in_center: usize,
    pub frames_out_of_center: usize,
    pub seconds_in_center: f64,
    pub seconds_out_of_center: f64,
    pub mean_distance_from_center: Option<f32>,
}

impl SessionStats {
    /// Summarise `records`, re-classifying each row against `zone` so the
    /// result does not depend on the stored `in_center` flags.
    pub fn from_records(records: &[TrackRecord], zone: &CenterZone, fps: f64) -> Self {
        let mut stats = Self {
            total_frames: records.len(),
            ..Default::default()
        };

        let mut distance_sum = 0.0f64;
        for point in records.iter().filter_map(TrackRecord::coordinate) {
            stats.tracked_frames += 1;
            if zone.contains(&point) {
                stats.frames_in_center += 1;
            }
            distance_sum += zone.distance_from_center(&point) as f64;
        }
        stats.frames_out_of_center = stats.total_frames - stats.frames_in_center;

        if fps > 0.0 {
            stats.seconds_in_center = stats.frames_in_center as f64 / fps;
            stats.seconds_out_of_center = stats.frames_out_of_center as f64 / fps;
        }
        if stats.tracked_frames > 0 {
            stats.mean_distance_from_center = Some((distance_sum / stats.tracked_frames as f64) as f32);
        }
        stats
    }

    pub fn percent_in_center(&self) -> f64 {
        percent(self.frames_in_center, self.total_frames)
    }

    pub fn percent_out_of_center(&self) -> f64 {
        percent(self.frames_out_of_center, self.total_frames)
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// `(frame, distance)` for every record with a coordinate.
pub fn distances_from_center(records: &[TrackRecord], zone: &CenterZone) -> Vec<(usize, f32)> {
    records
        .iter()
        .filter_map(|r| r.coordinate().map(|p| (r.frame, zone.distance_from_center(&p))))
        .collect()
}
