use nalgebra::Point2;

/// Track lifecycle of the single tracked subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackStatus {
    /// No coordinate has been accepted yet, or the track was declared lost
    #[default]
    NoTrack,
    /// A coordinate is held and reported on every frame
    Tracking,
}

/// Last accepted position of the subject, carried across frames.
///
/// Only the candidate selector mutates it. A fresh state holds no
/// coordinate; once set, it always holds the most recent detected or
/// carried-forward position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackState {
    last_coordinate: Option<Point2<f32>>,
    fallback_streak: u32,
}

impl TrackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TrackStatus {
        match self.last_coordinate {
            Some(_) => TrackStatus::Tracking,
            None => TrackStatus::NoTrack,
        }
    }

    pub fn last_coordinate(&self) -> Option<Point2<f32>> {
        self.last_coordinate
    }

    /// Consecutive frames that reused the last coordinate without a detection.
    pub fn fallback_streak(&self) -> u32 {
        self.fallback_streak
    }

    pub(crate) fn accept(&mut self, coordinate: Point2<f32>) {
        self.last_coordinate = Some(coordinate);
        self.fallback_streak = 0;
    }

    /// Count one more frame without a detection and hand back the held coordinate.
    pub(crate) fn carry_forward(&mut self) -> Option<Point2<f32>> {
        if self.last_coordinate.is_some() {
            self.fallback_streak += 1;
        }
        self.last_coordinate
    }

    pub(crate) fn mark_lost(&mut self) {
        self.last_coordinate = None;
        self.fallback_streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_has_no_track() {
        let state = TrackState::new();
        assert_eq!(state.status(), TrackStatus::NoTrack);
        assert_eq!(state.last_coordinate(), None);
    }

    #[test]
    fn test_carry_forward_counts_streak() {
        let mut state = TrackState::new();
        assert_eq!(state.carry_forward(), None);
        assert_eq!(state.fallback_streak(), 0);

        state.accept(Point2::new(3.0, 4.0));
        assert_eq!(state.status(), TrackStatus::Tracking);
        assert_eq!(state.carry_forward(), Some(Point2::new(3.0, 4.0)));
        assert_eq!(state.carry_forward(), Some(Point2::new(3.0, 4.0)));
        assert_eq!(state.fallback_streak(), 2);

        state.accept(Point2::new(5.0, 4.0));
        assert_eq!(state.fallback_streak(), 0);
    }

    #[test]
    fn test_mark_lost_returns_to_no_track() {
        let mut state = TrackState::new();
        state.accept(Point2::new(1.0, 1.0));
        state.mark_lost();
        assert_eq!(state.status(), TrackStatus::NoTrack);
    }
}
