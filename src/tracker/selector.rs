//! Choice of the single reported point per frame.

use log::{debug, warn};
use nalgebra::{Point2, distance};
use serde::{Deserialize, Serialize};

use crate::tracker::candidates::Candidate;
use crate::tracker::frame::{BLUE, Frame, GREEN, RED};
use crate::tracker::track_state::TrackState;

pub(crate) const MARKER_RADIUS: i64 = 5;
pub(crate) const BOX_THICKNESS: i64 = 2;

/// How one candidate is picked when several survive the area filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Largest area wins; ties go to the earliest candidate
    #[default]
    LargestArea,
    /// Nearest candidate to the last coordinate within the jump limit,
    /// otherwise largest area
    ProximityFirst,
}

/// What the selector decided for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// A candidate was selected and became the new track position
    Detected(Candidate),
    /// Nothing detected; the held coordinate is reported again
    Carried(Point2<f32>),
    /// Nothing detected for too long; the track was dropped this frame
    Lost,
    /// Nothing detected and no track held
    Gap,
}

impl Observation {
    /// The coordinate reported for this frame, if any.
    pub fn coordinate(&self) -> Option<Point2<f32>> {
        match self {
            Self::Detected(candidate) => Some(candidate.centroid),
            Self::Carried(point) => Some(*point),
            Self::Lost | Self::Gap => None,
        }
    }

    pub fn is_detection(&self) -> bool {
        matches!(self, Self::Detected(_))
    }
}

/// Applies the configured [`SelectionPolicy`] and keeps [`TrackState`] current.
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    policy: SelectionPolicy,
    max_jump_distance: f32,
    max_fallback_frames: Option<u32>,
}

impl CandidateSelector {
    pub fn new(
        policy: SelectionPolicy,
        max_jump_distance: f32,
        max_fallback_frames: Option<u32>,
    ) -> Self {
        Self {
            policy,
            max_jump_distance,
            max_fallback_frames,
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Index of the candidate the policy picks, given the previous position.
    pub fn choose(&self, candidates: &[Candidate], last: Option<Point2<f32>>) -> Option<usize> {
        match (self.policy, last) {
            (SelectionPolicy::ProximityFirst, Some(last)) => {
                nearest_within(candidates, &last, self.max_jump_distance)
                    .or_else(|| largest_area(candidates))
            }
            _ => largest_area(candidates),
        }
    }

    /// Pick at most one candidate and update `state` accordingly.
    pub fn select(&self, mut candidates: Vec<Candidate>, state: &mut TrackState) -> Observation {
        if let Some(index) = self.choose(&candidates, state.last_coordinate()) {
            let chosen = candidates.swap_remove(index);
            state.accept(chosen.centroid);
            return Observation::Detected(chosen);
        }

        match state.carry_forward() {
            Some(point) => match self.max_fallback_frames {
                Some(limit) if state.fallback_streak() > limit => {
                    warn!(
                        "no detection for {} frames, dropping track at ({:.1}, {:.1})",
                        state.fallback_streak(),
                        point.x,
                        point.y
                    );
                    state.mark_lost();
                    Observation::Lost
                }
                _ => {
                    debug!("no candidate, carrying ({:.1}, {:.1}) forward", point.x, point.y);
                    Observation::Carried(point)
                }
            },
            None => Observation::Gap,
        }
    }
}

/// Burn the observation into `frame`: a red dot on a detection (with a green
/// box in largest-area mode), a blue dot on a carried coordinate.
pub fn draw_observation(frame: &mut Frame, observation: &Observation, policy: SelectionPolicy) {
    match observation {
        Observation::Detected(candidate) => {
            let (x, y) = marker_position(&candidate.centroid);
            frame.fill_circle(x, y, MARKER_RADIUS, RED);
            if policy == SelectionPolicy::LargestArea {
                frame.draw_rect(&candidate.bounds, GREEN, BOX_THICKNESS);
            }
        }
        Observation::Carried(point) => {
            let (x, y) = marker_position(point);
            frame.fill_circle(x, y, MARKER_RADIUS, BLUE);
        }
        Observation::Lost | Observation::Gap => {}
    }
}

pub(crate) fn marker_position(point: &Point2<f32>) -> (i64, i64) {
    (point.x as i64, point.y as i64)
}

/// First candidate of maximal area.
pub fn largest_area(candidates: &[Candidate]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        match best {
            Some(b) if candidates[b].area >= candidate.area => {}
            _ => best = Some(i),
        }
    }
    best
}

/// First candidate closest to `point`, if it lies within `max_distance`.
pub fn nearest_within(
    candidates: &[Candidate],
    point: &Point2<f32>,
    max_distance: f32,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let d = distance(&candidate.centroid, point);
        match best {
            Some((_, best_d)) if best_d <= d => {}
            _ => best = Some((i, d)),
        }
    }
    best.filter(|&(_, d)| d <= max_distance).map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::rect::Rect;
    use crate::tracker::track_state::TrackStatus;

    fn candidate(x: f32, y: f32, area: f64) -> Candidate {
        Candidate::new(Point2::new(x, y), area, Rect::new(x - 5.0, y - 5.0, 10.0, 10.0))
    }

    #[test]
    fn test_largest_area_ties_keep_first() {
        let candidates = vec![
            candidate(0.0, 0.0, 200.0),
            candidate(50.0, 0.0, 300.0),
            candidate(90.0, 0.0, 300.0),
        ];
        assert_eq!(largest_area(&candidates), Some(1));
        assert_eq!(largest_area(&[]), None);
    }

    #[test]
    fn test_proximity_picks_candidate_within_jump() {
        let selector = CandidateSelector::new(SelectionPolicy::ProximityFirst, 100.0, None);
        let last = Point2::new(100.0, 100.0);
        // 10 px away but small, 200 px away but large.
        let candidates = vec![candidate(300.0, 100.0, 900.0), candidate(110.0, 100.0, 150.0)];
        assert_eq!(selector.choose(&candidates, Some(last)), Some(1));
    }

    #[test]
    fn test_proximity_falls_back_to_largest_area() {
        let selector = CandidateSelector::new(SelectionPolicy::ProximityFirst, 100.0, None);
        let last = Point2::new(100.0, 100.0);
        // 150 px and 300 px away: neither qualifies.
        let candidates = vec![candidate(250.0, 100.0, 200.0), candidate(100.0, 400.0, 700.0)];
        assert_eq!(selector.choose(&candidates, Some(last)), Some(1));
    }

    #[test]
    fn test_proximity_without_history_uses_area() {
        let selector = CandidateSelector::new(SelectionPolicy::ProximityFirst, 100.0, None);
        let candidates = vec![candidate(0.0, 0.0, 120.0), candidate(10.0, 10.0, 400.0)];
        assert_eq!(selector.choose(&candidates, None), Some(1));
    }

    #[test]
    fn test_largest_area_ignores_history() {
        let selector = CandidateSelector::new(SelectionPolicy::LargestArea, 100.0, None);
        let candidates = vec![candidate(101.0, 100.0, 120.0), candidate(400.0, 400.0, 400.0)];
        assert_eq!(selector.choose(&candidates, Some(Point2::new(100.0, 100.0))), Some(1));
    }

    #[test]
    fn test_select_updates_and_carries_state() {
        let selector = CandidateSelector::new(SelectionPolicy::LargestArea, 100.0, None);
        let mut state = TrackState::new();

        assert_eq!(selector.select(vec![], &mut state), Observation::Gap);
        assert_eq!(state.status(), TrackStatus::NoTrack);

        let observation = selector.select(vec![candidate(20.0, 30.0, 500.0)], &mut state);
        assert!(observation.is_detection());
        assert_eq!(state.last_coordinate(), Some(Point2::new(20.0, 30.0)));

        let observation = selector.select(vec![], &mut state);
        assert_eq!(observation, Observation::Carried(Point2::new(20.0, 30.0)));
        assert_eq!(state.last_coordinate(), Some(Point2::new(20.0, 30.0)));
    }

    #[test]
    fn test_track_lost_after_fallback_limit() {
        let selector = CandidateSelector::new(SelectionPolicy::LargestArea, 100.0, Some(2));
        let mut state = TrackState::new();
        selector.select(vec![candidate(20.0, 30.0, 500.0)], &mut state);

        assert!(matches!(selector.select(vec![], &mut state), Observation::Carried(_)));
        assert!(matches!(selector.select(vec![], &mut state), Observation::Carried(_)));
        assert_eq!(selector.select(vec![], &mut state), Observation::Lost);
        assert_eq!(state.status(), TrackStatus::NoTrack);
        assert_eq!(selector.select(vec![], &mut state), Observation::Gap);
    }

    #[test]
    fn test_annotation_colours() {
        let policy = SelectionPolicy::LargestArea;
        let mut frame = Frame::filled(60, 60, [0; 3]);
        let detected = Observation::Detected(candidate(30.0, 30.0, 100.0));
        draw_observation(&mut frame, &detected, policy);
        assert_eq!(frame.pixel(30, 30), RED);
        assert_eq!(frame.pixel(25, 30), GREEN);

        let mut frame = Frame::filled(60, 60, [0; 3]);
        draw_observation(&mut frame, &Observation::Carried(Point2::new(10.0, 10.0)), policy);
        assert_eq!(frame.pixel(10, 10), BLUE);

        let mut frame = Frame::filled(60, 60, [0; 3]);
        draw_observation(&mut frame, &Observation::Gap, policy);
        assert_eq!(frame, Frame::filled(60, 60, [0; 3]));
    }

    #[test]
    fn test_proximity_annotation_has_no_box() {
        let selector = CandidateSelector::new(SelectionPolicy::ProximityFirst, 100.0, None);
        let mut frame = Frame::filled(60, 60, [0; 3]);
        let detected = Observation::Detected(candidate(30.0, 30.0, 100.0));
        draw_observation(&mut frame, &detected, selector.policy());
        assert_eq!(frame.pixel(25, 30), RED);
        // Outer half of the box stroke
        assert_eq!(frame.pixel(24, 30), [0; 3]);
    }
}
