//! Geometric event detection over tracked positions.
//!
//! Tracks the last position of each named object and detects line
//! crossings and ground contacts between consecutive samples. All
//! positions are in image pixels; y grows downward.

use std::collections::HashMap;

use athletrack_common::clock::ms_to_secs;
use athletrack_model::geometry::{LineSegment, Point2D};

/// Determinant magnitude below which two segments are treated as parallel.
const PARALLEL_EPSILON: f64 = 1e-10;

/// A position observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedState {
    pub position: Point2D,
    pub timestamp_ms: f64,
}

impl TrackedState {
    pub fn new(position: Point2D, timestamp_ms: f64) -> Self {
        Self {
            position,
            timestamp_ms,
        }
    }
}

/// Interpolated point where a movement segment crossed a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Fraction along the movement segment, in [0, 1].
    pub fraction: f64,
    pub position: Point2D,
    pub timestamp_ms: f64,
}

/// Horizontal travel direction when crossing a vertical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalDirection {
    Left,
    Right,
}

/// Vertical travel direction when crossing a horizontal line.
/// `Up` means decreasing image y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalDirection {
    Up,
    Down,
}

/// A crossing of an axis-aligned line, with travel direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCrossing<D> {
    pub crossing: Crossing,
    pub direction: D,
}

/// Instantaneous velocity in pixels per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
    pub magnitude: f64,
}

/// Last-known position per tracked object.
#[derive(Debug, Default)]
pub struct EventDetector {
    tracked: HashMap<String, TrackedState>,
}

impl EventDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new position for `id` and return the previous one, if any.
    pub fn track_position(
        &mut self,
        id: &str,
        position: Point2D,
        timestamp_ms: f64,
    ) -> Option<TrackedState> {
        self.tracked
            .insert(id.to_string(), TrackedState::new(position, timestamp_ms))
    }

    pub fn last_state(&self, id: &str) -> Option<&TrackedState> {
        self.tracked.get(id)
    }

    /// Forget one object, or every object when `id` is `None`.
    pub fn clear_tracking(&mut self, id: Option<&str>) {
        match id {
            Some(id) => {
                self.tracked.remove(id);
            }
            None => self.tracked.clear(),
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }
}

fn interpolate(prev: &TrackedState, curr: &TrackedState, fraction: f64) -> Crossing {
    Crossing {
        fraction,
        position: Point2D::lerp(&prev.position, &curr.position, fraction),
        timestamp_ms: prev.timestamp_ms + (curr.timestamp_ms - prev.timestamp_ms) * fraction,
    }
}

/// Intersection of the movement `prev -> curr` with an arbitrary segment.
///
/// Parallel or collinear movement never counts as a crossing.
pub fn segment_crossing(
    prev: &TrackedState,
    curr: &TrackedState,
    line: &LineSegment,
) -> Option<Crossing> {
    let r = curr.position - prev.position;
    let s = line.vector();
    let denom = r.cross(&s);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let qp = line.p1 - prev.position;
    let t = qp.cross(&s) / denom;
    let u = qp.cross(&r) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }

    Some(interpolate(prev, curr, t))
}

/// Whether `a -> b` moves onto or across zero from a nonzero side.
///
/// A sample resting exactly on the line counts once, when it arrives.
fn changes_side(a: f64, b: f64) -> bool {
    (a < 0.0 && b >= 0.0) || (a > 0.0 && b <= 0.0)
}

/// Crossing of the vertical line `x = line_x`.
pub fn vertical_line_crossing(
    prev: &TrackedState,
    curr: &TrackedState,
    line_x: f64,
) -> Option<AxisCrossing<HorizontalDirection>> {
    let before = prev.position.x - line_x;
    let after = curr.position.x - line_x;
    if !changes_side(before, after) {
        return None;
    }

    let dx = curr.position.x - prev.position.x;
    let fraction = (line_x - prev.position.x) / dx;
    if !(0.0..=1.0).contains(&fraction) {
        return None;
    }

    let direction = if dx > 0.0 {
        HorizontalDirection::Right
    } else {
        HorizontalDirection::Left
    };
    Some(AxisCrossing {
        crossing: interpolate(prev, curr, fraction),
        direction,
    })
}

/// Crossing of the horizontal line `y = line_y`.
pub fn horizontal_line_crossing(
    prev: &TrackedState,
    curr: &TrackedState,
    line_y: f64,
) -> Option<AxisCrossing<VerticalDirection>> {
    let before = prev.position.y - line_y;
    let after = curr.position.y - line_y;
    if !changes_side(before, after) {
        return None;
    }

    let dy = curr.position.y - prev.position.y;
    let fraction = (line_y - prev.position.y) / dy;
    if !(0.0..=1.0).contains(&fraction) {
        return None;
    }

    let direction = if dy > 0.0 {
        VerticalDirection::Down
    } else {
        VerticalDirection::Up
    };
    Some(AxisCrossing {
        crossing: interpolate(prev, curr, fraction),
        direction,
    })
}

/// Velocity between two positions, or `None` when time does not advance.
pub fn calculate_velocity(
    prev: &Point2D,
    curr: &Point2D,
    prev_ms: f64,
    curr_ms: f64,
) -> Option<Velocity> {
    let dt = ms_to_secs(curr_ms - prev_ms);
    if dt <= 0.0 || !dt.is_finite() {
        return None;
    }
    let vx = (curr.x - prev.x) / dt;
    let vy = (curr.y - prev.y) / dt;
    Some(Velocity {
        vx,
        vy,
        magnitude: vx.hypot(vy),
    })
}

/// Landing/takeoff detection against a horizontal ground line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// Ground line in image pixels.
    pub ground_y: f64,
    /// Minimum vertical speed in pixels per second.
    pub min_vertical_speed: f64,
}

impl GroundContact {
    pub fn new(ground_y: f64, min_vertical_speed: f64) -> Self {
        Self {
            ground_y,
            min_vertical_speed,
        }
    }

    /// Above ground before, at or below ground now, moving down fast enough.
    pub fn detect_landing(&self, prev: &TrackedState, curr: &TrackedState) -> bool {
        let Some(velocity) =
            calculate_velocity(&prev.position, &curr.position, prev.timestamp_ms, curr.timestamp_ms)
        else {
            return false;
        };
        prev.position.y < self.ground_y
            && curr.position.y >= self.ground_y
            && velocity.vy >= self.min_vertical_speed
    }

    /// At or below ground before, above ground now, moving up fast enough.
    pub fn detect_takeoff(&self, prev: &TrackedState, curr: &TrackedState) -> bool {
        let Some(velocity) =
            calculate_velocity(&prev.position, &curr.position, prev.timestamp_ms, curr.timestamp_ms)
        else {
            return false;
        };
        prev.position.y >= self.ground_y
            && curr.position.y < self.ground_y
            && -velocity.vy >= self.min_vertical_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(x: f64, y: f64, t: f64) -> TrackedState {
        TrackedState::new(Point2D::new(x, y), t)
    }

    #[test]
    fn test_track_position_returns_previous() {
        let mut detector = EventDetector::new();
        assert!(detector
            .track_position("runner", Point2D::new(1.0, 2.0), 0.0)
            .is_none());
        let prev = detector
            .track_position("runner", Point2D::new(3.0, 4.0), 33.0)
            .unwrap();
        assert_eq!(prev, state(1.0, 2.0, 0.0));
        assert_eq!(detector.last_state("runner"), Some(&state(3.0, 4.0, 33.0)));
    }

    #[test]
    fn test_objects_tracked_independently() {
        let mut detector = EventDetector::new();
        detector.track_position("ball", Point2D::new(1.0, 1.0), 0.0);
        detector.track_position("runner", Point2D::new(5.0, 5.0), 0.0);
        assert_eq!(detector.tracked_count(), 2);

        detector.clear_tracking(Some("ball"));
        assert!(detector.last_state("ball").is_none());
        assert!(detector.last_state("runner").is_some());

        detector.clear_tracking(None);
        assert_eq!(detector.tracked_count(), 0);
    }

    #[test]
    fn test_vertical_line_crossing_interpolates() {
        let hit = vertical_line_crossing(&state(5.0, 0.0, 0.0), &state(15.0, 10.0, 100.0), 10.0)
            .unwrap();
        assert!((hit.crossing.fraction - 0.5).abs() < 1e-12);
        assert_eq!(hit.crossing.position, Point2D::new(10.0, 5.0));
        assert!((hit.crossing.timestamp_ms - 50.0).abs() < 1e-9);
        assert_eq!(hit.direction, HorizontalDirection::Right);
    }

    #[test]
    fn test_vertical_line_not_crossed() {
        assert!(vertical_line_crossing(&state(5.0, 0.0, 0.0), &state(8.0, 0.0, 100.0), 10.0)
            .is_none());
    }

    #[test]
    fn test_vertical_line_leftward() {
        let hit = vertical_line_crossing(&state(20.0, 0.0, 0.0), &state(0.0, 0.0, 40.0), 15.0)
            .unwrap();
        assert_eq!(hit.direction, HorizontalDirection::Left);
        assert!((hit.crossing.fraction - 0.25).abs() < 1e-12);
        assert!((hit.crossing.timestamp_ms - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_landing_on_line_counts_once() {
        let on_line = vertical_line_crossing(&state(5.0, 0.0, 0.0), &state(10.0, 0.0, 10.0), 10.0);
        assert!(on_line.is_some());
        let leaving = vertical_line_crossing(&state(10.0, 0.0, 10.0), &state(12.0, 0.0, 20.0), 10.0);
        assert!(leaving.is_none());
    }

    #[test]
    fn test_horizontal_line_crossing_direction() {
        let down = horizontal_line_crossing(&state(0.0, 90.0, 0.0), &state(0.0, 110.0, 20.0), 100.0)
            .unwrap();
        assert_eq!(down.direction, VerticalDirection::Down);
        assert_eq!(down.crossing.position, Point2D::new(0.0, 100.0));

        let up = horizontal_line_crossing(&state(0.0, 110.0, 0.0), &state(0.0, 90.0, 20.0), 100.0)
            .unwrap();
        assert_eq!(up.direction, VerticalDirection::Up);
    }

    #[test]
    fn test_segment_crossing_perpendicular() {
        let line = LineSegment::new(Point2D::new(10.0, -50.0), Point2D::new(10.0, 50.0));
        let hit = segment_crossing(&state(0.0, 0.0, 0.0), &state(20.0, 0.0, 200.0), &line).unwrap();
        assert!((hit.fraction - 0.5).abs() < 1e-12);
        assert!((hit.position.x - 10.0).abs() < 1e-9);
        assert!((hit.timestamp_ms - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_crossing_misses_short_line() {
        let line = LineSegment::new(Point2D::new(10.0, 5.0), Point2D::new(10.0, 50.0));
        assert!(segment_crossing(&state(0.0, 0.0, 0.0), &state(20.0, 0.0, 200.0), &line).is_none());
    }

    #[test]
    fn test_segment_crossing_parallel_is_none() {
        let line = LineSegment::new(Point2D::new(0.0, 5.0), Point2D::new(100.0, 5.0));
        assert!(segment_crossing(&state(0.0, 0.0, 0.0), &state(20.0, 0.0, 200.0), &line).is_none());
        let collinear = LineSegment::new(Point2D::new(-10.0, 0.0), Point2D::new(100.0, 0.0));
        assert!(
            segment_crossing(&state(0.0, 0.0, 0.0), &state(20.0, 0.0, 200.0), &collinear).is_none()
        );
    }

    #[test]
    fn test_segment_crossing_not_reached() {
        let line = LineSegment::new(Point2D::new(30.0, -50.0), Point2D::new(30.0, 50.0));
        assert!(segment_crossing(&state(0.0, 0.0, 0.0), &state(20.0, 0.0, 200.0), &line).is_none());
    }

    #[test]
    fn test_calculate_velocity() {
        let v = calculate_velocity(&Point2D::new(0.0, 0.0), &Point2D::new(30.0, 40.0), 0.0, 500.0)
            .unwrap();
        assert!((v.vx - 60.0).abs() < 1e-9);
        assert!((v.vy - 80.0).abs() < 1e-9);
        assert!((v.magnitude - 100.0).abs() < 1e-9);

        assert!(calculate_velocity(&Point2D::ZERO, &Point2D::new(1.0, 1.0), 100.0, 100.0).is_none());
        assert!(calculate_velocity(&Point2D::ZERO, &Point2D::new(1.0, 1.0), 100.0, 50.0).is_none());
    }

    #[test]
    fn test_landing_detected() {
        let ground = GroundContact::new(500.0, 50.0);
        // 30 px down in 100 ms = 300 px/s
        assert!(ground.detect_landing(&state(0.0, 480.0, 0.0), &state(0.0, 510.0, 100.0)));
        assert!(!ground.detect_takeoff(&state(0.0, 480.0, 0.0), &state(0.0, 510.0, 100.0)));
    }

    #[test]
    fn test_takeoff_detected() {
        let ground = GroundContact::new(500.0, 50.0);
        assert!(ground.detect_takeoff(&state(0.0, 505.0, 0.0), &state(0.0, 470.0, 100.0)));
        assert!(ground.detect_takeoff(&state(0.0, 500.0, 0.0), &state(0.0, 490.0, 100.0)));
    }

    #[test]
    fn test_slow_contact_ignored() {
        let ground = GroundContact::new(500.0, 50.0);
        // 2 px in 100 ms = 20 px/s
        assert!(!ground.detect_landing(&state(0.0, 499.0, 0.0), &state(0.0, 501.0, 100.0)));
        assert!(!ground.detect_takeoff(&state(0.0, 501.0, 0.0), &state(0.0, 499.0, 100.0)));
    }

    #[test]
    fn test_contact_needs_time_to_advance() {
        let ground = GroundContact::new(500.0, 50.0);
        assert!(!ground.detect_landing(&state(0.0, 400.0, 100.0), &state(0.0, 600.0, 100.0)));
        assert!(!ground.detect_takeoff(&state(0.0, 600.0, 100.0), &state(0.0, 400.0, 90.0)));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn reversed_movement_crosses_at_complementary_fraction(
                x0 in -500.0f64..0.0,
                x1 in 1.0f64..500.0,
                y0 in -100.0f64..100.0,
                y1 in -100.0f64..100.0,
            ) {
                let forward = vertical_line_crossing(&state(x0, y0, 0.0), &state(x1, y1, 100.0), 0.5)
                    .unwrap();
                let backward = vertical_line_crossing(&state(x1, y1, 0.0), &state(x0, y0, 100.0), 0.5)
                    .unwrap();

                prop_assert_eq!(forward.direction, HorizontalDirection::Right);
                prop_assert_eq!(backward.direction, HorizontalDirection::Left);
                prop_assert!((forward.crossing.fraction + backward.crossing.fraction - 1.0).abs() < 1e-9);
                prop_assert!((forward.crossing.position.x - 0.5).abs() < 1e-9);
                prop_assert!((forward.crossing.position.y - backward.crossing.position.y).abs() < 1e-9);
            }

            #[test]
            fn segment_and_vertical_crossings_agree(
                x0 in -500.0f64..-1.0,
                x1 in 1.0f64..500.0,
                y0 in -100.0f64..100.0,
                y1 in -100.0f64..100.0,
            ) {
                let prev = state(x0, y0, 0.0);
                let curr = state(x1, y1, 100.0);
                let line = LineSegment::new(Point2D::new(0.0, -1000.0), Point2D::new(0.0, 1000.0));

                let general = segment_crossing(&prev, &curr, &line).unwrap();
                let axis = vertical_line_crossing(&prev, &curr, 0.0).unwrap();
                prop_assert!((general.fraction - axis.crossing.fraction).abs() < 1e-9);
                prop_assert!((general.timestamp_ms - axis.crossing.timestamp_ms).abs() < 1e-6);
            }
        }
    }
}
