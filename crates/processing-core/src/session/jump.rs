//! Standing long jump.
//!
//! Tracks the ankle midpoint against a horizontal ground line. The last
//! grounded sample before the feet rise is the takeoff, the first grounded
//! sample after the flight is the landing. The result is finalized once the
//! athlete has had `settle_delay_ms` to stabilize after landing.

use athletrack_common::clock::{ms_to_secs, Deadline};
use athletrack_common::config::{AthleteProfile, JumpConfig};
use athletrack_model::calibration::CalibrationModel;
use athletrack_model::geometry::Point2D;
use athletrack_model::kind::TestKind;
use athletrack_model::landmark::{BodyLandmark, LandmarkSnapshot};
use athletrack_model::result::{ContactRecord, JumpMetrics, TestMetrics, TrajectorySample};

use super::{FrameContext, RunNotes, Step};
use crate::event_detector::{GroundContact, TrackedState};
use crate::scale::FrameScale;
use crate::smoothing::MovingAverage;

/// Nose-to-ankle distance covers most, not all, of standing height.
const HEAD_TOP_FACTOR: f64 = 1.08;

/// Frames averaged into the standing height estimate.
const BODY_HEIGHT_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPhase {
    Grounded,
    Airborne,
    Landed,
}

#[derive(Debug)]
pub struct JumpState {
    config: JumpConfig,
    user_height_m: Option<f64>,
    body_height: MovingAverage,
    takeoff: Option<ContactRecord>,
    landing: Option<ContactRecord>,
    settle: Deadline,
    trajectory: Vec<TrajectorySample>,
}

impl JumpState {
    pub fn new(config: JumpConfig, profile: &AthleteProfile) -> Self {
        Self {
            config,
            user_height_m: profile.height_cm.map(|cm| cm / 100.0),
            body_height: MovingAverage::new(BODY_HEIGHT_WINDOW),
            takeoff: None,
            landing: None,
            settle: Deadline::new(),
            trajectory: vec![],
        }
    }

    pub fn phase(&self) -> JumpPhase {
        match (self.takeoff, self.landing) {
            (None, _) => JumpPhase::Grounded,
            (Some(_), None) => JumpPhase::Airborne,
            (Some(_), Some(_)) => JumpPhase::Landed,
        }
    }

    pub fn takeoff(&self) -> Option<&ContactRecord> {
        self.takeoff.as_ref()
    }

    pub fn landing(&self) -> Option<&ContactRecord> {
        self.landing.as_ref()
    }

    pub fn trajectory(&self) -> &[TrajectorySample] {
        &self.trajectory
    }

    /// Running standing-height estimate in meters.
    pub fn estimated_body_height_m(&self) -> Option<f64> {
        self.body_height.current()
    }

    /// Time at which the attempt will finalize, once landed.
    pub fn settle_due_ms(&self) -> Option<f64> {
        self.settle.due_ms()
    }

    /// Cancel a scheduled finalize. The landing stays recorded.
    pub fn cancel_settle(&mut self) {
        if self.settle.is_pending() {
            tracing::debug!(due_ms = ?self.settle.due_ms(), "Jump settle cancelled");
        }
        self.settle.cancel();
    }

    pub fn ground_y(&self, scale: &FrameScale) -> f64 {
        self.config.ground_level_fraction * scale.image_height
    }

    pub fn contact_points(&self) -> impl Iterator<Item = Point2D> + '_ {
        self.takeoff
            .iter()
            .chain(self.landing.iter())
            .map(|c| c.position)
    }

    pub(crate) fn process_frame(
        &mut self,
        ctx: &mut FrameContext<'_>,
        snapshot: &LandmarkSnapshot,
        timestamp_ms: f64,
    ) -> Step {
        let Some(ankles) = snapshot.midpoint(
            BodyLandmark::LeftAnkle,
            BodyLandmark::RightAnkle,
            ctx.min_visibility,
        ) else {
            return Step::Skipped;
        };
        let position = ctx.scale.to_pixels(ankles);

        self.trajectory.push(TrajectorySample {
            timestamp_ms,
            position,
        });
        if self.takeoff.is_none() {
            self.sample_body_height(ctx, snapshot, position);
        }

        let Some(previous) =
            ctx.detector
                .track_position(TestKind::Jump.tracked_id(), position, timestamp_ms)
        else {
            return Step::Tracked;
        };
        let current = TrackedState::new(position, timestamp_ms);
        let ground = GroundContact::new(
            self.ground_y(ctx.scale),
            self.config.min_vertical_speed_px_s,
        );

        match self.phase() {
            JumpPhase::Grounded if ground.detect_takeoff(&previous, &current) => {
                self.takeoff = Some(ContactRecord {
                    timestamp_ms: previous.timestamp_ms,
                    position: previous.position,
                });
                tracing::debug!(timestamp_ms = previous.timestamp_ms, "Takeoff");
                ctx.notes.progress("Takeoff detected");
                self.check_body_height(ctx.notes);
            }
            JumpPhase::Airborne if ground.detect_landing(&previous, &current) => {
                self.landing = Some(ContactRecord {
                    timestamp_ms,
                    position,
                });
                self.settle.schedule(timestamp_ms + self.config.settle_delay_ms);
                tracing::debug!(timestamp_ms, "Landing");
                ctx.notes.progress("Landing detected");
            }
            _ => {}
        }

        Step::Tracked
    }

    fn sample_body_height(
        &mut self,
        ctx: &FrameContext<'_>,
        snapshot: &LandmarkSnapshot,
        ankles: Point2D,
    ) {
        let Some(nose) = snapshot.visible(BodyLandmark::Nose, ctx.min_visibility) else {
            return;
        };
        let span_px = ctx.scale.to_pixels(nose).distance_to(&ankles);
        let height_m = ctx.scale.pixels_to_meters(span_px) * HEAD_TOP_FACTOR;
        if height_m > 0.0 {
            self.body_height.add_value(height_m);
        }
    }

    fn check_body_height(&self, notes: &mut RunNotes) {
        let (Some(declared), Some(estimated)) = (self.user_height_m, self.body_height.current())
        else {
            return;
        };
        let ratio = estimated / declared;
        if !self.config.body_height_ratio.contains(ratio) {
            notes.warn(format!(
                "estimated body height {estimated:.2} m is {ratio:.2}x the declared {declared:.2} m; check the calibration"
            ));
        }
    }

    /// Finalize once the settle deadline has passed.
    pub(crate) fn poll_settle(
        &mut self,
        model: &CalibrationModel,
        now_ms: f64,
        notes: &mut RunNotes,
    ) -> Option<TestMetrics> {
        if !self.settle.poll(now_ms) {
            return None;
        }
        let takeoff = self.takeoff?;
        let landing = self.landing?;

        let raw_distance_m = model.distance_in_meters(&takeoff.position, &landing.position);
        let (distance_m, clamped) = self.config.plausible_distance_m.clamp(raw_distance_m);
        if clamped {
            notes.warn(format!(
                "jump distance {raw_distance_m:.2} m is outside {:.1}-{:.1} m; reported as {distance_m:.2} m",
                self.config.plausible_distance_m.min, self.config.plausible_distance_m.max
            ));
        }

        let flight_time_s = ms_to_secs(landing.timestamp_ms - takeoff.timestamp_ms);
        let average_horizontal_speed_mps = if flight_time_s > 0.0 {
            distance_m / flight_time_s
        } else {
            0.0
        };

        Some(TestMetrics::Jump(JumpMetrics {
            distance_m,
            raw_distance_m,
            flight_time_s,
            average_horizontal_speed_mps,
            takeoff,
            landing,
            estimated_body_height_m: self.body_height.current(),
            trajectory: self.trajectory.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athletrack_model::calibration::CalibrationSample;
    use athletrack_model::landmark::Landmark;

    use crate::event_detector::EventDetector;

    const WIDTH: f64 = 1000.0;
    const HEIGHT: f64 = 1000.0;

    fn model() -> CalibrationModel {
        // 0 m at x=100, 3 m at x=700: 200 px per meter
        CalibrationModel::from_endpoints(
            &CalibrationSample::new(Point2D::new(100.0, 900.0), 0.0),
            &CalibrationSample::new(Point2D::new(700.0, 900.0), 3.0),
        )
        .unwrap()
    }

    fn pose(x_px: f64, y_px: f64) -> LandmarkSnapshot {
        let ankle = Landmark::new(x_px / WIDTH, y_px / HEIGHT, 0.9);
        // Nose 320 px above the ankles: 1.6 m at 200 px/m, ~1.73 m with head top
        let nose = Landmark::new(x_px / WIDTH, (y_px - 320.0) / HEIGHT, 0.9);
        LandmarkSnapshot::from_points(&[
            (BodyLandmark::LeftAnkle, ankle),
            (BodyLandmark::RightAnkle, ankle),
            (BodyLandmark::Nose, nose),
        ])
    }

    struct Harness {
        model: CalibrationModel,
        scale: FrameScale,
        detector: EventDetector,
        notes: RunNotes,
    }

    impl Harness {
        fn new() -> Self {
            let model = model();
            Self {
                scale: FrameScale::from_calibration(WIDTH, HEIGHT, &model),
                model,
                detector: EventDetector::new(),
                notes: RunNotes::default(),
            }
        }

        fn feed(&mut self, jump: &mut JumpState, snapshot: &LandmarkSnapshot, t: f64) -> bool {
            let mut ctx = FrameContext {
                model: &self.model,
                detector: &mut self.detector,
                scale: &self.scale,
                min_visibility: 0.5,
                notes: &mut self.notes,
            };
            matches!(jump.process_frame(&mut ctx, snapshot, t), Step::Tracked)
        }
    }

    #[test]
    fn test_full_jump_sequence() {
        let mut harness = Harness::new();
        let mut jump = JumpState::new(JumpConfig::default(), &AthleteProfile::with_height_cm(175.0));

        // Ground line at 850 px. Standing at y=900.
        assert!(harness.feed(&mut jump, &pose(100.0, 900.0), 0.0));
        assert!(harness.feed(&mut jump, &pose(100.0, 900.0), 100.0));
        assert_eq!(jump.phase(), JumpPhase::Grounded);

        // Rise 100 px in 100 ms
        harness.feed(&mut jump, &pose(200.0, 800.0), 200.0);
        assert_eq!(jump.phase(), JumpPhase::Airborne);
        assert_eq!(jump.takeoff().unwrap().position, Point2D::new(100.0, 900.0));
        assert_eq!(jump.takeoff().unwrap().timestamp_ms, 100.0);

        harness.feed(&mut jump, &pose(350.0, 750.0), 300.0);
        harness.feed(&mut jump, &pose(450.0, 800.0), 400.0);
        harness.feed(&mut jump, &pose(500.0, 900.0), 500.0);
        assert_eq!(jump.phase(), JumpPhase::Landed);
        assert_eq!(jump.settle_due_ms(), Some(1000.0));

        assert!(jump.poll_settle(&harness.model, 999.0, &mut harness.notes).is_none());
        let Some(TestMetrics::Jump(metrics)) =
            jump.poll_settle(&harness.model, 1000.0, &mut harness.notes)
        else {
            panic!("jump did not finalize");
        };

        assert!((metrics.distance_m - 2.0).abs() < 1e-9);
        assert!((metrics.flight_time_s - 0.4).abs() < 1e-9);
        assert!((metrics.average_horizontal_speed_mps - 5.0).abs() < 1e-9);
        assert!(harness.notes.warnings.is_empty());
        assert!(metrics.estimated_body_height_m.is_some());

        // Fires once
        assert!(jump.poll_settle(&harness.model, 2000.0, &mut harness.notes).is_none());
    }

    #[test]
    fn test_cancelled_settle_never_finalizes() {
        let mut harness = Harness::new();
        let mut jump = JumpState::new(JumpConfig::default(), &AthleteProfile::with_height_cm(175.0));

        harness.feed(&mut jump, &pose(100.0, 900.0), 0.0);
        harness.feed(&mut jump, &pose(200.0, 800.0), 100.0);
        harness.feed(&mut jump, &pose(300.0, 900.0), 200.0);
        assert_eq!(jump.settle_due_ms(), Some(700.0));

        jump.cancel_settle();
        assert_eq!(jump.settle_due_ms(), None);
        assert_eq!(jump.phase(), JumpPhase::Landed);
        assert!(jump.poll_settle(&harness.model, 10_000.0, &mut harness.notes).is_none());
    }

    #[test]
    fn test_slow_drift_is_not_a_takeoff() {
        let mut harness = Harness::new();
        let mut jump = JumpState::new(JumpConfig::default(), &AthleteProfile::with_height_cm(175.0));
        harness.feed(&mut jump, &pose(100.0, 852.0), 0.0);
        // 4 px in 100 ms = 40 px/s, below 50 px/s
        harness.feed(&mut jump, &pose(100.0, 848.0), 100.0);
        assert_eq!(jump.phase(), JumpPhase::Grounded);
    }

    #[test]
    fn test_invisible_ankles_skip_frame() {
        let mut harness = Harness::new();
        let mut jump = JumpState::new(JumpConfig::default(), &AthleteProfile::with_height_cm(175.0));
        let hidden = LandmarkSnapshot::from_points(&[(
            BodyLandmark::LeftAnkle,
            Landmark::new(0.5, 0.9, 0.9),
        )]);
        assert!(!harness.feed(&mut jump, &hidden, 0.0));
        assert!(jump.trajectory().is_empty());
        assert_eq!(harness.detector.tracked_count(), 0);
    }

    #[test]
    fn test_body_height_mismatch_warns() {
        let mut harness = Harness::new();
        // Estimate is ~1.73 m; a declared 120 cm is far off
        let mut jump = JumpState::new(JumpConfig::default(), &AthleteProfile::with_height_cm(120.0));
        harness.feed(&mut jump, &pose(100.0, 900.0), 0.0);
        harness.feed(&mut jump, &pose(200.0, 800.0), 100.0);
        assert_eq!(jump.phase(), JumpPhase::Airborne);
        assert_eq!(harness.notes.warnings.len(), 1);
        assert!(harness.notes.warnings[0].contains("estimated body height"));
    }

    #[test]
    fn test_implausible_distance_is_clamped() {
        let mut harness = Harness::new();
        let mut jump = JumpState::new(JumpConfig::default(), &AthleteProfile::with_height_cm(175.0));
        harness.feed(&mut jump, &pose(100.0, 900.0), 0.0);
        harness.feed(&mut jump, &pose(100.0, 800.0), 100.0);
        // Lands 5 m away
        harness.feed(&mut jump, &pose(1100.0, 900.0), 200.0);
        assert_eq!(jump.phase(), JumpPhase::Landed);

        let Some(TestMetrics::Jump(metrics)) =
            jump.poll_settle(&harness.model, 10_000.0, &mut harness.notes)
        else {
            panic!("jump did not finalize");
        };
        assert!((metrics.raw_distance_m - 5.0).abs() < 1e-9);
        assert_eq!(metrics.distance_m, 4.0);
        assert!(harness.notes.warnings.iter().any(|w| w.contains("outside")));
    }
}
