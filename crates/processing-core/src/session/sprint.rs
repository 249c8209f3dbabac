//! Linear sprint with timed splits.
//!
//! The hip midpoint is tested against a line through each calibrated mark,
//! perpendicular to the calibration axis. Marks must be crossed in order.

use athletrack_common::clock::{ms_to_secs, RunClock};
use athletrack_common::config::SprintConfig;
use athletrack_model::kind::TestKind;
use athletrack_model::landmark::{BodyLandmark, LandmarkSnapshot};
use athletrack_model::result::{
    CrossingRecord, SplitMetrics, SprintMetrics, TestMetrics, TrajectorySample,
};

use super::{FrameContext, RunNotes, Step};
use crate::event_detector::{segment_crossing, TrackedState};
use crate::smoothing::{AccelerationEstimator, SpeedTracker};

/// Splits and totals derived from ordered crossings.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitSummary {
    pub splits: Vec<SplitMetrics>,
    pub distance_m: f64,
    pub total_time_s: f64,
    pub average_speed_mps: f64,
}

/// Derive splits from crossings sorted by meter value.
///
/// Split acceleration is `distance / time²`, matching results recorded by
/// earlier versions.
pub fn summarize_splits(crossings: &[CrossingRecord]) -> SplitSummary {
    let splits = crossings
        .windows(2)
        .map(|pair| {
            let distance = (pair[1].meters - pair[0].meters).abs();
            let time_s = ms_to_secs(pair[1].timestamp_ms - pair[0].timestamp_ms);
            let (average_speed_mps, average_acceleration_mps2) = if time_s > 0.0 {
                (distance / time_s, distance / (time_s * time_s))
            } else {
                (0.0, 0.0)
            };
            SplitMetrics {
                from_m: pair[0].meters,
                to_m: pair[1].meters,
                time_s,
                average_speed_mps,
                average_acceleration_mps2,
            }
        })
        .collect();

    let (distance_m, total_time_s) = match (crossings.first(), crossings.last()) {
        (Some(first), Some(last)) => (
            (last.meters - first.meters).abs(),
            ms_to_secs(last.timestamp_ms - first.timestamp_ms),
        ),
        _ => (0.0, 0.0),
    };
    let average_speed_mps = if total_time_s > 0.0 {
        distance_m / total_time_s
    } else {
        0.0
    };

    SplitSummary {
        splits,
        distance_m,
        total_time_s,
        average_speed_mps,
    }
}

#[derive(Debug)]
pub struct SprintState {
    config: SprintConfig,
    clock: RunClock,
    speed: SpeedTracker,
    acceleration: AccelerationEstimator,
    /// Peak acceleration in m/s per millisecond.
    peak_acceleration: f64,
    crossings: Vec<CrossingRecord>,
    trajectory: Vec<TrajectorySample>,
}

impl SprintState {
    pub fn new(config: SprintConfig) -> Self {
        Self {
            speed: SpeedTracker::new(config.position_window, config.speed_window),
            acceleration: AccelerationEstimator::new(config.acceleration_history),
            config,
            clock: RunClock::new(),
            peak_acceleration: 0.0,
            crossings: vec![],
            trajectory: vec![],
        }
    }

    pub fn crossings(&self) -> &[CrossingRecord] {
        &self.crossings
    }

    pub fn trajectory(&self) -> &[TrajectorySample] {
        &self.trajectory
    }

    /// Meter value of the next line to cross.
    pub fn next_mark(&self) -> Option<f64> {
        TestKind::Sprint
            .calibration_meters()
            .get(self.crossings.len())
            .copied()
    }

    pub fn current_speed_mps(&self) -> f64 {
        self.speed.current_speed()
    }

    pub(crate) fn process_frame(
        &mut self,
        ctx: &mut FrameContext<'_>,
        snapshot: &LandmarkSnapshot,
        timestamp_ms: f64,
    ) -> Step {
        let Some(hips) =
            snapshot.midpoint(BodyLandmark::LeftHip, BodyLandmark::RightHip, ctx.min_visibility)
        else {
            return Step::Skipped;
        };
        let position = ctx.scale.to_pixels(hips);
        let elapsed_ms = self.clock.relative_ms(timestamp_ms);

        self.trajectory.push(TrajectorySample {
            timestamp_ms,
            position,
        });

        let metric = position * ctx.model.meters_per_pixel.abs();
        let speed = self.speed.add_sample(metric, timestamp_ms);
        let acceleration = self.acceleration.add_sample(speed, timestamp_ms);
        self.peak_acceleration = self.peak_acceleration.max(acceleration);

        let Some(previous) =
            ctx.detector
                .track_position(TestKind::Sprint.tracked_id(), position, elapsed_ms)
        else {
            return Step::Tracked;
        };
        let current = TrackedState::new(position, elapsed_ms);
        let half_length = ctx.scale.diagonal();

        while let Some(meters) = self.next_mark() {
            let line = ctx.model.line_at(meters, half_length);
            let Some(hit) = segment_crossing(&previous, &current, &line) else {
                break;
            };
            self.crossings.push(CrossingRecord {
                meters,
                timestamp_ms: hit.timestamp_ms,
                position: hit.position,
            });
            tracing::debug!(meters, elapsed_ms = hit.timestamp_ms, "Sprint line crossed");
            ctx.notes.progress(format!(
                "Crossed {meters} m at {:.2} s",
                ms_to_secs(hit.timestamp_ms)
            ));
        }

        if self.next_mark().is_none() {
            Step::Finished(self.finalize(ctx.notes))
        } else {
            Step::Tracked
        }
    }

    fn finalize(&self, notes: &mut RunNotes) -> TestMetrics {
        let summary = summarize_splits(&self.crossings);
        let (average_speed_mps, clamped) = self
            .config
            .plausible_speed_mps
            .clamp(summary.average_speed_mps);
        if clamped {
            notes.warn(format!(
                "sprint speed {:.2} m/s is outside {:.1}-{:.1} m/s; reported as {average_speed_mps:.2} m/s",
                summary.average_speed_mps,
                self.config.plausible_speed_mps.min,
                self.config.plausible_speed_mps.max
            ));
        }

        TestMetrics::Sprint(SprintMetrics {
            crossings: self.crossings.clone(),
            splits: summary.splits,
            distance_m: summary.distance_m,
            total_time_s: summary.total_time_s,
            average_speed_mps,
            max_speed_mps: self.speed.max_speed(),
            peak_acceleration_mps2: self.peak_acceleration * 1000.0,
            speed_history: self.speed.history().to_vec(),
            trajectory: self.trajectory.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athletrack_model::calibration::{CalibrationModel, CalibrationSample};
    use athletrack_model::geometry::Point2D;
    use athletrack_model::landmark::Landmark;

    use crate::event_detector::EventDetector;
    use crate::scale::FrameScale;

    fn crossing(meters: f64, timestamp_ms: f64) -> CrossingRecord {
        CrossingRecord {
            meters,
            timestamp_ms,
            position: Point2D::ZERO,
        }
    }

    #[test]
    fn test_summarize_splits() {
        let summary = summarize_splits(&[
            crossing(0.0, 0.0),
            crossing(15.0, 2000.0),
            crossing(30.0, 3800.0),
        ]);
        assert_eq!(summary.splits.len(), 2);
        assert!((summary.splits[0].time_s - 2.0).abs() < 1e-9);
        assert!((summary.splits[1].time_s - 1.8).abs() < 1e-9);
        assert!((summary.splits[0].average_speed_mps - 7.5).abs() < 1e-9);
        assert!((summary.splits[0].average_acceleration_mps2 - 3.75).abs() < 1e-9);
        assert!((summary.total_time_s - 3.8).abs() < 1e-9);
        assert!((summary.distance_m - 30.0).abs() < 1e-9);
        assert!((summary.average_speed_mps - 30.0 / 3.8).abs() < 1e-9);
        assert_eq!(format!("{:.2}", summary.average_speed_mps), "7.89");
    }

    #[test]
    fn test_summarize_zero_time_split() {
        let summary = summarize_splits(&[crossing(0.0, 100.0), crossing(15.0, 100.0)]);
        assert_eq!(summary.splits[0].average_speed_mps, 0.0);
        assert_eq!(summary.average_speed_mps, 0.0);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize_splits(&[]);
        assert!(summary.splits.is_empty());
        assert_eq!(summary.total_time_s, 0.0);
    }

    fn hips_at(x: f64, width: f64) -> LandmarkSnapshot {
        let hip = Landmark::new(x / width, 0.5, 0.9);
        LandmarkSnapshot::from_points(&[(BodyLandmark::LeftHip, hip), (BodyLandmark::RightHip, hip)])
    }

    #[test]
    fn test_lines_crossed_in_order() {
        // 0 m at x=100, 30 m at x=1000: 30 px per meter
        let model = CalibrationModel::from_endpoints(
            &CalibrationSample::new(Point2D::new(100.0, 500.0), 0.0),
            &CalibrationSample::new(Point2D::new(1000.0, 500.0), 30.0),
        )
        .unwrap();
        let scale = FrameScale::from_calibration(1100.0, 1000.0, &model);
        let mut detector = EventDetector::new();
        let mut notes = RunNotes::default();
        let mut sprint = SprintState::new(SprintConfig::default());

        let mut finished = None;
        // 75 px (2.5 m) every 250 ms = 10 m/s, starting 1 m behind the line
        for i in 0..20 {
            let x = 70.0 + 75.0 * i as f64;
            let mut ctx = FrameContext {
                model: &model,
                detector: &mut detector,
                scale: &scale,
                min_visibility: 0.5,
                notes: &mut notes,
            };
            if let Step::Finished(metrics) =
                sprint.process_frame(&mut ctx, &hips_at(x, 1100.0), 1000.0 + 250.0 * i as f64)
            {
                finished = Some(metrics);
                break;
            }
        }

        let Some(TestMetrics::Sprint(metrics)) = finished else {
            panic!("sprint did not finish");
        };
        assert_eq!(metrics.crossings.len(), 3);
        // Crossing times are relative to the first frame
        assert!((metrics.crossings[0].timestamp_ms - 100.0).abs() < 1e-6);
        assert!((metrics.crossings[1].timestamp_ms - 1600.0).abs() < 1e-6);
        assert!((metrics.crossings[2].timestamp_ms - 3100.0).abs() < 1e-6);
        assert!((metrics.total_time_s - 3.0).abs() < 1e-6);
        assert!((metrics.average_speed_mps - 10.0).abs() < 1e-6);
        assert!((metrics.max_speed_mps - 10.0).abs() < 1e-6);
        assert!(notes.warnings.is_empty());
    }
}
