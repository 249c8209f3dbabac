//! Ball speed after a kick.
//!
//! The ball position comes from an injected [`BallDetector`]. Speed is the
//! calibrated distance between the first and last marks divided by the time
//! between the two vertical-line crossings.

use athletrack_common::clock::{ms_to_secs, RunClock};
use athletrack_common::config::KickConfig;
use athletrack_model::frame::BallObservation;
use athletrack_model::kind::TestKind;
use athletrack_model::landmark::LandmarkSnapshot;
use athletrack_model::result::{CrossingRecord, KickMetrics, TestMetrics, TrajectorySample};

use super::{FrameContext, RunNotes, Step};
use crate::event_detector::{vertical_line_crossing, TrackedState};

const MPS_TO_KMH: f64 = 3.6;

/// Locates the ball in a frame.
pub trait BallDetector {
    fn detect(&mut self, snapshot: &LandmarkSnapshot, timestamp_ms: f64)
        -> Option<BallObservation>;
}

impl<F> BallDetector for F
where
    F: FnMut(&LandmarkSnapshot, f64) -> Option<BallObservation>,
{
    fn detect(&mut self, snapshot: &LandmarkSnapshot, timestamp_ms: f64) -> Option<BallObservation> {
        self(snapshot, timestamp_ms)
    }
}

/// Meter values of the two timing lines.
fn timing_marks() -> [f64; 2] {
    let meters = TestKind::Kick.calibration_meters();
    [meters[0], meters[meters.len() - 1]]
}

#[derive(Debug)]
pub struct KickState {
    config: KickConfig,
    clock: RunClock,
    crossings: Vec<CrossingRecord>,
    trajectory: Vec<TrajectorySample>,
}

impl KickState {
    pub fn new(config: KickConfig) -> Self {
        Self {
            config,
            clock: RunClock::new(),
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

    fn next_mark(&self) -> Option<f64> {
        timing_marks().get(self.crossings.len()).copied()
    }

    pub(crate) fn process_frame(
        &mut self,
        ctx: &mut FrameContext<'_>,
        ball: &mut dyn BallDetector,
        snapshot: &LandmarkSnapshot,
        timestamp_ms: f64,
    ) -> Step {
        let Some(observation) = ball.detect(snapshot, timestamp_ms).filter(|obs| {
            obs.confidence >= self.config.min_confidence && obs.x.is_finite() && obs.y.is_finite()
        }) else {
            return Step::Skipped;
        };
        let position = ctx.scale.to_pixels(observation.point());
        let elapsed_ms = self.clock.relative_ms(timestamp_ms);

        self.trajectory.push(TrajectorySample {
            timestamp_ms,
            position,
        });

        let Some(previous) =
            ctx.detector
                .track_position(TestKind::Kick.tracked_id(), position, elapsed_ms)
        else {
            return Step::Tracked;
        };
        let current = TrackedState::new(position, elapsed_ms);

        while let Some(meters) = self.next_mark() {
            let line_x = ctx.model.project_meters_to_pixel(meters).x;
            let Some(hit) = vertical_line_crossing(&previous, &current, line_x) else {
                break;
            };
            self.crossings.push(CrossingRecord {
                meters,
                timestamp_ms: hit.crossing.timestamp_ms,
                position: hit.crossing.position,
            });
            tracing::debug!(
                meters,
                elapsed_ms = hit.crossing.timestamp_ms,
                direction = ?hit.direction,
                "Kick line crossed"
            );
            ctx.notes.progress(format!("Ball crossed {meters} m"));
        }

        if self.next_mark().is_none() {
            Step::Finished(self.finalize(ctx.notes))
        } else {
            Step::Tracked
        }
    }

    fn finalize(&self, notes: &mut RunNotes) -> TestMetrics {
        let (distance_m, flight_time_s) = match (self.crossings.first(), self.crossings.last()) {
            (Some(start), Some(end)) => (
                (end.meters - start.meters).abs(),
                ms_to_secs(end.timestamp_ms - start.timestamp_ms),
            ),
            _ => (0.0, 0.0),
        };
        let raw_speed = if flight_time_s > 0.0 {
            distance_m / flight_time_s
        } else {
            0.0
        };

        let (speed_mps, clamped) = self.config.plausible_speed_mps.clamp(raw_speed);
        if clamped {
            notes.warn(format!(
                "ball speed {raw_speed:.2} m/s is outside {:.1}-{:.1} m/s; reported as {speed_mps:.2} m/s",
                self.config.plausible_speed_mps.min, self.config.plausible_speed_mps.max
            ));
        }

        TestMetrics::Kick(KickMetrics {
            distance_m,
            flight_time_s,
            speed_mps,
            speed_kmh: speed_mps * MPS_TO_KMH,
            crossings: self.crossings.clone(),
            trajectory: self.trajectory.clone(),
        })
    }
}
