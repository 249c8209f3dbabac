//! Frame-synchronous driver between a pose engine and a test run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use athletrack_common::clock::RateController;
use athletrack_common::error::{AthleteError, AthleteResult};
use athletrack_model::frame::{PoseEngine, VideoFrame};
use athletrack_processing_core::{FrameOutcome, FrameScale, TestRun};

/// Counters from one driver pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverSummary {
    pub frames_seen: u64,
    pub frames_analyzed: u64,
    pub frames_skipped: u64,
    pub completed: bool,
    pub stopped: bool,
}

/// Feeds frames to the engine one at a time and hands each snapshot to
/// the run. A frame is only submitted once the previous detection returned.
pub struct FrameDriver<E: PoseEngine> {
    engine: E,
    run: TestRun,
    scale: FrameScale,
    rate: RateController,
    stop_flag: Arc<AtomicBool>,
}

impl<E: PoseEngine> FrameDriver<E> {
    /// `max_fps` of 0 analyzes every frame.
    pub fn new(
        engine: E,
        run: TestRun,
        image_width: u32,
        image_height: u32,
        max_fps: u32,
    ) -> AthleteResult<Self> {
        let scale = run
            .frame_scale(image_width as f64, image_height as f64)
            .ok_or_else(|| AthleteError::precondition("run is not calibrated"))?;
        Ok(Self {
            engine,
            run,
            scale,
            rate: RateController::new(max_fps),
            stop_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Drive frames until the run completes, the source ends or the stop
    /// flag is set. A landing still settling when the source ends is
    /// finalized immediately.
    pub async fn run(
        &mut self,
        frames: impl IntoIterator<Item = VideoFrame>,
    ) -> AthleteResult<DriverSummary> {
        tracing::info!(kind = %self.run.kind(), "Frame driver started");
        let mut summary = DriverSummary::default();

        for frame in frames {
            if self.stop_flag.load(Ordering::Relaxed) {
                summary.stopped = true;
                break;
            }
            summary.frames_seen += 1;
            if !self.rate.should_tick(frame.timestamp_ms) {
                continue;
            }

            let snapshot = match self.engine.detect(&frame).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(error = %e, frame = frame.index, "Pose detection failed");
                    summary.frames_skipped += 1;
                    continue;
                }
            };
            summary.frames_analyzed += 1;

            match self
                .run
                .process_frame(&snapshot, frame.timestamp_ms, &self.scale)
            {
                FrameOutcome::Tracked => {}
                FrameOutcome::Skipped => summary.frames_skipped += 1,
                FrameOutcome::Completed => {
                    summary.completed = true;
                    break;
                }
                FrameOutcome::Ignored => break,
            }
        }

        if !summary.completed && !summary.stopped && self.run.advance_time(f64::INFINITY) {
            summary.completed = true;
        }

        tracing::info!(
            frames_seen = summary.frames_seen,
            frames_analyzed = summary.frames_analyzed,
            frames_skipped = summary.frames_skipped,
            completed = summary.completed,
            "Frame driver stopped"
        );
        Ok(summary)
    }

    /// Set the stop flag.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Get the stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn test_run(&self) -> &TestRun {
        &self.run
    }

    pub fn into_run(self) -> TestRun {
        self.run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athletrack_common::config::{AppConfig, AthleteProfile};
    use athletrack_model::geometry::Point2D;
    use athletrack_model::kind::TestKind;
    use athletrack_model::landmark::{BodyLandmark, Landmark, LandmarkSnapshot};
    use athletrack_processing_core::TestState;

    /// Runner at 9 m/s on a 1100 px wide frame, 30 px per meter.
    struct SyntheticRunner {
        calls: u64,
    }

    #[async_trait::async_trait]
    impl PoseEngine for SyntheticRunner {
        async fn detect(&mut self, frame: &VideoFrame) -> AthleteResult<LandmarkSnapshot> {
            self.calls += 1;
            let x = 70.0 + 0.27 * frame.timestamp_ms;
            let hip = Landmark::new(x / 1100.0, 0.5, 0.9);
            Ok(LandmarkSnapshot::from_points(&[
                (BodyLandmark::LeftHip, hip),
                (BodyLandmark::RightHip, hip),
            ]))
        }
    }

    fn sprint_run() -> TestRun {
        let mut run = TestRun::new(TestKind::Sprint, &AppConfig::default());
        run.start_calibration();
        for x in [100.0, 550.0, 1000.0] {
            run.add_calibration_click(Point2D::new(x, 500.0)).unwrap();
        }
        run.start_test(&AthleteProfile::default()).unwrap();
        run
    }

    fn frames(count: u64, step_ms: f64) -> Vec<VideoFrame> {
        (0..count)
            .map(|index| VideoFrame {
                index,
                timestamp_ms: index as f64 * step_ms,
                width: 1100,
                height: 1000,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_driver_runs_to_completion() {
        let engine = SyntheticRunner { calls: 0 };
        let mut driver = FrameDriver::new(engine, sprint_run(), 1100, 1000, 0).unwrap();
        let summary = driver.run(frames(200, 40.0)).await.unwrap();

        assert!(summary.completed);
        assert!(summary.frames_analyzed < 200);
        assert_eq!(driver.test_run().state(), TestState::Finalized);
    }

    #[tokio::test]
    async fn test_rate_limit_decimates_frames() {
        let engine = SyntheticRunner { calls: 0 };
        let mut driver = FrameDriver::new(engine, sprint_run(), 1100, 1000, 10).unwrap();
        let summary = driver.run(frames(10, 40.0)).await.unwrap();

        assert_eq!(summary.frames_seen, 10);
        // 0, 120, 240, 360 ms
        assert_eq!(summary.frames_analyzed, 4);
        assert_eq!(driver.engine.calls, 4);
    }

    #[tokio::test]
    async fn test_stop_flag_ends_loop() {
        let engine = SyntheticRunner { calls: 0 };
        let mut driver = FrameDriver::new(engine, sprint_run(), 1100, 1000, 0).unwrap();
        driver.stop();
        let summary = driver.run(frames(50, 40.0)).await.unwrap();

        assert!(summary.stopped);
        assert_eq!(summary.frames_analyzed, 0);
        assert_eq!(driver.test_run().state(), TestState::Running);
    }

    #[test]
    fn test_uncalibrated_run_rejected() {
        let run = TestRun::new(TestKind::Sprint, &AppConfig::default());
        let engine = SyntheticRunner { calls: 0 };
        assert!(FrameDriver::new(engine, run, 1100, 1000, 0).is_err());
    }
}
