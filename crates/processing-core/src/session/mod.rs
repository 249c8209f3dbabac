//! Per-attempt test state machine.
//!
//! A [`TestRun`] walks through calibration, waits for a start, consumes
//! pose frames and finalizes exactly one [`TestResult`] per attempt. The
//! kind-specific logic lives in [`jump`], [`sprint`] and [`kick`]; this
//! module owns the shared lifecycle, the observer and the preconditions.

pub mod jump;
pub mod kick;
pub mod sprint;

use athletrack_common::clock::wall_clock_rfc3339;
use athletrack_common::config::{AppConfig, AthleteProfile, JumpConfig, KickConfig, SprintConfig};
use athletrack_common::error::{AthleteError, AthleteResult};
use athletrack_model::calibration::{CalibrationModel, StoredCalibration};
use athletrack_model::geometry::Point2D;
use athletrack_model::kind::TestKind;
use athletrack_model::landmark::LandmarkSnapshot;
use athletrack_model::result::{TestMetrics, TestResult};
use tokio::sync::mpsc::UnboundedSender;

use crate::calibrator::{CalibrationProgress, Calibrator};
use crate::event_detector::EventDetector;
use crate::overlay::OverlayGeometry;
use crate::scale::FrameScale;

pub use jump::{JumpPhase, JumpState};
pub use kick::{BallDetector, KickState};
pub use sprint::{summarize_splits, SplitSummary, SprintState};

/// Lifecycle of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    Uninitialized,
    Calibrating,
    /// Calibrated and waiting for a start.
    Idle,
    Running,
    Finalized,
}

/// Notifications delivered to the registered observer.
#[derive(Debug, Clone, PartialEq)]
pub enum TestEvent {
    Progress(String),
    CalibrationComplete(CalibrationModel),
    Complete(TestResult),
}

/// Receives [`TestEvent`]s from a run.
pub trait TestObserver {
    fn notify(&mut self, event: &TestEvent);
}

impl<F> TestObserver for F
where
    F: FnMut(&TestEvent),
{
    fn notify(&mut self, event: &TestEvent) {
        self(event)
    }
}

impl TestObserver for UnboundedSender<TestEvent> {
    fn notify(&mut self, event: &TestEvent) {
        // A dropped receiver only means nobody is listening anymore
        let _ = self.send(event.clone());
    }
}

/// What happened to a submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The run is not accepting frames.
    Ignored,
    /// Required landmarks were missing or not visible enough.
    Skipped,
    Tracked,
    /// The attempt finalized on this frame.
    Completed,
}

/// Result of one variant step.
pub(crate) enum Step {
    Skipped,
    Tracked,
    Finished(TestMetrics),
}

/// Progress messages and warnings raised while processing.
#[derive(Debug, Default)]
pub(crate) struct RunNotes {
    progress: Vec<String>,
    warnings: Vec<String>,
}

impl RunNotes {
    pub(crate) fn progress(&mut self, message: impl Into<String>) {
        self.progress.push(message.into());
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

/// Borrowed state shared by every variant while handling a frame.
pub(crate) struct FrameContext<'a> {
    pub model: &'a CalibrationModel,
    pub detector: &'a mut EventDetector,
    pub scale: &'a FrameScale,
    pub min_visibility: f64,
    pub notes: &'a mut RunNotes,
}

/// Per-kind run state.
#[derive(Debug)]
pub enum VariantState {
    Jump(JumpState),
    Sprint(SprintState),
    Kick(KickState),
}

#[derive(Debug, Clone)]
struct RunSettings {
    min_visibility: f64,
    jump: JumpConfig,
    sprint: SprintConfig,
    kick: KickConfig,
}

impl VariantState {
    fn new(kind: TestKind, settings: &RunSettings, profile: &AthleteProfile) -> Self {
        match kind {
            TestKind::Jump => VariantState::Jump(JumpState::new(settings.jump.clone(), profile)),
            TestKind::Sprint => VariantState::Sprint(SprintState::new(settings.sprint.clone())),
            TestKind::Kick => VariantState::Kick(KickState::new(settings.kick.clone())),
        }
    }

    /// Drop any timer still pending for the attempt.
    fn cancel_pending(&mut self) {
        if let VariantState::Jump(jump) = self {
            jump.cancel_settle();
        }
    }
}

/// One athlete attempt for a single test kind.
pub struct TestRun {
    kind: TestKind,
    state: TestState,
    settings: RunSettings,
    calibrator: Calibrator,
    detector: EventDetector,
    variant: VariantState,
    profile: AthleteProfile,
    ball_detector: Option<Box<dyn BallDetector>>,
    observer: Option<Box<dyn TestObserver>>,
    warnings: Vec<String>,
    result: Option<TestResult>,
}

impl TestRun {
    pub fn new(kind: TestKind, config: &AppConfig) -> Self {
        let settings = RunSettings {
            min_visibility: config.detection.min_visibility,
            jump: config.jump.clone(),
            sprint: config.sprint.clone(),
            kick: config.kick.clone(),
        };
        let profile = AthleteProfile::default();
        Self {
            kind,
            state: TestState::Uninitialized,
            variant: VariantState::new(kind, &settings, &profile),
            settings,
            calibrator: Calibrator::new(config.calibration.clone()),
            detector: EventDetector::new(),
            profile,
            ball_detector: None,
            observer: None,
            warnings: vec![],
            result: None,
        }
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    /// The finalized result of the current attempt.
    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub fn variant(&self) -> &VariantState {
        &self.variant
    }

    pub fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    /// Register the observer. Replaces any previous one.
    pub fn set_observer(&mut self, observer: impl TestObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Install the ball detector used by kick tests.
    pub fn set_ball_detector(&mut self, detector: impl BallDetector + 'static) {
        if self.kind != TestKind::Kick {
            tracing::debug!(kind = %self.kind, "Ball detector installed on a non-kick run");
        }
        self.ball_detector = Some(Box::new(detector));
    }

    fn emit(&mut self, event: TestEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.notify(&event);
        }
    }

    fn progress(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(kind = %self.kind, "{message}");
        self.emit(TestEvent::Progress(message));
    }

    fn absorb(&mut self, notes: RunNotes) {
        self.warnings.extend(notes.warnings);
        for message in notes.progress {
            self.progress(message);
        }
    }

    fn clear_run_data(&mut self) {
        self.variant.cancel_pending();
        self.detector.clear_tracking(None);
        self.variant = VariantState::new(self.kind, &self.settings, &self.profile);
        self.warnings.clear();
        self.result = None;
    }

    // -- Calibration --

    /// Begin collecting calibration clicks. Discards any previous
    /// calibration and attempt.
    pub fn start_calibration(&mut self) {
        self.calibrator.begin_calibration(self.kind);
        self.clear_run_data();
        self.state = TestState::Calibrating;
        let first = self.kind.calibration_meters()[0];
        self.progress(format!("Calibration started; click the {first} m mark"));
    }

    pub fn add_calibration_click(&mut self, pixel: Point2D) -> AthleteResult<CalibrationProgress> {
        if self.state != TestState::Calibrating {
            return Err(AthleteError::calibration(format!(
                "not calibrating (state {:?})",
                self.state
            )));
        }

        let progress = self.calibrator.add_point(pixel)?;
        match &progress {
            CalibrationProgress::NeedMore {
                collected,
                expected,
                next_meters,
            } => {
                self.progress(format!(
                    "Calibration point {collected}/{expected} recorded; click the {next_meters} m mark"
                ));
            }
            CalibrationProgress::Complete(model) => {
                let model = *model;
                self.state = TestState::Idle;
                self.emit(TestEvent::CalibrationComplete(model));
                self.progress("Calibration complete");
            }
            CalibrationProgress::Rejected { reason } => {
                let message = format!("Calibration rejected: {reason}");
                self.progress(message);
            }
        }
        Ok(progress)
    }

    /// Reinstate a stored calibration for this kind.
    pub fn restore_calibration(&mut self, stored: &StoredCalibration) -> AthleteResult<()> {
        if stored.kind != self.kind {
            return Err(AthleteError::calibration(format!(
                "stored calibration is for {}, run is {}",
                stored.kind, self.kind
            )));
        }
        self.calibrator.restore(stored)?;
        self.clear_run_data();
        self.state = TestState::Idle;
        self.emit(TestEvent::CalibrationComplete(stored.model));
        self.progress("Calibration restored");
        Ok(())
    }

    /// The completed calibration, ready to persist.
    pub fn calibration(&self) -> Option<StoredCalibration> {
        self.calibrator.stored()
    }

    /// Frame scale for the given image size, once calibrated.
    pub fn frame_scale(&self, image_width: f64, image_height: f64) -> Option<FrameScale> {
        self.calibrator
            .model()
            .map(|model| FrameScale::from_calibration(image_width, image_height, model))
    }

    // -- Attempt lifecycle --

    /// Start an attempt. A finalized attempt is reset first.
    ///
    /// Fails without changing state when not calibrated, when a jump has no
    /// athlete height, or when a kick has no ball detector.
    pub fn start_test(&mut self, profile: &AthleteProfile) -> AthleteResult<()> {
        match self.state {
            TestState::Idle | TestState::Finalized => {}
            TestState::Running => {
                return Err(AthleteError::precondition("a test is already running"));
            }
            TestState::Uninitialized | TestState::Calibrating => {
                return Err(AthleteError::precondition(format!(
                    "{} test is not calibrated",
                    self.kind
                )));
            }
        }

        if self.kind.requires_user_height() && !profile.height_cm.is_some_and(|h| h > 0.0) {
            return Err(AthleteError::precondition(format!(
                "{} test requires the athlete's height",
                self.kind
            )));
        }

        if self.kind == TestKind::Kick && self.ball_detector.is_none() {
            return Err(AthleteError::precondition(
                "kick test requires a ball detector",
            ));
        }

        self.profile = profile.clone();
        self.clear_run_data();
        self.state = TestState::Running;
        self.progress("Test started");
        Ok(())
    }

    /// Return to the calibrated idle state, discarding the attempt.
    ///
    /// Has no effect before calibration has completed.
    pub fn reset_test(&mut self) {
        match self.state {
            TestState::Uninitialized | TestState::Calibrating => {
                tracing::debug!(kind = %self.kind, state = ?self.state, "Reset ignored before calibration");
            }
            TestState::Idle | TestState::Running | TestState::Finalized => {
                self.clear_run_data();
                self.state = TestState::Idle;
                self.progress("Test reset");
            }
        }
    }

    /// Feed one pose frame.
    pub fn process_frame(
        &mut self,
        snapshot: &LandmarkSnapshot,
        timestamp_ms: f64,
        scale: &FrameScale,
    ) -> FrameOutcome {
        if self.state != TestState::Running {
            return FrameOutcome::Ignored;
        }
        if self.poll_deadline(timestamp_ms) {
            return FrameOutcome::Completed;
        }
        let Some(model) = self.calibrator.model().copied() else {
            return FrameOutcome::Ignored;
        };

        let mut notes = RunNotes::default();
        let step = {
            let mut ctx = FrameContext {
                model: &model,
                detector: &mut self.detector,
                scale,
                min_visibility: self.settings.min_visibility,
                notes: &mut notes,
            };
            match &mut self.variant {
                VariantState::Jump(jump) => jump.process_frame(&mut ctx, snapshot, timestamp_ms),
                VariantState::Sprint(sprint) => {
                    sprint.process_frame(&mut ctx, snapshot, timestamp_ms)
                }
                VariantState::Kick(kick) => match self.ball_detector.as_mut() {
                    Some(ball) => kick.process_frame(&mut ctx, &mut **ball, snapshot, timestamp_ms),
                    None => Step::Skipped,
                },
            }
        };
        self.absorb(notes);

        match step {
            Step::Skipped => {
                tracing::trace!(kind = %self.kind, timestamp_ms, "Frame skipped");
                FrameOutcome::Skipped
            }
            Step::Tracked if self.poll_deadline(timestamp_ms) => FrameOutcome::Completed,
            Step::Tracked => FrameOutcome::Tracked,
            Step::Finished(metrics) => {
                self.finalize(metrics);
                FrameOutcome::Completed
            }
        }
    }

    /// Advance logical time without a frame. Returns true when the attempt
    /// finalized.
    pub fn advance_time(&mut self, now_ms: f64) -> bool {
        self.state == TestState::Running && self.poll_deadline(now_ms)
    }

    fn poll_deadline(&mut self, now_ms: f64) -> bool {
        let VariantState::Jump(jump) = &mut self.variant else {
            return false;
        };
        let Some(model) = self.calibrator.model().copied() else {
            return false;
        };

        let mut notes = RunNotes::default();
        let metrics = jump.poll_settle(&model, now_ms, &mut notes);
        self.absorb(notes);

        match metrics {
            Some(metrics) => {
                self.finalize(metrics);
                true
            }
            None => false,
        }
    }

    fn finalize(&mut self, metrics: TestMetrics) {
        let mut result = TestResult::new(metrics, wall_clock_rfc3339());
        result.warnings = self
            .calibrator
            .warnings()
            .iter()
            .cloned()
            .chain(self.warnings.drain(..))
            .collect();

        tracing::info!(
            kind = %self.kind,
            warnings = result.warnings.len(),
            "{}",
            result.headline()
        );
        self.state = TestState::Finalized;
        self.result = Some(result.clone());
        self.emit(TestEvent::Complete(result));
    }

    // -- Rendering --

    /// Geometry for drawing the calibration and the current attempt.
    pub fn overlay(&self, scale: &FrameScale) -> OverlayGeometry {
        let base = OverlayGeometry::for_calibration(
            self.kind,
            self.calibrator.samples(),
            self.calibrator.model(),
            scale,
        );
        match &self.variant {
            VariantState::Jump(jump) => base
                .with_ground(jump.ground_y(scale))
                .with_crossings(jump.contact_points())
                .with_trajectory(jump.trajectory().iter().map(|s| s.position)),
            VariantState::Sprint(sprint) => base
                .with_crossings(sprint.crossings().iter().map(|c| c.position))
                .with_trajectory(sprint.trajectory().iter().map(|s| s.position)),
            VariantState::Kick(kick) => base
                .with_crossings(kick.crossings().iter().map(|c| c.position))
                .with_trajectory(kick.trajectory().iter().map(|s| s.position)),
        }
    }
}

impl std::fmt::Debug for TestRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRun")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("variant", &self.variant)
            .field("has_ball_detector", &self.ball_detector.is_some())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}
