//! Athletrack Processing Core: The Analysis Engine
//!
//! Turns pose-engine landmark streams into athletic test results:
//! - **Calibration:** Project image pixels onto a clicked meter axis
//! - **Event Detection:** Line crossings and ground contacts between frames
//! - **Smoothing:** Moving-average speed and acceleration chains
//! - **Test Runs:** Jump, sprint and kick state machines
//!
//! This crate is pure computation: no I/O, no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod calibrator;
pub mod event_detector;
pub mod overlay;
pub mod scale;
pub mod session;
pub mod smoothing;

pub use calibrator::{CalibrationProgress, Calibrator};
pub use event_detector::{EventDetector, GroundContact, TrackedState};
pub use overlay::OverlayGeometry;
pub use scale::FrameScale;
pub use session::{BallDetector, FrameOutcome, TestEvent, TestObserver, TestRun, TestState};
