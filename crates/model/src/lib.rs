//! Athletrack Model
//!
//! Defines the data contracts shared by the processing core and its
//! collaborators:
//! - **Geometry:** pixel-space points and line segments
//! - **Landmarks:** per-frame body landmark snapshots and JSONL recordings
//! - **Calibration:** pixel-to-meter projections and their stored form
//! - **Results:** finalized test metrics with their audit trail
//! - **Storage:** the key-value port results and calibrations persist through
//!
//! Landmark coordinates are normalized to `[0.0, 1.0]` relative to the
//! image; everything downstream of calibration works in pixels.

pub mod calibration;
pub mod frame;
pub mod geometry;
pub mod kind;
pub mod landmark;
pub mod result;
pub mod storage;

pub use calibration::*;
pub use frame::*;
pub use geometry::*;
pub use kind::*;
pub use landmark::*;
pub use result::*;
pub use storage::*;
