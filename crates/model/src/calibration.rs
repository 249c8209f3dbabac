//! Pixel-to-meter calibration.
//!
//! A calibration is a one-dimensional linear projection: every pixel is
//! projected orthogonally onto the calibration axis and mapped to meters.
//! Distances are therefore measured along the axis only, which matches
//! motion that runs parallel to the calibration line (run lanes, kick lanes,
//! jump mats).

use serde::{Deserialize, Serialize};

use crate::geometry::{LineSegment, Point2D};
use crate::kind::TestKind;

/// One calibration click: a pixel position and its known real-world value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub pixel: Point2D,
    pub meters: f64,
}

impl CalibrationSample {
    pub fn new(pixel: Point2D, meters: f64) -> Self {
        Self { pixel, meters }
    }
}

/// A finalized linear pixel/meter projection.
///
/// `unit_direction` always has length 1. `meters_per_pixel` is signed: it is
/// negative when meter values decrease along the clicked direction, and all
/// projections honor that sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    pub origin: Point2D,
    pub unit_direction: Point2D,
    pub meters_per_pixel: f64,
    pub origin_meter_value: f64,
}

impl CalibrationModel {
    /// Build the projection from the first and last calibration samples.
    ///
    /// Returns `None` when the two pixels coincide or both samples carry the
    /// same meter value, since neither defines a usable scale.
    pub fn from_endpoints(first: &CalibrationSample, last: &CalibrationSample) -> Option<Self> {
        let delta = last.pixel - first.pixel;
        let unit_direction = delta.normalized()?;
        let meters_per_pixel = (last.meters - first.meters) / delta.length();
        if meters_per_pixel == 0.0 || !meters_per_pixel.is_finite() {
            return None;
        }
        Some(Self {
            origin: first.pixel,
            unit_direction,
            meters_per_pixel,
            origin_meter_value: first.meters,
        })
    }

    /// Signed meter value of any pixel, projected orthogonally onto the axis.
    pub fn project_pixel_to_meters(&self, point: &Point2D) -> f64 {
        let along = (*point - self.origin).dot(&self.unit_direction);
        along * self.meters_per_pixel + self.origin_meter_value
    }

    /// Pixel on the calibration axis carrying the given meter value.
    pub fn project_meters_to_pixel(&self, meters: f64) -> Point2D {
        let along = (meters - self.origin_meter_value) / self.meters_per_pixel;
        self.origin + self.unit_direction * along
    }

    /// Along-axis distance in meters between two pixels.
    pub fn distance_in_meters(&self, a: &Point2D, b: &Point2D) -> f64 {
        (self.project_pixel_to_meters(a) - self.project_pixel_to_meters(b)).abs()
    }

    /// Unsigned scale factor.
    pub fn pixels_per_meter(&self) -> f64 {
        1.0 / self.meters_per_pixel.abs()
    }

    /// Segment perpendicular to the axis through the pixel at `meters`,
    /// extending `half_length` pixels to each side.
    pub fn line_at(&self, meters: f64, half_length: f64) -> LineSegment {
        LineSegment::centered(
            self.project_meters_to_pixel(meters),
            self.unit_direction.perpendicular(),
            half_length,
        )
    }
}

/// A completed calibration in its persisted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCalibration {
    pub kind: TestKind,
    pub model: CalibrationModel,
    pub samples: Vec<CalibrationSample>,
    /// Validation warnings raised when the calibration was finalized.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}
