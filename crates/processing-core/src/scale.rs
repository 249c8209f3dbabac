//! Image-space scaling for normalized landmark coordinates.

use athletrack_model::calibration::CalibrationModel;
use athletrack_model::geometry::Point2D;

/// Maps normalized pose-engine coordinates to pixels and pixels to meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameScale {
    pub image_width: f64,
    pub image_height: f64,
    /// Unsigned pixels per meter along the calibration axis.
    pub pixels_per_meter: f64,
}

impl FrameScale {
    pub fn new(image_width: f64, image_height: f64, pixels_per_meter: f64) -> Self {
        Self {
            image_width,
            image_height,
            pixels_per_meter,
        }
    }

    pub fn from_calibration(image_width: f64, image_height: f64, model: &CalibrationModel) -> Self {
        Self::new(image_width, image_height, model.pixels_per_meter())
    }

    pub fn pixels_per_cm(&self) -> f64 {
        self.pixels_per_meter / 100.0
    }

    /// Normalized [0, 1] coordinates to image pixels.
    pub fn to_pixels(&self, normalized: Point2D) -> Point2D {
        Point2D::new(normalized.x * self.image_width, normalized.y * self.image_height)
    }

    /// Pixel length to meters; 0 without a usable scale.
    pub fn pixels_to_meters(&self, pixels: f64) -> f64 {
        if self.pixels_per_meter > 0.0 && self.pixels_per_meter.is_finite() {
            pixels / self.pixels_per_meter
        } else {
            0.0
        }
    }

    pub fn diagonal(&self) -> f64 {
        self.image_width.hypot(self.image_height)
    }
}
