//! Click-to-calibrate pixel/meter projection.
//!
//! The user clicks reference marks in a fixed order (for example the 0, 15
//! and 30 m cones of a sprint lane). The first and last clicks define the
//! projection; intermediate clicks are only validated.

use athletrack_common::clock::wall_clock_rfc3339;
use athletrack_common::config::CalibrationConfig;
use athletrack_common::error::{AthleteError, AthleteResult};
use athletrack_model::calibration::{CalibrationModel, CalibrationSample, StoredCalibration};
use athletrack_model::geometry::{LineSegment, Point2D};
use athletrack_model::kind::TestKind;

/// Outcome of a single calibration click.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationProgress {
    /// More clicks are needed; `next_meters` is the mark to click next.
    NeedMore {
        collected: usize,
        expected: usize,
        next_meters: f64,
    },
    /// The projection has been computed.
    Complete(CalibrationModel),
    /// The clicks cannot define a projection and were discarded.
    Rejected { reason: String },
}

/// Collects calibration clicks and owns the resulting projection.
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
    kind: Option<TestKind>,
    samples: Vec<CalibrationSample>,
    model: Option<CalibrationModel>,
    warnings: Vec<String>,
    created_at: Option<String>,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            kind: None,
            samples: vec![],
            model: None,
            warnings: vec![],
            created_at: None,
        }
    }

    /// Start collecting clicks for `kind`, discarding any previous state.
    pub fn begin_calibration(&mut self, kind: TestKind) {
        self.kind = Some(kind);
        self.samples.clear();
        self.model = None;
        self.warnings.clear();
        self.created_at = None;
        tracing::debug!(kind = %kind, expected = kind.calibration_meters().len(), "Calibration started");
    }

    /// Record the next click. Finalizes once the expected count is reached.
    pub fn add_point(&mut self, pixel: Point2D) -> AthleteResult<CalibrationProgress> {
        let kind = self
            .kind
            .ok_or_else(|| AthleteError::calibration("calibration has not been started"))?;

        if let Some(model) = self.model {
            return Ok(CalibrationProgress::Complete(model));
        }

        if !pixel.x.is_finite() || !pixel.y.is_finite() {
            return Err(AthleteError::calibration(format!(
                "calibration point ({}, {}) is not finite",
                pixel.x, pixel.y
            )));
        }

        let meters = kind.calibration_meters();
        let index = self.samples.len();
        self.samples.push(CalibrationSample::new(pixel, meters[index]));
        tracing::debug!(
            kind = %kind,
            point = index + 1,
            meters = meters[index],
            x = pixel.x,
            y = pixel.y,
            "Calibration point recorded"
        );

        if self.samples.len() < meters.len() {
            return Ok(CalibrationProgress::NeedMore {
                collected: self.samples.len(),
                expected: meters.len(),
                next_meters: meters[self.samples.len()],
            });
        }

        Ok(self.finalize(kind))
    }

    fn finalize(&mut self, kind: TestKind) -> CalibrationProgress {
        let first = self.samples[0];
        let last = self.samples[self.samples.len() - 1];

        let Some(model) = CalibrationModel::from_endpoints(&first, &last) else {
            let reason = format!(
                "calibration points at {} m and {} m are {:.2} px apart; click them again",
                first.meters,
                last.meters,
                first.pixel.distance_to(&last.pixel)
            );
            tracing::warn!(kind = %kind, "{reason}");
            self.samples.clear();
            return CalibrationProgress::Rejected { reason };
        };

        self.warnings = self.validate_intermediate(&model);
        self.warnings.extend(self.validate_line_separation(kind, &model));
        for warning in &self.warnings {
            tracing::warn!(kind = %kind, "{warning}");
        }

        self.model = Some(model);
        self.created_at = Some(wall_clock_rfc3339());
        tracing::info!(
            kind = %kind,
            meters_per_pixel = model.meters_per_pixel,
            warnings = self.warnings.len(),
            "Calibration complete"
        );
        CalibrationProgress::Complete(model)
    }

    /// Check intermediate clicks against the first-to-last line.
    fn validate_intermediate(&self, model: &CalibrationModel) -> Vec<String> {
        let n = self.samples.len();
        if n < 3 {
            return vec![];
        }

        let first = self.samples[0];
        let last = self.samples[n - 1];
        let line = LineSegment::new(first.pixel, last.pixel);
        let span = (last.meters - first.meters).abs();
        let mut warnings = vec![];

        for sample in &self.samples[1..n - 1] {
            if let Some(offset) = line.distance_to_line(&sample.pixel) {
                if offset > self.config.collinearity_tolerance_px {
                    warnings.push(format!(
                        "calibration point at {} m is {:.1} px off the calibration line (tolerance {:.1} px)",
                        sample.meters, offset, self.config.collinearity_tolerance_px
                    ));
                }
            }

            let projected = model.project_pixel_to_meters(&sample.pixel);
            if (projected - sample.meters).abs() > self.config.intermediate_tolerance_ratio * span {
                warnings.push(format!(
                    "calibration point at {} m projects to {:.2} m; check the mark spacing",
                    sample.meters, projected
                ));
            }
        }

        warnings
    }

    /// Kick timing lines are vertical; they need horizontal room between them.
    fn validate_line_separation(&self, kind: TestKind, model: &CalibrationModel) -> Option<String> {
        if kind != TestKind::Kick {
            return None;
        }
        let meters = kind.calibration_meters();
        let (first, last) = (meters[0], meters[meters.len() - 1]);
        let dx = (model.project_meters_to_pixel(last).x - model.project_meters_to_pixel(first).x).abs();
        (dx < self.config.min_kick_line_separation_px).then(|| {
            format!(
                "kick lines at {first} m and {last} m are only {dx:.1} px apart horizontally (minimum {:.1} px); place the marks across the frame",
                self.config.min_kick_line_separation_px
            )
        })
    }

    /// Reinstate a stored calibration without re-clicking.
    pub fn restore(&mut self, stored: &StoredCalibration) -> AthleteResult<()> {
        let model = stored.model;
        let unit_len = model.unit_direction.length();
        if (unit_len - 1.0).abs() > 1e-6
            || model.meters_per_pixel == 0.0
            || !model.meters_per_pixel.is_finite()
        {
            return Err(AthleteError::calibration(format!(
                "stored {} calibration is degenerate",
                stored.kind
            )));
        }

        self.kind = Some(stored.kind);
        self.samples = stored.samples.clone();
        self.model = Some(model);
        self.warnings = stored.warnings.clone();
        self.created_at = Some(stored.created_at.clone());
        tracing::info!(kind = %stored.kind, created_at = %stored.created_at, "Calibration restored");
        Ok(())
    }

    /// The completed calibration in its persisted form.
    pub fn stored(&self) -> Option<StoredCalibration> {
        Some(StoredCalibration {
            kind: self.kind?,
            model: self.model?,
            samples: self.samples.clone(),
            warnings: self.warnings.clone(),
            created_at: self.created_at.clone().unwrap_or_else(wall_clock_rfc3339),
        })
    }

    pub fn clear(&mut self) {
        self.kind = None;
        self.samples.clear();
        self.model = None;
        self.warnings.clear();
        self.created_at = None;
    }

    pub fn kind(&self) -> Option<TestKind> {
        self.kind
    }

    pub fn is_complete(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&CalibrationModel> {
        self.model.as_ref()
    }

    pub fn samples(&self) -> &[CalibrationSample] {
        &self.samples
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Meter value of the next mark to click, while collecting.
    pub fn next_expected_meters(&self) -> Option<f64> {
        if self.model.is_some() {
            return None;
        }
        self.kind?
            .calibration_meters()
            .get(self.samples.len())
            .copied()
    }

    pub fn project_pixel_to_meters(&self, point: &Point2D) -> Option<f64> {
        self.model.map(|m| m.project_pixel_to_meters(point))
    }

    pub fn project_meters_to_pixel(&self, meters: f64) -> Option<Point2D> {
        self.model.map(|m| m.project_meters_to_pixel(meters))
    }

    pub fn distance_in_meters(&self, a: &Point2D, b: &Point2D) -> Option<f64> {
        self.model.map(|m| m.distance_in_meters(a, b))
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}
