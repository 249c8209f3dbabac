//! Read-only geometry for drawing a run on top of the video.
//!
//! Renderers consume this as plain data (it serializes to JSON); nothing
//! here feeds back into analysis.

use serde::Serialize;

use athletrack_model::calibration::{CalibrationModel, CalibrationSample};
use athletrack_model::geometry::{LineSegment, Point2D};
use athletrack_model::kind::TestKind;

use crate::scale::FrameScale;

/// Tick half-length as a fraction of the image diagonal.
const TICK_FRACTION: f64 = 0.03;

/// A labelled line at a calibrated meter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterMark {
    pub meters: f64,
    pub segment: LineSegment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayGeometry {
    /// Pixels the user clicked, in click order.
    pub calibration_clicks: Vec<Point2D>,
    /// First-to-last calibration line.
    pub calibration_line: Option<LineSegment>,
    pub marks: Vec<MeterMark>,
    /// Jump ground line in pixels.
    pub ground_y: Option<f64>,
    pub crossings: Vec<Point2D>,
    pub trajectory: Vec<Point2D>,
}

impl OverlayGeometry {
    /// Calibration-derived geometry. Marks are drawn the way each test
    /// evaluates them: full perpendicular lines for sprints, vertical lines
    /// for kicks and short ticks for jumps.
    pub fn for_calibration(
        kind: TestKind,
        samples: &[CalibrationSample],
        model: Option<&CalibrationModel>,
        scale: &FrameScale,
    ) -> Self {
        let calibration_clicks = samples.iter().map(|s| s.pixel).collect::<Vec<_>>();
        let calibration_line = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) if samples.len() > 1 => {
                Some(LineSegment::new(first.pixel, last.pixel))
            }
            _ => None,
        };

        let marks = model
            .map(|model| {
                kind.calibration_meters()
                    .iter()
                    .map(|&meters| MeterMark {
                        meters,
                        segment: mark_segment(kind, model, meters, scale),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            calibration_clicks,
            calibration_line,
            marks,
            ..Self::default()
        }
    }

    pub fn with_ground(mut self, ground_y: f64) -> Self {
        self.ground_y = Some(ground_y);
        self
    }

    pub fn with_crossings(mut self, crossings: impl IntoIterator<Item = Point2D>) -> Self {
        self.crossings = crossings.into_iter().collect();
        self
    }

    pub fn with_trajectory(mut self, trajectory: impl IntoIterator<Item = Point2D>) -> Self {
        self.trajectory = trajectory.into_iter().collect();
        self
    }
}

fn mark_segment(
    kind: TestKind,
    model: &CalibrationModel,
    meters: f64,
    scale: &FrameScale,
) -> LineSegment {
    match kind {
        TestKind::Sprint => model.line_at(meters, scale.diagonal()),
        TestKind::Kick => {
            let x = model.project_meters_to_pixel(meters).x;
            LineSegment::new(Point2D::new(x, 0.0), Point2D::new(x, scale.image_height))
        }
        TestKind::Jump => model.line_at(meters, scale.diagonal() * TICK_FRACTION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kick_samples() -> Vec<CalibrationSample> {
        vec![
            CalibrationSample::new(Point2D::new(200.0, 400.0), 0.0),
            CalibrationSample::new(Point2D::new(1200.0, 420.0), 10.0),
        ]
    }

    #[test]
    fn test_uncalibrated_overlay_has_no_marks() {
        let scale = FrameScale::new(1280.0, 720.0, 0.0);
        let overlay = OverlayGeometry::for_calibration(TestKind::Kick, &kick_samples()[..1], None, &scale);
        assert_eq!(overlay.calibration_clicks.len(), 1);
        assert!(overlay.calibration_line.is_none());
        assert!(overlay.marks.is_empty());
    }

    #[test]
    fn test_kick_marks_are_vertical() {
        let samples = kick_samples();
        let model = CalibrationModel::from_endpoints(&samples[0], &samples[1]).unwrap();
        let scale = FrameScale::from_calibration(1280.0, 720.0, &model);
        let overlay = OverlayGeometry::for_calibration(TestKind::Kick, &samples, Some(&model), &scale);

        assert_eq!(overlay.marks.len(), 2);
        for mark in &overlay.marks {
            assert!((mark.segment.p1.x - mark.segment.p2.x).abs() < 1e-9);
            assert_eq!(mark.segment.p2.y, 720.0);
        }
        assert!((overlay.marks[1].segment.p1.x - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlay_serializes() {
        let overlay = OverlayGeometry::default()
            .with_ground(612.0)
            .with_crossings([Point2D::new(1.0, 2.0)]);
        let json = serde_json::to_value(&overlay).unwrap();
        assert_eq!(json["ground_y"], 612.0);
        assert_eq!(json["crossings"][0]["x"], 1.0);
    }
}
