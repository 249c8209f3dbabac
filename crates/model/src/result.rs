//! Finalized test results.
//!
//! A result carries the headline metrics plus everything needed to audit
//! them afterwards: crossing timestamps, contact points and the raw
//! trajectory that was tracked. Results are immutable once produced.

use serde::{Deserialize, Serialize};

use crate::frame::TimestampMs;
use crate::geometry::Point2D;
use crate::kind::TestKind;

/// A raw tracked position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub timestamp_ms: TimestampMs,
    /// Pixel position.
    pub position: Point2D,
}

/// A smoothed speed sample from the sprint filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub timestamp_ms: TimestampMs,
    /// Smoothed speed (meters per second for sprints).
    pub speed: f64,
    /// Smoothed position the speed was derived from.
    pub position: Point2D,
}

/// An interpolated crossing of a calibration line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossingRecord {
    /// Meter value of the crossed line.
    pub meters: f64,
    /// Crossing time relative to the start of the run.
    pub timestamp_ms: TimestampMs,
    /// Interpolated pixel position of the crossing.
    pub position: Point2D,
}

/// Takeoff or landing contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub timestamp_ms: TimestampMs,
    /// Pixel position of the ankle midpoint.
    pub position: Point2D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpMetrics {
    /// Reported distance, clamped to the plausible range.
    pub distance_m: f64,
    /// Distance before clamping.
    pub raw_distance_m: f64,
    pub flight_time_s: f64,
    pub average_horizontal_speed_mps: f64,
    pub takeoff: ContactRecord,
    pub landing: ContactRecord,
    /// Standing height estimated from landmarks before takeoff.
    #[serde(default)]
    pub estimated_body_height_m: Option<f64>,
    pub trajectory: Vec<TrajectorySample>,
}

/// Time between two consecutive line crossings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitMetrics {
    pub from_m: f64,
    pub to_m: f64,
    pub time_s: f64,
    pub average_speed_mps: f64,
    /// `distance / time²`. Kept for compatibility with earlier results; it is
    /// half the constant-acceleration-from-rest value.
    pub average_acceleration_mps2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintMetrics {
    pub crossings: Vec<CrossingRecord>,
    pub splits: Vec<SplitMetrics>,
    pub distance_m: f64,
    pub total_time_s: f64,
    /// Known distance over total time, clamped to the plausible range.
    pub average_speed_mps: f64,
    pub max_speed_mps: f64,
    pub peak_acceleration_mps2: f64,
    pub speed_history: Vec<SpeedSample>,
    pub trajectory: Vec<TrajectorySample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KickMetrics {
    pub distance_m: f64,
    pub flight_time_s: f64,
    /// Clamped to the plausible range.
    pub speed_mps: f64,
    pub speed_kmh: f64,
    pub crossings: Vec<CrossingRecord>,
    pub trajectory: Vec<TrajectorySample>,
}

/// Kind-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestMetrics {
    Jump(JumpMetrics),
    Sprint(SprintMetrics),
    Kick(KickMetrics),
}

/// A finalized attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Assigned by the result store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    pub metrics: TestMetrics,

    /// Validation warnings raised during the attempt.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl TestResult {
    pub fn new(metrics: TestMetrics, created_at: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: created_at.into(),
            metrics,
            warnings: vec![],
        }
    }

    pub fn kind(&self) -> TestKind {
        match self.metrics {
            TestMetrics::Jump(_) => TestKind::Jump,
            TestMetrics::Sprint(_) => TestKind::Sprint,
            TestMetrics::Kick(_) => TestKind::Kick,
        }
    }

    /// One-line human readable summary.
    pub fn headline(&self) -> String {
        match &self.metrics {
            TestMetrics::Jump(m) => format!(
                "jump {:.2} m in {:.2} s ({:.2} m/s)",
                m.distance_m, m.flight_time_s, m.average_horizontal_speed_mps
            ),
            TestMetrics::Sprint(m) => {
                let splits = m
                    .splits
                    .iter()
                    .map(|s| format!("{:.0}-{:.0} m {:.2} s", s.from_m, s.to_m, s.time_s))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "sprint {:.0} m in {:.2} s ({:.2} m/s avg, {:.2} m/s max) [{splits}]",
                    m.distance_m, m.total_time_s, m.average_speed_mps, m.max_speed_mps
                )
            }
            TestMetrics::Kick(m) => format!(
                "kick {:.2} m/s ({:.1} km/h) over {:.1} m",
                m.speed_mps, m.speed_kmh, m.distance_m
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kick_result() -> TestResult {
        TestResult::new(
            TestMetrics::Kick(KickMetrics {
                distance_m: 10.0,
                flight_time_s: 0.5,
                speed_mps: 20.0,
                speed_kmh: 72.0,
                crossings: vec![],
                trajectory: vec![],
            }),
            "2026-01-01T00:00:00Z",
        )
    }

    #[test]
    fn test_kind_follows_metrics() {
        assert_eq!(kick_result().kind(), TestKind::Kick);
    }

    #[test]
    fn test_metrics_are_tagged_by_kind() {
        let json = serde_json::to_string(&kick_result()).unwrap();
        assert!(json.contains("\"kind\":\"kick\""));
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn test_headline() {
        assert_eq!(kick_result().headline(), "kick 20.00 m/s (72.0 km/h) over 10.0 m");
    }
}
