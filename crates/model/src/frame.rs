//! Recorded landmark streams and the pose-engine boundary.
//!
//! Recordings use the same append-only JSONL layout as live capture logs:
//! an optional `#`-prefixed header line followed by one frame per line.

use athletrack_common::error::AthleteResult;
use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;
use crate::landmark::LandmarkSnapshot;

/// Monotonic frame timestamp in milliseconds.
pub type TimestampMs = f64;

/// Ball position reported by an external object detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallObservation {
    /// Normalized X coordinate [0.0, 1.0].
    pub x: f64,
    /// Normalized Y coordinate [0.0, 1.0].
    pub y: f64,
    /// Detection confidence [0.0, 1.0].
    pub confidence: f64,
}

impl BallObservation {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// One recorded frame: pose-engine output plus optional ball detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Milliseconds since the capture started.
    #[serde(rename = "t")]
    pub timestamp_ms: TimestampMs,

    /// Pose-engine landmarks for this frame.
    #[serde(default)]
    pub landmarks: LandmarkSnapshot,

    /// Ball detection for this frame, if the detector found one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball: Option<BallObservation>,
}

/// Header written as the first (`#`-prefixed) line of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Source image dimensions in pixels.
    pub image_width: u32,
    pub image_height: u32,

    /// Nominal capture frame rate.
    pub fps: u32,
}

impl RecordingHeader {
    pub fn new(image_width: u32, image_height: u32, fps: u32) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            image_width,
            image_height,
            fps,
        }
    }
}

/// Parse frames from JSONL content (one JSON object per line).
pub fn parse_frames(jsonl: &str) -> Result<Vec<LandmarkFrame>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Read the `#` header line of a recording, if present.
pub fn parse_header(jsonl: &str) -> Option<RecordingHeader> {
    jsonl
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.strip_prefix('#'))
        .and_then(|header| serde_json::from_str(header.trim()).ok())
}

/// Serialize frames to JSONL, header first.
pub fn serialize_frames(
    header: &RecordingHeader,
    frames: &[LandmarkFrame],
) -> Result<String, serde_json::Error> {
    let mut output = format!("# {}\n", serde_json::to_string(header)?);
    for frame in frames {
        output.push_str(&serde_json::to_string(frame)?);
        output.push('\n');
    }
    Ok(output)
}

/// A video frame handed to the pose engine.
///
/// Pixel data stays with the capture layer; the core only needs identity,
/// time and dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoFrame {
    pub index: u64,
    pub timestamp_ms: TimestampMs,
    pub width: u32,
    pub height: u32,
}

/// External pose-estimation engine.
///
/// Callers await each detection before submitting the next frame, so a run
/// never has more than one request in flight.
#[async_trait::async_trait]
pub trait PoseEngine: Send {
    /// Detect body landmarks in a frame. A frame without a person yields an
    /// empty snapshot, not an error.
    async fn detect(&mut self, frame: &VideoFrame) -> AthleteResult<LandmarkSnapshot>;
}
