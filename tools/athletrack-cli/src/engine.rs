//! Recorded stand-ins for the live pose engine and ball detector.
//!
//! A recording holds exactly what the engines produced during capture, so
//! replaying it gives the same analysis as the live session did.

use athletrack_common::error::{AthleteError, AthleteResult};
use athletrack_model::frame::{
    BallObservation, LandmarkFrame, PoseEngine, RecordingHeader, VideoFrame,
};
use athletrack_model::landmark::LandmarkSnapshot;
use athletrack_processing_core::BallDetector;

/// Serves recorded landmark snapshots by frame index.
#[derive(Debug, Clone)]
pub struct RecordedPoseEngine {
    snapshots: Vec<LandmarkSnapshot>,
}

impl RecordedPoseEngine {
    pub fn new(frames: &[LandmarkFrame]) -> Self {
        Self {
            snapshots: frames.iter().map(|f| f.landmarks.clone()).collect(),
        }
    }
}

#[async_trait::async_trait]
impl PoseEngine for RecordedPoseEngine {
    async fn detect(&mut self, frame: &VideoFrame) -> AthleteResult<LandmarkSnapshot> {
        self.snapshots
            .get(frame.index as usize)
            .cloned()
            .ok_or_else(|| {
                AthleteError::engine(format!("recording has no frame {}", frame.index))
            })
    }
}

/// Serves recorded ball observations by timestamp.
#[derive(Debug, Clone)]
pub struct RecordedBallTrack {
    /// Sorted by timestamp.
    observations: Vec<(f64, BallObservation)>,
}

impl RecordedBallTrack {
    pub fn new(frames: &[LandmarkFrame]) -> Self {
        let mut observations = frames
            .iter()
            .filter_map(|f| f.ball.map(|ball| (f.timestamp_ms, ball)))
            .collect::<Vec<_>>();
        observations.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl BallDetector for RecordedBallTrack {
    fn detect(&mut self, _: &LandmarkSnapshot, timestamp_ms: f64) -> Option<BallObservation> {
        self.observations
            .binary_search_by(|(t, _)| t.total_cmp(&timestamp_ms))
            .ok()
            .map(|i| self.observations[i].1)
    }
}

/// Video frame descriptors for a recording, in order.
pub fn video_frames(header: &RecordingHeader, frames: &[LandmarkFrame]) -> Vec<VideoFrame> {
    frames
        .iter()
        .enumerate()
        .map(|(index, frame)| VideoFrame {
            index: index as u64,
            timestamp_ms: frame.timestamp_ms,
            width: header.image_width,
            height: header.image_height,
        })
        .collect()
}
