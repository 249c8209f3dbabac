//! Body landmarks produced by the external pose engine.
//!
//! The engine reports the 33-point MediaPipe Pose topology. Coordinates are
//! normalized to the image (`(0, 0)` top-left, `(1, 1)` bottom-right) and
//! each point carries a visibility score in `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

/// Number of landmarks in a full snapshot.
pub const LANDMARK_COUNT: usize = 33;

/// Named body landmarks, in engine index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    /// Index into a snapshot's landmark list.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A single landmark observation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Normalized X coordinate [0.0, 1.0].
    pub x: f64,
    /// Normalized Y coordinate [0.0, 1.0].
    pub y: f64,
    /// Detection confidence [0.0, 1.0].
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }

    pub fn is_visible(&self, min_visibility: f64) -> bool {
        self.visibility >= min_visibility && self.x.is_finite() && self.y.is_finite()
    }

    /// Normalized position as a point.
    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// All landmarks detected in one processed frame.
///
/// A snapshot with fewer than [`LANDMARK_COUNT`] entries is valid; missing
/// indices simply read as absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSnapshot {
    landmarks: Vec<Landmark>,
}

impl LandmarkSnapshot {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// A snapshot with no detected person.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a full snapshot where only the given landmarks are visible.
    pub fn from_points(points: &[(BodyLandmark, Landmark)]) -> Self {
        let mut landmarks = vec![Landmark::new(0.0, 0.0, 0.0); LANDMARK_COUNT];
        for (name, landmark) in points {
            landmarks[name.index()] = *landmark;
        }
        Self { landmarks }
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn get(&self, name: BodyLandmark) -> Option<&Landmark> {
        self.landmarks.get(name.index())
    }

    /// Normalized position of a landmark if it meets the visibility threshold.
    pub fn visible(&self, name: BodyLandmark, min_visibility: f64) -> Option<Point2D> {
        self.get(name)
            .filter(|lm| lm.is_visible(min_visibility))
            .map(Landmark::point)
    }

    /// Normalized midpoint of two landmarks; both must be visible.
    pub fn midpoint(
        &self,
        a: BodyLandmark,
        b: BodyLandmark,
        min_visibility: f64,
    ) -> Option<Point2D> {
        let pa = self.visible(a, min_visibility)?;
        let pb = self.visible(b, min_visibility)?;
        Some(Point2D::midpoint(&pa, &pb))
    }
}
