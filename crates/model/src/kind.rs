//! Test kinds and their fixed calibration layouts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The athletic tests Athletrack can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Standing long jump: distance between takeoff and landing.
    Jump,
    /// Linear sprint with timed splits.
    Sprint,
    /// Ball speed between two lines after a kick.
    Kick,
}

impl TestKind {
    pub const ALL: [TestKind; 3] = [TestKind::Jump, TestKind::Sprint, TestKind::Kick];

    /// Real-world meter values of the calibration clicks, in click order.
    pub fn calibration_meters(&self) -> &'static [f64] {
        match self {
            TestKind::Jump => &[0.0, 3.0],
            TestKind::Sprint => &[0.0, 15.0, 30.0],
            TestKind::Kick => &[0.0, 10.0],
        }
    }

    /// Identifier the event detector tracks for this test.
    pub fn tracked_id(&self) -> &'static str {
        match self {
            TestKind::Jump => "jumper",
            TestKind::Sprint => "runner",
            TestKind::Kick => "ball",
        }
    }

    /// Whether starting the test needs the athlete's height.
    pub fn requires_user_height(&self) -> bool {
        matches!(self, TestKind::Jump)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Jump => "jump",
            TestKind::Sprint => "sprint",
            TestKind::Kick => "kick",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jump" => Ok(TestKind::Jump),
            "sprint" => Ok(TestKind::Sprint),
            "kick" | "ball" => Ok(TestKind::Kick),
            other => Err(format!("unknown test kind '{other}' (expected jump|sprint|kick)")),
        }
    }
}
