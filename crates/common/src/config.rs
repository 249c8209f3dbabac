//! Application configuration.
//!
//! Every section carries `#[serde(default)]` so older config files keep
//! loading when new tunables are added.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where results and calibrations are stored.
    pub data_dir: PathBuf,

    /// Athlete performing the tests.
    pub athlete: AthleteProfile,

    /// Landmark acceptance thresholds.
    pub detection: DetectionConfig,

    /// Calibration validation tolerances.
    pub calibration: CalibrationConfig,

    /// Standing long jump tunables.
    pub jump: JumpConfig,

    /// Sprint tunables.
    pub sprint: SprintConfig,

    /// Kick (ball speed) tunables.
    pub kick: KickConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Athlete attributes some tests depend on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteProfile {
    /// Standing height in centimeters. Required by the jump test.
    pub height_cm: Option<f64>,
}

impl AthleteProfile {
    pub fn with_height_cm(height_cm: f64) -> Self {
        Self {
            height_cm: Some(height_cm),
        }
    }
}

/// Inclusive `[min, max]` range a final measurement is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibleRange {
    pub min: f64,
    pub max: f64,
}

impl PlausibleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp `value` into the range. Returns the clamped value and whether
    /// clamping changed it.
    pub fn clamp(&self, value: f64) -> (f64, bool) {
        if self.contains(value) {
            (value, false)
        } else {
            (value.clamp(self.min, self.max), true)
        }
    }
}

/// Landmark acceptance thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum landmark visibility for a frame to be evaluated.
    pub min_visibility: f64,
}

/// Calibration validation tolerances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Maximum perpendicular distance (pixels) of an intermediate point from
    /// the first-to-last calibration line.
    pub collinearity_tolerance_px: f64,

    /// Maximum deviation of an intermediate point's projected meter value,
    /// as a fraction of the calibrated span.
    pub intermediate_tolerance_ratio: f64,

    /// Minimum horizontal distance (pixels) between the first and last kick
    /// marks. The kick times vertical-line crossings, so a steep axis
    /// collapses both lines onto nearly the same x.
    pub min_kick_line_separation_px: f64,
}

/// Standing long jump tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Ground level as a fraction of image height (0 = top, 1 = bottom).
    pub ground_level_fraction: f64,

    /// Minimum vertical speed (pixels per second) for takeoff/landing.
    pub min_vertical_speed_px_s: f64,

    /// Wait after landing before the result is finalized (milliseconds).
    pub settle_delay_ms: f64,

    /// Plausible jump distance in meters.
    pub plausible_distance_m: PlausibleRange,

    /// Accepted ratio between estimated and declared body height.
    pub body_height_ratio: PlausibleRange,
}

/// Sprint tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintConfig {
    /// Moving-average window for hip position.
    pub position_window: usize,

    /// Moving-average window for instantaneous speed.
    pub speed_window: usize,

    /// Number of (speed, time) samples kept for acceleration estimation.
    pub acceleration_history: usize,

    /// Plausible average sprint speed in m/s.
    pub plausible_speed_mps: PlausibleRange,
}

/// Kick (ball speed) tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KickConfig {
    /// Minimum ball detection confidence.
    pub min_confidence: f64,

    /// Plausible ball speed in m/s.
    pub plausible_speed_mps: PlausibleRange,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "athletrack=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            athlete: AthleteProfile::default(),
            detection: DetectionConfig::default(),
            calibration: CalibrationConfig::default(),
            jump: JumpConfig::default(),
            sprint: SprintConfig::default(),
            kick: KickConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_visibility: 0.5,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            collinearity_tolerance_px: 15.0,
            intermediate_tolerance_ratio: 0.1,
            min_kick_line_separation_px: 40.0,
        }
    }
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            ground_level_fraction: 0.85,
            min_vertical_speed_px_s: 50.0,
            settle_delay_ms: 500.0,
            plausible_distance_m: PlausibleRange::new(0.2, 4.0),
            body_height_ratio: PlausibleRange::new(0.8, 1.2),
        }
    }
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            position_window: 3,
            speed_window: 5,
            acceleration_history: 10,
            plausible_speed_mps: PlausibleRange::new(0.5, 13.0),
        }
    }
}

impl Default for KickConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            plausible_speed_mps: PlausibleRange::new(1.0, 60.0),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("athletrack").join("config.json")
}

/// Default data directory.
fn default_data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("athletrack")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausible_range_clamp() {
        let range = PlausibleRange::new(0.2, 4.0);
        assert_eq!(range.clamp(2.0), (2.0, false));
        assert_eq!(range.clamp(5.5), (4.0, true));
        assert_eq!(range.clamp(0.0), (0.2, true));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{ "athlete": { "height_cm": 181.0 }, "jump": { "settle_delay_ms": 250.0 } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.athlete.height_cm, Some(181.0));
        assert_eq!(config.jump.settle_delay_ms, 250.0);
        assert_eq!(config.jump.ground_level_fraction, 0.85);
        assert_eq!(config.sprint.position_window, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load_roundtrip_through_path() {
        let dir = std::env::temp_dir().join("athletrack_test_config");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.json");

        let mut config = AppConfig::default();
        config.athlete = AthleteProfile::with_height_cm(172.5);
        config.kick.min_confidence = 0.7;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.athlete.height_cm, Some(172.5));
        assert!((loaded.kick.min_confidence - 0.7).abs() < 1e-12);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unparseable_config_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join("athletrack_test_config_bad");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.detection.min_visibility, 0.5);

        std::fs::remove_dir_all(&dir).ok();
    }
}
