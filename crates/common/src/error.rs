//! Error types shared across Athletrack crates.

use std::path::PathBuf;

/// Top-level error type for Athletrack operations.
///
/// Validation warnings and skipped frames are not errors: they are logged
/// and carried on results. Only conditions that stop an operation end up here.
#[derive(Debug, thiserror::Error)]
pub enum AthleteError {
    /// A test was started without what it needs (calibration, user height,
    /// a ball detector). Raised before any state is touched.
    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    #[error("Calibration error: {message}")]
    Calibration { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Pose engine error: {message}")]
    Engine { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using AthleteError.
pub type AthleteResult<T> = Result<T, AthleteError>;

impl AthleteError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    pub fn calibration(msg: impl Into<String>) -> Self {
        Self::Calibration {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error is a blocking precondition failure.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_display() {
        let err = AthleteError::precondition("calibration required");
        assert!(err.is_precondition());
        assert_eq!(err.to_string(), "Precondition failed: calibration required");
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AthleteError = parse.unwrap_err().into();
        assert!(matches!(err, AthleteError::Json(_)));
        assert!(!err.is_precondition());
    }
}
