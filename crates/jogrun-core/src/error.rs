//! Core error types for jogrun-core.
//!
//! Timer and detection transitions are total functions and never fail.
//! Errors only arise at the edges: user-supplied configuration and the
//! on-disk config file.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for jogrun-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not determine where the config directory lives
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Validation errors for user-supplied workout parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Interval count must be at least one
    #[error("Interval count must be at least 1 (got {0})")]
    ZeroIntervals(u32),

    /// Volume outside 0.0..=1.0
    #[error("Volume must be between 0.0 and 1.0 (got {0})")]
    VolumeOutOfRange(f64),

    /// Unrecognised auto-detect mode name
    #[error("Unknown auto-detect mode '{0}' (expected off, treadmill or outdoor)")]
    UnknownMode(String),

    /// Unrecognised phase name
    #[error("Unknown phase '{0}' (expected jog or run)")]
    UnknownPhase(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_wraps_into_core_error() {
        let err: CoreError = ValidationError::ZeroIntervals(0).into();
        assert_eq!(
            err.to_string(),
            "Validation error: Interval count must be at least 1 (got 0)"
        );
    }

    #[test]
    fn unknown_key_message() {
        let err = ConfigError::UnknownKey("workout.nope".into());
        assert!(err.to_string().contains("workout.nope"));
    }
}
