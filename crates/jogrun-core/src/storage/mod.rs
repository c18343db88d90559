mod config;

pub use config::{Config, DetectionConfig, FeedbackConfig, WorkoutConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/jogrun[-dev]/` based on JOGRUN_ENV.
///
/// Set JOGRUN_ENV=dev to use the development directory, or
/// JOGRUN_CONFIG_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("JOGRUN_CONFIG_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join(".config");
            let env = std::env::var("JOGRUN_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("jogrun-dev")
            } else {
                base_dir.join("jogrun")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
