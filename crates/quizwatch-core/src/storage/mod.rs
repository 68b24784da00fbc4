mod config;

pub use config::{CadenceConfig, Config, PolicyConfig, RemoteConfig, TOKEN_ENV};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/quizwatch[-dev]/` based on QUIZWATCH_ENV.
///
/// Set QUIZWATCH_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("QUIZWATCH_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("quizwatch-dev")
    } else {
        base_dir.join("quizwatch")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
