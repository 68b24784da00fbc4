//! Core error types for quizwatch-core.
//!
//! This module defines the error hierarchy using thiserror. Note that the
//! scheduler itself never surfaces these across its public boundary for data
//! problems: fetch failures become notices and bad timestamps are excluded.
//! Errors are only returned from explicit actions (opening links, config I/O).

use std::path::PathBuf;
use thiserror::Error;

use crate::countdown::Phase;

/// Core error type for quizwatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Candidate event fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Consumer action errors
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Failure fetching the candidate events of one subscription.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote answered with a non-success status
    #[error("Remote returned status {status} for subscription '{subscription}'")]
    Status { subscription: String, status: u16 },

    /// Response body could not be decoded
    #[error("Failed to decode candidate events: {0}")]
    Decode(String),

    /// Source has nothing for this subscription (or is offline)
    #[error("Candidate events unavailable: {0}")]
    Unavailable(String),
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Rejected consumer actions.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Quiz link requested outside the open window
    #[error("Quiz is not open (phase: {phase})")]
    NotActive { phase: Phase },

    /// Live session link requested before the window closed
    #[error("Live session is only available once the quiz has closed (phase: {phase})")]
    NotClosed { phase: Phase },

    /// No event is currently selected
    #[error("No event is selected")]
    NoEventSelected,

    /// Selected event carries no link under this key
    #[error("Selected event has no '{0}' link")]
    MissingLink(String),

    /// The opener itself failed
    #[error("Failed to open '{url}': {message}")]
    OpenFailed { url: String, message: String },

    /// `activate` was called with no tokio runtime to run the session on
    #[error("No tokio runtime available to run the countdown")]
    NoRuntime,
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
