//! Configuration error types

use thiserror::Error;

use crate::dispatch::DispatchError;

/// Errors that can occur while loading configuration or building handlers
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown handler kind: {0}")]
    UnknownHandler(String),

    #[error("Invalid option for handler {handler}: {message}")]
    InvalidOption { handler: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dispatcher error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl ConfigError {
    /// Create an invalid option error
    pub fn invalid_option(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
