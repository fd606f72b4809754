use std::path::PathBuf;

use compact_str::CompactString;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MmlinkError>;

/// Application-level errors for configuration, storage, and startup
#[derive(Debug, Clone, Error)]
pub enum MmlinkError {
    #[error("Failed to load configuration from: {path}")]
    ConfigLoadError { path: PathBuf, message: String },

    #[error("Failed to save configuration to: {path}")]
    ConfigSaveError { path: PathBuf, message: String },

    #[error("Invalid configuration: {field}")]
    ConfigValidationError { field: String, message: String },

    #[error("{0}")]
    GeneralError(CompactString),
}

impl From<crate::client::ClientError> for MmlinkError {
    fn from(e: crate::client::ClientError) -> Self {
        MmlinkError::GeneralError(e.to_string().into())
    }
}

impl MmlinkError {
    /// Create a configuration load error
    pub fn config_load_error(path: PathBuf, source: impl std::fmt::Display) -> Self {
        Self::ConfigLoadError { path, message: source.to_string() }
    }

    /// Create a configuration save error
    pub fn config_save_error(path: PathBuf, source: impl std::fmt::Display) -> Self {
        Self::ConfigSaveError { path, message: source.to_string() }
    }

    /// Create a configuration validation error
    pub fn config_validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidationError { field: field.into(), message: message.into() }
    }

    /// Create a general error
    pub fn general(message: impl Into<CompactString>) -> Self {
        Self::GeneralError(message.into())
    }
}
