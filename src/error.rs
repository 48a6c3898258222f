//! Error types and handling for Heatgate
//!
//! This module defines the error types used throughout the application.
//! Price feed failures and device API failures have their own variants so
//! the controller can report them separately at the cycle boundary.

use thiserror::Error;

/// Result type alias for Heatgate operations
pub type Result<T> = std::result::Result<T, HeatgateError>;

/// Main error type for Heatgate
#[derive(Debug, Error)]
pub enum HeatgateError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Price source unreachable or malformed response
    #[error("Price fetch error: {message}")]
    Fetch { message: String },

    /// Vendor API unreachable, auth failure or invalid device id
    #[error("Device error: {message}")]
    Device { message: String },

    /// Login / capability errors at the web boundary
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl HeatgateError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        HeatgateError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        HeatgateError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new price fetch error
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        HeatgateError::Fetch {
            message: message.into(),
        }
    }

    /// Create a new device error
    pub fn device<S: Into<String>>(message: S) -> Self {
        HeatgateError::Device {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        HeatgateError::Auth {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        HeatgateError::Io {
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used in cycle reports
    pub fn kind(&self) -> &'static str {
        match self {
            HeatgateError::Config { .. } => "config",
            HeatgateError::Validation { .. } => "validation",
            HeatgateError::Fetch { .. } => "fetch",
            HeatgateError::Device { .. } => "device",
            HeatgateError::Auth { .. } => "auth",
            HeatgateError::Serialization { .. } => "serialization",
            HeatgateError::Io { .. } => "io",
        }
    }
}

impl From<std::io::Error> for HeatgateError {
    fn from(err: std::io::Error) -> Self {
        HeatgateError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HeatgateError {
    fn from(err: serde_yaml::Error) -> Self {
        HeatgateError::Serialization {
            message: err.to_string(),
        }
    }
}
