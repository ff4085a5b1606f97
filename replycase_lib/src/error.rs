//! Error types for the library layer.

use std::fmt;

use crate::config::ConfigError;

/// Errors produced by the library layer, wrapping upstream API errors and
/// adding configuration, file, and serialization failures.
#[derive(Debug)]
pub enum ReplyCaseError {
    /// An error from the underlying API client.
    Api(replycase_api::Error),
    /// Configuration could not be loaded or failed validation.
    Config(ConfigError),
    /// Reading or writing a file failed.
    Io(std::io::Error),
    /// JSON serialization or deserialization failed.
    Serialization(serde_json::Error),
    /// A table or record did not have the expected shape.
    InvalidInput(String),
}

impl fmt::Display for ReplyCaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "API error: {}", e),
            Self::Config(e) => write!(f, "Config error: {}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ReplyCaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<replycase_api::Error> for ReplyCaseError {
    fn from(e: replycase_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<ConfigError> for ReplyCaseError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<std::io::Error> for ReplyCaseError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ReplyCaseError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}
