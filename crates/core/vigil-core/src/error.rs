//! Error handling types and utilities for the Vigil stack.
//!
//! This module provides standardized error types that are used throughout
//! all Vigil crates to ensure consistent error handling patterns.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for the Vigil stack.
///
/// This enum covers the error scenarios shared across Vigil components.
/// Hot-path tracking operations never return these; they are reserved for
/// configuration, lifecycle, and serialization paths.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VigilError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VigilError {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Create a new invalid input error
    pub fn invalid_input<T: fmt::Display>(msg: T) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Create a new not found error
    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Self::NotFound(msg.to_string())
    }

    /// Create a new timeout error
    pub fn timeout<T: fmt::Display>(msg: T) -> Self {
        Self::Timeout(msg.to_string())
    }

    /// Create a new serialization error
    pub fn serialization<T: fmt::Display>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Create a new internal error
    pub fn internal<T: fmt::Display>(msg: T) -> Self {
        Self::Internal(msg.to_string())
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Internal(_))
    }

    /// Check if this error is a caller error
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }
}

/// Result type alias for Vigil operations
pub type VigilResult<T> = Result<T, VigilError>;

// Standard error conversions
impl From<std::io::Error> for VigilError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for VigilError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for VigilError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<uuid::Error> for VigilError {
    fn from(err: uuid::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<chrono::ParseError> for VigilError {
    fn from(err: chrono::ParseError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = VigilError::config("test config error");
        assert_eq!(err, VigilError::Configuration("test config error".to_string()));
    }

    #[test]
    fn test_error_classification() {
        let caller_err = VigilError::invalid_input("bad input");
        assert!(caller_err.is_caller_error());
        assert!(!caller_err.is_retryable());

        let internal_err = VigilError::internal("broken invariant");
        assert!(internal_err.is_retryable());
        assert!(!internal_err.is_caller_error());

        let timeout_err = VigilError::timeout("sweep stalled");
        assert!(timeout_err.is_retryable());
    }

    #[test]
    fn test_error_conversions() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let vigil_err: VigilError = io_err.into();
        assert!(matches!(vigil_err, VigilError::Internal(_)));

        let json_err = serde_json::from_str::<i32>("not json").unwrap_err();
        let vigil_err: VigilError = json_err.into();
        assert!(matches!(vigil_err, VigilError::Serialization(_)));
    }

    #[test]
    fn test_error_serialization_round_trip() {
        let err = VigilError::not_found("report 42");
        let json = serde_json::to_string(&err).unwrap();
        let back: VigilError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
