//! Error types for the GRIN session layer.
//!
//! This module defines the error hierarchy for session operations:
//! configuration loading, screen transitions, and the camera
//! collaborator. Error variants include actionable suggestions where
//! possible to help users resolve issues.

use std::path::PathBuf;

use grin_camera::CameraError;

/// A specialized `Result` type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur while running a smile session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your grin.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Camera / Classifier Errors
    // ========================================================================
    /// The camera collaborator failed.
    ///
    /// A missing camera is handled before this point (the session runs
    /// without samples); this variant surfaces the remaining classifier
    /// and device failures.
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    // ========================================================================
    // Screen Flow Errors
    // ========================================================================
    /// Invalid screen transition attempted.
    #[error("Invalid screen transition: cannot go from {from} to {to}")]
    InvalidScreenTransition {
        /// The current screen.
        from: String,
        /// The attempted target screen.
        to: String,
    },

    /// Redeem was requested before the smile goal was reached.
    #[error("No reward available yet\n\nSuggestion: Keep smiling until the goal duration is reached")]
    RewardNotAvailable,

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidScreenTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidScreenTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if this error is transient and may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Camera(e) if e.is_transient())
    }

    /// Returns `true` if this error is fatal and requires immediate termination.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::ConfigParseError { .. } | Self::ConfigValidationError { .. } => true,
            Self::Camera(e) => e.is_fatal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_suggestion() {
        let err = SessionError::config_validation(
            "goalSeconds must be greater than 0",
            "Set goalSeconds to a positive number in your grin.json",
        );
        let msg = err.to_string();
        assert!(msg.contains("goalSeconds"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = SessionError::invalid_transition("intro", "redeem");
        let msg = err.to_string();
        assert!(msg.contains("intro"));
        assert!(msg.contains("redeem"));
    }

    #[test]
    fn test_is_transient() {
        let busy = SessionError::Camera(CameraError::DeviceBusy("front".to_string()));
        assert!(busy.is_transient());

        let denied = SessionError::Camera(CameraError::PermissionDenied);
        assert!(!denied.is_transient());
        assert!(denied.is_fatal());
    }

    #[test]
    fn test_is_fatal() {
        let parse = SessionError::config_parse("/tmp/grin.json", "bad json");
        assert!(parse.is_fatal());

        let reward = SessionError::RewardNotAvailable;
        assert!(!reward.is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let session_err: SessionError = io_err.into();
        assert!(matches!(session_err, SessionError::Io(_)));
    }
}
