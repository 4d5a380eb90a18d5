//! Error types for the Ringside pipeline

use thiserror::Error;

/// Core Ringside errors
///
/// Only `DetectorUnavailable` is meant to cross the capture/host boundary.
/// Everything else is absorbed by the capture loop and shows up as stale
/// or absent content in the next result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingsideError {
    // Detector errors
    #[error("Detector unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("Detection failed: {0}")]
    DetectorFailed(String),

    // Buffer errors
    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    // Session errors
    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RingsideError {
    /// Whether this error ends the capture session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RingsideError::DetectorUnavailable(_) | RingsideError::SessionClosed
        )
    }
}

/// Result type for Ringside operations
pub type RingsideResult<T> = Result<T, RingsideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(RingsideError::DetectorUnavailable("no model".into()).is_fatal());
        assert!(RingsideError::SessionClosed.is_fatal());
        assert!(!RingsideError::DetectorFailed("timeout".into()).is_fatal());
        assert!(!RingsideError::BufferTooShort {
            expected: 50,
            actual: 3
        }
        .is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = RingsideError::BufferTooShort {
            expected: 200,
            actual: 12,
        };
        assert_eq!(err.to_string(), "Buffer too short: expected 200, got 12");
    }
}
