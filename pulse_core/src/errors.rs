//! # Error Types
//!
//! Structured error types for pulse_core. Storage and import failures always
//! reach the caller through [`PulseError`]; rendering never fails, it skips
//! what it cannot draw (see [`crate::segment::SegmentIssue`]).
//!
//! ## Example
//!
//! ```rust
//! use pulse_core::errors::{PulseError, PulseResult};
//!
//! fn validate_width(width: f64) -> PulseResult<()> {
//!     if !(width > 0.0) {
//!         return Err(PulseError::invalid_input(
//!             "width",
//!             width.to_string(),
//!             "Canvas width must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_width(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pulse_core operations
pub type PulseResult<T> = Result<T, PulseError>;

/// Structured error type for store, import and parse operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum PulseError {
    /// Durable storage could not be read or written
    #[error("Storage unavailable: {operation} on '{path}' - {reason}")]
    StorageUnavailable {
        operation: String,
        path: String,
        reason: String,
    },

    /// Another live process holds the store lock
    #[error("Store locked: '{path}' is locked by {locked_by} since {locked_at}")]
    StoreLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// Import payload is not a valid profile collection
    #[error("Malformed import: {reason}")]
    MalformedImport { reason: String },

    /// Generator output is unusable as a whole (not JSON, not an array)
    #[error("Malformed profile: {reason}")]
    MalformedProfile { reason: String },

    /// No stored profile carries the given id
    #[error("Profile not found: {id}")]
    ProfileNotFound { id: String },

    /// commit_edit was called without a preceding begin_edit
    #[error("No edit in progress")]
    NoEditInProgress,

    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// JSON serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PulseError {
    /// Create a StorageUnavailable error
    pub fn storage_unavailable(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PulseError::StorageUnavailable {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a StoreLocked error
    pub fn store_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        PulseError::StoreLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a MalformedImport error
    pub fn malformed_import(reason: impl Into<String>) -> Self {
        PulseError::MalformedImport {
            reason: reason.into(),
        }
    }

    /// Create a MalformedProfile error
    pub fn malformed_profile(reason: impl Into<String>) -> Self {
        PulseError::MalformedProfile {
            reason: reason.into(),
        }
    }

    /// Create a ProfileNotFound error
    pub fn profile_not_found(id: impl ToString) -> Self {
        PulseError::ProfileNotFound { id: id.to_string() }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PulseError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying later may succeed. The store never retries on its own.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PulseError::StoreLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            PulseError::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
            PulseError::StoreLocked { .. } => "STORE_LOCKED",
            PulseError::MalformedImport { .. } => "MALFORMED_IMPORT",
            PulseError::MalformedProfile { .. } => "MALFORMED_PROFILE",
            PulseError::ProfileNotFound { .. } => "PROFILE_NOT_FOUND",
            PulseError::NoEditInProgress => "NO_EDIT_IN_PROGRESS",
            PulseError::InvalidInput { .. } => "INVALID_INPUT",
            PulseError::SerializationError { .. } => "SERIALIZATION_ERROR",
            PulseError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = PulseError::storage_unavailable("write", "/tmp/profiles.json", "disk full");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("StorageUnavailable"));
        let roundtrip: PulseError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_unit_variant_serialization() {
        let json = serde_json::to_string(&PulseError::NoEditInProgress).unwrap();
        let roundtrip: PulseError = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, PulseError::NoEditInProgress);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(PulseError::malformed_import("bad").error_code(), "MALFORMED_IMPORT");
        assert_eq!(PulseError::profile_not_found("abc").error_code(), "PROFILE_NOT_FOUND");
        assert_eq!(PulseError::NoEditInProgress.error_code(), "NO_EDIT_IN_PROGRESS");
    }

    #[test]
    fn test_only_lock_contention_is_recoverable() {
        assert!(PulseError::store_locked("p", "someone", "now").is_recoverable());
        assert!(!PulseError::storage_unavailable("read", "p", "gone").is_recoverable());
        assert!(!PulseError::malformed_import("x").is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let err = PulseError::malformed_profile("expected a JSON array");
        assert_eq!(err.to_string(), "Malformed profile: expected a JSON array");
    }
}
