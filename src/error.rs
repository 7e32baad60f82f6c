//! Unified error handling for the route-tracker library.
//!
//! Every fallible operation returns [`TrackerError`]. None of these are fatal to
//! the process: each one ends the operation it arose in and nothing more.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a position-stream failure, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum StreamErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
}

impl StreamErrorKind {
    /// Map a W3C-style geolocation error code (1, 2, 3) to a kind.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => StreamErrorKind::PermissionDenied,
            2 => StreamErrorKind::PositionUnavailable,
            3 => StreamErrorKind::Timeout,
            _ => StreamErrorKind::Unknown,
        }
    }

    /// Human readable description for surfacing to the user.
    pub fn message(&self) -> &'static str {
        match self {
            StreamErrorKind::PermissionDenied => "Location access denied by user.",
            StreamErrorKind::PositionUnavailable => "Location information unavailable.",
            StreamErrorKind::Timeout => "Location request timed out.",
            StreamErrorKind::Unknown => "Unknown error occurred.",
        }
    }
}

/// Unified error type for tracker operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    /// No position-stream capability on this platform
    #[error("Geolocation is not supported on this device")]
    CapabilityUnavailable,
    /// The connectivity gate refused to start a session
    #[error("An internet connection is required to start tracking")]
    ConnectivityRequired,
    /// The position stream failed; the active session was discarded
    #[error("Error getting location: {}", .0.message())]
    StreamError(StreamErrorKind),
    /// Persisted history could not be decoded
    #[error("Stored history is corrupt: {message}")]
    PersistenceCorrupt { message: String },
    /// The backing key-value store failed
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl TrackerError {
    pub(crate) fn storage(message: impl Into<String>) -> Self {
        TrackerError::Storage {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::PersistenceCorrupt {
            message: err.to_string(),
        }
    }
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
