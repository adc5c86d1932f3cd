//! # Error Types
//!
//! Custom error types for the ESC driver using `thiserror`.

use thiserror::Error;

use crate::esc::protocol::Protocol;

/// Main error type for the ESC driver
#[derive(Debug, Error)]
pub enum EscError {
    /// Output pin outside the supported range
    #[error("Invalid pin {0}: must be between 0 and 39")]
    InvalidPin(i64),

    /// Protocol name not recognized
    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),

    /// Direction name not recognized
    #[error("Unknown direction: {0}")]
    UnknownDirection(String),

    /// Request could not be parsed
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Direction control requested on a protocol without bidirectional signaling
    #[error("Direction control is not supported by {0}")]
    DirectionUnsupported(Protocol),

    /// Operation requires the ESC to be armed
    #[error("ESC is not armed")]
    NotArmed,

    /// Settings store errors
    #[error("Settings store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; state left unchanged
    Validation,
    /// Active protocol cannot do what was asked
    Capability,
    /// ESC must be armed first
    NotArmed,
    /// Everything else (I/O, persistence, configuration)
    Internal,
}

impl ErrorKind {
    /// Wire name of the error class
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Capability => "capability",
            ErrorKind::NotArmed => "not_armed",
            ErrorKind::Internal => "internal",
        }
    }
}

impl EscError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EscError::InvalidPin(_)
            | EscError::UnknownProtocol(_)
            | EscError::UnknownDirection(_)
            | EscError::MalformedRequest(_) => ErrorKind::Validation,
            EscError::DirectionUnsupported(_) => ErrorKind::Capability,
            EscError::NotArmed => ErrorKind::NotArmed,
            EscError::Store(_) | EscError::Config(_) | EscError::Io(_) | EscError::Json(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Result type alias for the ESC driver
pub type Result<T> = std::result::Result<T, EscError>;
