// Domain errors - Error types for the domain layer

use std::fmt;
use thiserror::Error;

/// Which encode path produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderPath {
    /// Hardware transform session
    Native,
    /// Software encode process from the optional component
    Legacy,
}

impl fmt::Display for EncoderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderPath::Native => write!(f, "native"),
            EncoderPath::Legacy => write!(f, "legacy"),
        }
    }
}

/// Domain-specific error types
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Durable read access could not be granted for a source
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Container or codec the encoder cannot handle
    #[error("Format not supported: {0}")]
    UnsupportedFormat(String),
    /// Encoder session or process failed
    #[error("{path} encode failed: {message}")]
    EncodeFailure { path: EncoderPath, message: String },
    /// Legacy component could not be installed
    #[error("Component installation failed: {0}")]
    InstallFailure(String),
    /// Completed output could not be written to the media store
    #[error("Failed to persist output: {0}")]
    PersistFailure(String),
    /// Metadata probe failed
    #[error("Probe failed: {0}")]
    Probe(String),
    /// File system operation failed
    #[error("File system error: {0}")]
    FsFail(String),
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),
    /// The consumer stopped observing the operation
    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Encode failure raised by the hardware path
    pub fn native(message: impl Into<String>) -> Self {
        DomainError::EncodeFailure {
            path: EncoderPath::Native,
            message: message.into(),
        }
    }

    /// Encode failure raised by the software path
    pub fn legacy(message: impl Into<String>) -> Self {
        DomainError::EncodeFailure {
            path: EncoderPath::Legacy,
            message: message.into(),
        }
    }

    /// The message without the category prefix, for composing user-facing text
    pub fn detail(&self) -> String {
        match self {
            DomainError::PermissionDenied(msg)
            | DomainError::UnsupportedFormat(msg)
            | DomainError::InstallFailure(msg)
            | DomainError::PersistFailure(msg)
            | DomainError::Probe(msg)
            | DomainError::FsFail(msg)
            | DomainError::BadArgs(msg) => msg.clone(),
            DomainError::EncodeFailure { message, .. } => message.clone(),
            DomainError::Cancelled => "operation cancelled".to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::FsFail(err.to_string())
    }
}
