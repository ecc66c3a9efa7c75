//! Application-level error handling

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Errors raised outside the conversion core: configuration, wiring, logging
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid or inconsistent configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Failed to serialize configuration: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error surfaced by the conversion core
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Subscriber installation failed
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Result type alias for application operations
pub type AppResult<T> = std::result::Result<T, AppError>;
