//! av-converter library
//!
//! Batch video conversion that tries the platform hardware encoder first and
//! falls back to an on-demand software encoder for legacy formats.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{AppContainer, ConvertInteractor, DefaultAppContainer};
pub use domain::errors::DomainError;
pub use domain::model::{ConversionProfile, ConversionStatus, PresentationState, SourceRef};
pub use error::{AppError, AppResult};
