//! Common error types for iacta

use thiserror::Error;

/// Common result type for iacta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the ingest pipeline and its building blocks
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed template pattern or missing template values
    #[error("Template error: {0}")]
    Template(String),

    /// Invalid input value (durations, rating classes, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
