//! Common error types for v2p

use thiserror::Error;

/// Common result type for v2p operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across v2p crates
#[derive(Error, Debug)]
pub enum Error {
    /// Cache database error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filter or strategy constructed with out-of-range parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed data from an external service
    #[error("Parse error: {0}")]
    Parse(String),
}
