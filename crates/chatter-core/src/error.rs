//! Configuration errors raised when constructing core components.

use thiserror::Error;

/// Errors that can occur when validating construction parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A bounded collection was configured with no room at all
    #[error("{field} must be greater than zero")]
    ZeroCapacity { field: &'static str },

    /// A periodic or timeout setting was configured as zero
    #[error("{field} must be a non-zero duration")]
    ZeroDuration { field: &'static str },

    /// A client queue too small to hold the history replay plus its join
    #[error("outbound_queue ({outbound_queue}) must exceed history_capacity ({history_capacity})")]
    QueueTooSmall {
        outbound_queue: usize,
        history_capacity: usize,
    },

    /// The listen address could not be interpreted
    #[error("Invalid listen address: {0}")]
    InvalidListenAddr(String),

    /// No listen port was supplied by the environment or command line
    #[error("No listen port configured (set TCP_PORT or pass --port)")]
    MissingPort,
}

/// Result type for construction and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;
