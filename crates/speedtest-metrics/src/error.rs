//! Metrics error types

use std::io;
use thiserror::Error;

/// Result type alias for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors raised by the registry, the scrape handler and the HTTP endpoint
#[derive(Error, Debug)]
pub enum MetricsError {
    /// A series with the same fully-qualified name is already declared
    #[error("metric series already declared: {0}")]
    RegistrationConflict(String),

    /// Underlying Prometheus client error (bad name, label cardinality, ...)
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Exposition output could not be produced
    #[error("failed to encode metrics: {0}")]
    Encoding(String),

    /// Endpoint configuration is unusable
    #[error("invalid endpoint configuration: {0}")]
    InvalidConfig(String),

    /// Listener could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// I/O error while serving
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MetricsError {
    /// Whether this error is a duplicate declaration
    pub fn is_registration_conflict(&self) -> bool {
        matches!(self, MetricsError::RegistrationConflict(_))
    }
}
