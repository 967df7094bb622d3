//! Error types for rfcpool

use thiserror::Error;

/// Core error type for pooled remote-session operations
#[derive(Error, Debug)]
pub enum RfcError {
    /// Transport-level loss. Invalidates the connection it happened on,
    /// but not the request itself.
    #[error("Communication failure: {0}")]
    Communication(String),

    /// The remote function itself reported a failure
    #[error("Application error: {0}")]
    Application(String),

    /// The factory failed or handed back an unusable connection
    #[error("Connection creation failed: {0}")]
    Creation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Mapping error: {0}")]
    Mapping(#[from] serde_json::Error),

    #[error("Cancelled")]
    Cancelled,

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Handle holds no connection")]
    HandleDisposed,

    #[error("{0}")]
    Other(String),
}

impl RfcError {
    /// Whether this error belongs to the transient class that warrants
    /// discarding the connection and retrying on a fresh one.
    pub fn is_communication_failure(&self) -> bool {
        matches!(self, RfcError::Communication(_))
    }

    /// Whether this error was produced by a cancelled wait
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RfcError::Cancelled)
    }

    /// Wrap an error raised while bringing a new connection up.
    ///
    /// Creation and communication errors keep their kind; everything else is
    /// reported as a creation failure carrying the original message.
    pub fn into_creation(self) -> Self {
        match self {
            err @ (RfcError::Creation(_) | RfcError::Communication(_)) => err,
            other => RfcError::Creation(other.to_string()),
        }
    }
}

/// Result type alias for rfcpool operations
pub type Result<T> = std::result::Result<T, RfcError>;
