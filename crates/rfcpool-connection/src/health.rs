//! Connection liveness probing
//!
//! Used by the pool to vet idle connections on checkout when
//! `test_on_checkout` is enabled.

use std::time::{Duration, Instant};

use rfcpool_core::Connection;
use thiserror::Error;

/// Result of a ping operation
pub type PingResult = Result<Duration, PingError>;

/// Error that can occur during a ping operation
#[derive(Debug, Clone, Error)]
pub enum PingError {
    /// The connection already reports itself unusable
    #[error("Connection is not valid")]
    Invalid,
    /// The round trip failed
    #[error("Ping failed: {0}")]
    Failed(String),
}

/// Ping a connection and return the round-trip time.
///
/// A connection whose `is_valid` is already false is rejected without
/// touching the network.
///
/// # Example
///
/// ```ignore
/// use rfcpool_connection::health::ping_connection;
///
/// let latency = ping_connection(&mut *connection).await?;
/// tracing::debug!(?latency, "backend reachable");
/// ```
pub async fn ping_connection(conn: &mut dyn Connection) -> PingResult {
    if !conn.is_valid() {
        return Err(PingError::Invalid);
    }

    let start = Instant::now();
    match conn.ping().await {
        Ok(()) => Ok(start.elapsed()),
        Err(e) => Err(PingError::Failed(e.to_string())),
    }
}
