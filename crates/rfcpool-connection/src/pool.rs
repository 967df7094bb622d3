//! Fixed-capacity connection pooling
//!
//! This module provides the pool that owns every open connection: it hands
//! connections out, takes them back, evicts idle ones and replaces broken
//! ones without ever exceeding the configured capacity.
//!
//! # Example
//!
//! ```ignore
//! use rfcpool_connection::pool::{ConnectionPool, PoolConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = PoolConfig::new(5)
//!     .with_connection_idle_timeout_ms(30_000)
//!     .with_idle_detection_interval_ms(1_000);
//!
//! let pool = ConnectionPool::new(config, connection_factory)?;
//! let conn = pool.acquire(&CancellationToken::new()).await?;
//! // Use connection...
//! pool.release(conn);
//! ```

mod config;
mod eviction;
mod pool;
mod stats;


pub use config::PoolConfig;
pub use pool::ConnectionPool;
pub use stats::PoolStats;
