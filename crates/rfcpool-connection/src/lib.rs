//! rfcpool connection - pooling of remote sessions
//!
//! This crate owns the lifecycle of a small, fixed number of expensive
//! remote sessions shared by many concurrent callers.

pub mod handle;
pub mod health;
pub mod pool;

#[cfg(test)]
mod test_support;

pub use handle::PooledConnectionHandle;
pub use health::{PingError, PingResult, ping_connection};
pub use pool::{ConnectionPool, PoolConfig, PoolStats};

pub use rfcpool_core::{
    Connection, ConnectionFactory, ConnectionParameters, Function, Result, RfcError, Value,
};
pub use tokio_util::sync::CancellationToken;
