//! Borrowing connections for remote function calls
//!
//! A [`PooledConnectionHandle`] holds one connection from a
//! [`ConnectionPool`](crate::pool::ConnectionPool) and invokes remote
//! functions through it. When an invocation fails with a communication
//! failure, the broken connection is forgotten, a replacement is acquired
//! and the invocation is retried exactly once.
//!
//! # Example
//!
//! ```ignore
//! use rfcpool_connection::handle::PooledConnectionHandle;
//!
//! let mut handle = PooledConnectionHandle::new(pool, CancellationToken::new()).await?;
//! let result = handle.invoke_function("RFC_PING").await?;
//! handle.dispose();
//! ```

mod pooled;


pub use pooled::PooledConnectionHandle;
