//! Connection and function traits

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// One established remote session.
///
/// Expensive to create, cheap to reuse. A connection is owned by exactly one
/// party at a time (the pool while idle, a borrower while checked out), so
/// every mutating operation takes `&mut self`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Identifier used in logs and diagnostics
    fn id(&self) -> u64;

    /// Physically establish the session
    async fn connect(&mut self) -> Result<()>;

    /// Tear the session down, keeping the handle reusable
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether the session is believed to be usable.
    ///
    /// This is a cheap local check; use [`Connection::ping`] for a round trip.
    fn is_valid(&self) -> bool;

    /// Round-trip the backend to prove the session is alive
    async fn ping(&mut self) -> Result<()>;

    /// Release every resource held by this connection.
    ///
    /// Called exactly once by the pool when the connection is forgotten,
    /// evicted or the pool shuts down.
    fn dispose(&mut self) -> Result<()>;

    /// Look up a remote function by name on this session
    fn create_function(&mut self, name: &str) -> Result<Box<dyn Function>>;
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// A remote function bound to one session.
///
/// Implementations raise [`crate::RfcError::Communication`] on transport
/// loss and any other variant for application-level failures.
#[async_trait]
pub trait Function: Send {
    /// Name the function was created with
    fn name(&self) -> &str;

    /// Invoke the function, optionally passing a structured input
    async fn invoke(&mut self, input: Option<Value>) -> Result<Value>;

    /// Release resources held by this function object
    fn dispose(&mut self) {}
}
