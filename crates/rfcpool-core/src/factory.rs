//! Connection factory

use crate::{Connection, ConnectionParameters, Result};

/// Produces new, not yet connected, connections.
///
/// The pool calls `create` while it holds its internal lock, once per
/// granted capacity slot. Implementations must therefore be cheap and
/// must not block; the slow part of session setup belongs in
/// [`Connection::connect`], which the pool calls after releasing the lock.
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Create a new connection from the given parameters
    fn create(&self, parameters: &ConnectionParameters) -> Result<Box<dyn Connection>>;
}

impl<F> ConnectionFactory for F
where
    F: Fn(&ConnectionParameters) -> Result<Box<dyn Connection>> + Send + Sync + 'static,
{
    fn create(&self, parameters: &ConnectionParameters) -> Result<Box<dyn Connection>> {
        self(parameters)
    }
}
