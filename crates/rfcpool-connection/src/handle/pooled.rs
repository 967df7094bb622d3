//! Pooled connection handle with single-retry invocation
//!
//! The handle borrows one connection for its whole lifetime and swaps it
//! for a fresh one at most once per invocation, when the backend reports a
//! communication failure.

use rfcpool_core::{Connection, Result, RfcError, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::pool::ConnectionPool;

/// A short-lived borrower of one pooled connection
///
/// The connection is returned to the pool by [`dispose`](Self::dispose) or,
/// failing that, when the handle is dropped.
///
/// # Example
///
/// ```ignore
/// use rfcpool_connection::PooledConnectionHandle;
///
/// let mut handle = PooledConnectionHandle::new(pool.clone(), cancel.clone()).await?;
/// let order: SalesOrder = handle
///     .invoke_function_with_as("BAPI_SALESORDER_GETSTATUS", &request)
///     .await?;
/// handle.dispose();
/// ```
pub struct PooledConnectionHandle {
    id: Uuid,
    pool: ConnectionPool,
    connection: Option<Box<dyn Connection>>,
    /// Honoured when a replacement connection has to be acquired
    cancel: CancellationToken,
}

impl std::fmt::Debug for PooledConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnectionHandle")
            .field("id", &self.id)
            .field("connection_id", &self.connection_id())
            .finish()
    }
}

impl PooledConnectionHandle {
    /// Borrow a connection from `pool` right away.
    ///
    /// `cancel` applies to this acquire and to the replacement acquire
    /// performed after a communication failure.
    pub async fn new(pool: ConnectionPool, cancel: CancellationToken) -> Result<Self> {
        let connection = pool.acquire(&cancel).await?;
        let id = Uuid::new_v4();
        tracing::debug!(handle_id = %id, connection_id = connection.id(), "handle opened");

        Ok(Self {
            id,
            pool,
            connection: Some(connection),
            cancel,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Id of the connection currently held, if any
    pub fn connection_id(&self) -> Option<u64> {
        self.connection.as_ref().map(|c| c.id())
    }

    pub fn is_disposed(&self) -> bool {
        self.connection.is_none()
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Invoke a function without input
    pub async fn invoke_function(&mut self, name: &str) -> Result<Value> {
        self.invoke_with_retry(name, None).await
    }

    /// Invoke a function, serializing `input` as its parameters
    pub async fn invoke_function_with<I>(&mut self, name: &str, input: &I) -> Result<Value>
    where
        I: Serialize + ?Sized,
    {
        let input = serde_json::to_value(input)?;
        self.invoke_with_retry(name, Some(input)).await
    }

    /// Invoke a function without input and map its output to `T`
    pub async fn invoke_function_as<T>(&mut self, name: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let output = self.invoke_with_retry(name, None).await?;
        Ok(serde_json::from_value(output)?)
    }

    /// Invoke a function with a typed input and map its output to `T`
    pub async fn invoke_function_with_as<I, T>(&mut self, name: &str, input: &I) -> Result<T>
    where
        I: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let input = serde_json::to_value(input)?;
        let output = self.invoke_with_retry(name, Some(input)).await?;
        Ok(serde_json::from_value(output)?)
    }

    /// Return the connection to the pool.
    ///
    /// Only the first call has an effect.
    pub fn dispose(&mut self) {
        if let Some(connection) = self.connection.take() {
            tracing::debug!(handle_id = %self.id, connection_id = connection.id(), "handle disposed");
            self.pool.release(connection);
        }
    }

    /// Run one invocation, retrying exactly once on a fresh connection after
    /// a communication failure.
    #[tracing::instrument(skip(self, input), fields(handle_id = %self.id))]
    async fn invoke_with_retry(&mut self, name: &str, input: Option<Value>) -> Result<Value> {
        let connection = self.connection.as_mut().ok_or(RfcError::HandleDisposed)?;
        let connection_id = connection.id();

        let first = invoke_once(&mut **connection, name, input.clone()).await;
        let err = match first {
            Err(err) if err.is_communication_failure() => err,
            other => return other,
        };

        tracing::warn!(
            connection_id,
            error = %err,
            "communication failure, retrying on a fresh connection"
        );
        if let Some(broken) = self.connection.take() {
            self.pool.forget(broken);
        }

        let fresh = self.pool.acquire(&self.cancel).await?;
        let connection = self.connection.insert(fresh);
        tracing::debug!(connection_id = connection.id(), "retrying invocation");
        invoke_once(&mut **connection, name, input).await
    }
}

impl Drop for PooledConnectionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn invoke_once(
    connection: &mut dyn Connection,
    name: &str,
    input: Option<Value>,
) -> Result<Value> {
    let mut function = connection.create_function(name)?;
    let result = function.invoke(input).await;
    function.dispose();
    result
}
