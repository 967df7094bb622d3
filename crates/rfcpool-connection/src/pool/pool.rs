//! Connection pool implementation

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rfcpool_core::{Connection, ConnectionFactory, Result, RfcError};
use tokio::sync::{Semaphore, TryAcquireError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::config::PoolConfig;
use super::eviction;
use super::stats::PoolStats;
use crate::health::ping_connection;

/// An idle connection together with the moment it becomes evictable
struct IdleEntry {
    connection: Box<dyn Connection>,
    expires_at: Instant,
}

/// State mutated only under the pool lock
struct PoolState {
    /// Connections open right now, idle and borrowed alike
    open: usize,
    /// Oldest-returned first
    idle: VecDeque<IdleEntry>,
    closed: bool,
}

pub(super) struct PoolInner {
    config: PoolConfig,
    factory: Box<dyn ConnectionFactory>,
    state: Mutex<PoolState>,
    /// One permit per idle entry plus one per slot freed by destruction
    /// that no acquirer has consumed yet.
    available: Semaphore,
    waiting: AtomicUsize,
    shutdown: CancellationToken,
}

/// A fixed-capacity pool of remote sessions
///
/// At most `pool_size` connections are open at any time. Idle connections
/// are reused oldest-first and evicted by a background task once they have
/// been idle for longer than `connection_idle_timeout`.
///
/// Cloning is cheap; all clones share the same pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ConnectionPool {
    /// Create a new pool and start its eviction task.
    ///
    /// Must be called from within a Tokio runtime. No connection is created
    /// until the first [`acquire`](Self::acquire).
    ///
    /// # Errors
    ///
    /// Returns [`RfcError::Configuration`] if `config` is invalid.
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Result<Self> {
        config.validate()?;

        let shutdown = CancellationToken::new();
        let inner = Arc::new(PoolInner {
            state: Mutex::new(PoolState {
                open: 0,
                idle: VecDeque::with_capacity(config.pool_size()),
                closed: false,
            }),
            factory: Box::new(factory),
            available: Semaphore::new(0),
            waiting: AtomicUsize::new(0),
            shutdown: shutdown.clone(),
            config,
        });

        eviction::spawn_evictor(
            Arc::downgrade(&inner),
            inner.config.idle_detection_interval(),
            shutdown,
        );

        tracing::info!(
            pool_size = inner.config.pool_size(),
            idle_timeout_ms = inner.config.connection_idle_timeout().as_millis() as u64,
            param_keys = ?inner.config.parameters().keys(),
            "connection pool created"
        );

        Ok(Self { inner })
    }

    /// Borrow a connection, creating one if capacity allows.
    ///
    /// Blocks only when every slot is in use, until a connection is released
    /// or forgotten. Cancelling `cancel` while blocked returns
    /// [`RfcError::Cancelled`] and leaves the pool untouched.
    ///
    /// # Errors
    ///
    /// - [`RfcError::Creation`] (or the factory's own error kind) when a new
    ///   connection could not be brought up; the reserved slot is returned.
    /// - [`RfcError::Cancelled`] when `cancel` fires while waiting.
    /// - [`RfcError::PoolClosed`] once the pool has been disposed.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Box<dyn Connection>> {
        // Reuse without entering the creation path when a unit is ready.
        match self.inner.available.try_acquire() {
            Ok(permit) => {
                permit.forget();
                if let Some(connection) = self.checkout_idle().await {
                    return Ok(connection);
                }
            }
            Err(TryAcquireError::Closed) => return Err(RfcError::PoolClosed),
            Err(TryAcquireError::NoPermits) => {}
        }

        loop {
            if let Some(pending) = self.inner.create_connection()? {
                return self.open_connection(pending).await;
            }

            {
                let _waiting = WaitingGuard::new(&self.inner.waiting);
                tracing::trace!("pool at capacity, waiting for a connection");
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RfcError::Cancelled),
                    permit = self.inner.available.acquire() => {
                        permit.map_err(|_| RfcError::PoolClosed)?
                    }
                };
                permit.forget();
            }

            // No idle entry means the unit came from a destroyed connection,
            // so a slot is free: go round and create.
            if let Some(connection) = self.checkout_idle().await {
                return Ok(connection);
            }
        }
    }

    /// Return a borrowed connection to the idle set.
    ///
    /// Health is not checked here; the next acquirer or the evictor does
    /// that. After [`dispose`](Self::dispose) the connection is disposed
    /// instead.
    pub fn release(&self, connection: Box<dyn Connection>) {
        let connection_id = connection.id();
        let expires_at = Instant::now() + self.inner.config.connection_idle_timeout();

        let mut state = self.inner.state.lock();
        if state.closed {
            state.open = state.open.saturating_sub(1);
            drop(state);
            let mut connection = connection;
            dispose_quietly(&mut *connection, "release after pool disposal");
            return;
        }
        state.idle.push_back(IdleEntry {
            connection,
            expires_at,
        });
        let (open, idle) = (state.open, state.idle.len());
        drop(state);

        self.inner.available.add_permits(1);
        tracing::debug!(connection_id, open, idle, "connection released");
    }

    /// Discard a connection that is known to be broken.
    ///
    /// The connection is disposed, its slot is freed and one waiter is woken
    /// so it can create a replacement.
    pub fn forget(&self, mut connection: Box<dyn Connection>) {
        let connection_id = connection.id();
        dispose_quietly(&mut *connection, "forget");
        self.inner.free_slot();
        tracing::debug!(connection_id, "connection forgotten");
    }

    /// Evict every idle connection whose timeout has passed.
    ///
    /// Returns how many were evicted. The background task calls this once per
    /// `idle_detection_interval`.
    pub fn evict_expired(&self) -> usize {
        self.inner.evict_expired()
    }

    /// Shut the pool down.
    ///
    /// Stops eviction, disposes every idle connection and makes current and
    /// future waiters fail with [`RfcError::PoolClosed`]. Borrowed
    /// connections are left alone; they are disposed when released.
    /// Calling this more than once has no further effect.
    pub fn dispose(&self) {
        let entries: Vec<IdleEntry> = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let entries: Vec<_> = state.idle.drain(..).collect();
            state.open = state.open.saturating_sub(entries.len());
            entries
        };

        self.inner.shutdown.cancel();
        self.inner.available.close();

        let disposed = entries.len();
        for mut entry in entries {
            dispose_quietly(&mut *entry.connection, "pool disposal");
        }
        tracing::info!(disposed, "connection pool disposed");
    }

    /// Whether [`dispose`](Self::dispose) has been called
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats::new(
            self.inner.config.pool_size(),
            state.open,
            state.idle.len(),
            self.inner.waiting.load(Ordering::SeqCst),
        )
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Pop the oldest idle connection, discarding it if it no longer looks
    /// usable. `None` means the caller should try to create instead.
    async fn checkout_idle(&self) -> Option<Box<dyn Connection>> {
        let entry = self.inner.state.lock().idle.pop_front()?;
        let mut pending = PendingConnection::new(&self.inner, entry.connection);

        let connection = pending.connection_mut();
        if !connection.is_valid() {
            tracing::debug!(
                connection_id = connection.id(),
                "idle connection no longer valid, discarding"
            );
            return None;
        }

        if self.inner.config.test_on_checkout() {
            if let Err(e) = ping_connection(&mut **connection).await {
                tracing::debug!(
                    connection_id = connection.id(),
                    error = %e,
                    "idle connection failed ping, discarding"
                );
                return None;
            }
        }

        Some(pending.into_inner())
    }

    /// Connect a freshly created connection outside the lock.
    ///
    /// Any failure, and dropping this future part way, disposes the
    /// connection and gives its slot back.
    async fn open_connection(&self, mut pending: PendingConnection<'_>) -> Result<Box<dyn Connection>> {
        let connection = pending.connection_mut();
        let connection_id = connection.id();

        if let Err(e) = connection.connect().await {
            tracing::warn!(connection_id, error = %e, "failed to connect new connection");
            return Err(e.into_creation());
        }
        if !connection.is_valid() {
            tracing::warn!(connection_id, "factory produced a connection that is not usable");
            return Err(RfcError::Creation(format!(
                "connection {} is not valid after connect",
                connection_id
            )));
        }

        tracing::debug!(connection_id, "new connection opened");
        Ok(pending.into_inner())
    }
}

impl PoolInner {
    /// Reserve a slot and build a connection under the lock.
    ///
    /// Returns `None` when the pool is at capacity.
    fn create_connection(&self) -> Result<Option<PendingConnection<'_>>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(RfcError::PoolClosed);
        }
        if state.open >= self.config.pool_size() {
            return Ok(None);
        }

        // The counter only moves once the factory has succeeded, so a failing
        // or panicking factory leaves capacity untouched.
        let connection = self
            .factory
            .create(self.config.parameters())
            .map_err(RfcError::into_creation)?;
        state.open += 1;
        tracing::trace!(open = state.open, "capacity slot reserved");
        drop(state);

        Ok(Some(PendingConnection::new(self, connection)))
    }

    /// Give one capacity slot back and wake one waiter
    fn free_slot(&self) {
        {
            let mut state = self.state.lock();
            state.open = state.open.saturating_sub(1);
        }
        self.available.add_permits(1);
    }

    pub(super) fn evict_expired(&self) -> usize {
        let mut evicted = 0;
        loop {
            let entry = {
                let mut state = self.state.lock();
                match state.idle.front() {
                    Some(head) if head.expires_at <= Instant::now() => {}
                    // Entries share one timeout and are ordered by return
                    // time, so nothing behind an unexpired head has expired.
                    _ => break,
                }
                let Some(entry) = state.idle.pop_front() else {
                    break;
                };
                state.open = state.open.saturating_sub(1);
                entry
            };

            // A racing acquirer may already hold this entry's unit; it will
            // find the idle set empty and create into the freed slot instead.
            if let Ok(permit) = self.available.try_acquire() {
                permit.forget();
            }

            let mut connection = entry.connection;
            tracing::debug!(connection_id = connection.id(), "evicting idle connection");
            dispose_quietly(&mut *connection, "eviction");
            evicted += 1;
        }
        evicted
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        let state = self.state.get_mut();
        for mut entry in state.idle.drain(..) {
            dispose_quietly(&mut *entry.connection, "pool drop");
        }
    }
}

/// A connection that holds a capacity slot but has not been handed out yet.
///
/// Dropping it disposes the connection and frees the slot, which covers
/// early returns and cancelled futures alike.
struct PendingConnection<'a> {
    inner: &'a PoolInner,
    connection: Option<Box<dyn Connection>>,
}

impl<'a> PendingConnection<'a> {
    fn new(inner: &'a PoolInner, connection: Box<dyn Connection>) -> Self {
        Self {
            inner,
            connection: Some(connection),
        }
    }

    fn connection_mut(&mut self) -> &mut Box<dyn Connection> {
        self.connection.as_mut().expect("connection taken")
    }

    fn into_inner(mut self) -> Box<dyn Connection> {
        self.connection.take().expect("connection taken")
    }
}

impl Drop for PendingConnection<'_> {
    fn drop(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            dispose_quietly(&mut *connection, "slot rollback");
            self.inner.free_slot();
        }
    }
}

/// Counts a caller as waiting for as long as it is alive
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Dispose a connection, logging instead of propagating failures
fn dispose_quietly(connection: &mut dyn Connection, reason: &'static str) {
    if let Err(e) = connection.dispose() {
        tracing::warn!(
            connection_id = connection.id(),
            reason,
            error = %e,
            "failed to dispose connection"
        );
    }
}
