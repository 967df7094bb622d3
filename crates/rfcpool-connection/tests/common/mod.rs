//! Common test utilities and mocks

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use rfcpool_connection::{
    Connection, ConnectionParameters, ConnectionPool, Function, PoolConfig, Result, RfcError,
    Value,
};
use serde_json::json;

/// Backend shared by every mock connection a factory hands out.
#[derive(Default)]
pub struct MockBackend {
    created: AtomicU64,
    invocations: AtomicUsize,
    communication_failures: AtomicUsize,
    disposed: parking_lot::Mutex<Vec<u64>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self, id: u64) -> bool {
        self.disposed.lock().contains(&id)
    }

    pub fn disposed_count(&self) -> usize {
        self.disposed.lock().len()
    }

    /// Make the next `n` invocations fail as if the link dropped
    pub fn drop_link(&self, n: usize) {
        self.communication_failures.store(n, Ordering::SeqCst);
    }
}

pub struct MockConnection {
    id: u64,
    backend: Arc<MockBackend>,
    connected: bool,
}

#[async_trait]
impl Connection for MockConnection {
    fn id(&self) -> u64 {
        self.id
    }

    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.connected
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        self.connected = false;
        self.backend.disposed.lock().push(self.id);
        Ok(())
    }

    fn create_function(&mut self, name: &str) -> Result<Box<dyn Function>> {
        Ok(Box::new(MockFunction {
            name: name.to_string(),
            connection_id: self.id,
            backend: self.backend.clone(),
        }))
    }
}

struct MockFunction {
    name: String,
    connection_id: u64,
    backend: Arc<MockBackend>,
}

#[async_trait]
impl Function for MockFunction {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&mut self, input: Option<Value>) -> Result<Value> {
        self.backend.invocations.fetch_add(1, Ordering::SeqCst);
        let dropped = self
            .backend
            .communication_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            return Err(RfcError::Communication("partner closed the link".into()));
        }
        Ok(json!({ "connection": self.connection_id, "input": input }))
    }
}

/// Build a pool over a fresh mock backend.
pub fn mock_pool(config: PoolConfig) -> (ConnectionPool, Arc<MockBackend>) {
    let backend = MockBackend::new();
    let factory_backend = backend.clone();
    let factory = move |_params: &ConnectionParameters| -> Result<Box<dyn Connection>> {
        let id = factory_backend.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockConnection {
            id,
            backend: factory_backend.clone(),
            connected: false,
        }))
    };
    let pool = ConnectionPool::new(config, factory).expect("valid pool config");
    (pool, backend)
}

/// Initialize tracing for tests, once per process
pub fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("rfcpool_connection=debug".parse().unwrap()),
            )
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
