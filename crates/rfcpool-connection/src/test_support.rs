//! Mock connections shared by the unit tests

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rfcpool_core::{
    Connection, ConnectionFactory, ConnectionParameters, Function, Result, RfcError, Value,
};
use serde_json::json;

/// Shared record of everything the mocks were asked to do
#[derive(Default)]
pub(crate) struct Recorder {
    created: AtomicU64,
    invocations: AtomicUsize,
    pings: AtomicUsize,
    disposed: Mutex<Vec<u64>>,
    invalid: Mutex<HashSet<u64>>,
    communication_failures: AtomicUsize,
    factory_failures: AtomicUsize,
    connect_failures: AtomicUsize,
    connect_hangs: AtomicUsize,
    application_failure: AtomicBool,
    invalid_after_connect: AtomicBool,
    ping_fails: AtomicBool,
}

impl Recorder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub(crate) fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub(crate) fn disposed(&self) -> Vec<u64> {
        self.disposed.lock().clone()
    }

    pub(crate) fn is_disposed(&self, id: u64) -> bool {
        self.disposed.lock().contains(&id)
    }

    /// The next `n` invocations, on any connection, fail with a
    /// communication error
    pub(crate) fn fail_communication(&self, n: usize) {
        self.communication_failures.store(n, Ordering::SeqCst);
    }

    pub(crate) fn fail_application(&self) {
        self.application_failure.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_factory(&self, n: usize) {
        self.factory_failures.store(n, Ordering::SeqCst);
    }

    pub(crate) fn fail_connect(&self, n: usize) {
        self.connect_failures.store(n, Ordering::SeqCst);
    }

    /// The next `n` connects never complete
    pub(crate) fn hang_connect(&self, n: usize) {
        self.connect_hangs.store(n, Ordering::SeqCst);
    }

    pub(crate) fn produce_invalid_connections(&self) {
        self.invalid_after_connect.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_pings(&self) {
        self.ping_fails.store(true, Ordering::SeqCst);
    }

    pub(crate) fn invalidate(&self, id: u64) {
        self.invalid.lock().insert(id);
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub(crate) struct MockConnection {
    id: u64,
    recorder: Arc<Recorder>,
    connected: bool,
}

#[async_trait]
impl Connection for MockConnection {
    fn id(&self) -> u64 {
        self.id
    }

    async fn connect(&mut self) -> Result<()> {
        if Recorder::take(&self.recorder.connect_hangs) {
            std::future::pending::<()>().await;
        }
        if Recorder::take(&self.recorder.connect_failures) {
            return Err(RfcError::Connection("logon rejected".into()));
        }
        if self.recorder.invalid_after_connect.load(Ordering::SeqCst) {
            self.recorder.invalidate(self.id);
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.connected && !self.recorder.invalid.lock().contains(&self.id)
    }

    async fn ping(&mut self) -> Result<()> {
        self.recorder.pings.fetch_add(1, Ordering::SeqCst);
        if self.recorder.ping_fails.load(Ordering::SeqCst) {
            return Err(RfcError::Communication("ping timed out".into()));
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        self.connected = false;
        self.recorder.disposed.lock().push(self.id);
        Ok(())
    }

    fn create_function(&mut self, name: &str) -> Result<Box<dyn Function>> {
        Ok(Box::new(MockFunction {
            name: name.to_string(),
            connection_id: self.id,
            recorder: self.recorder.clone(),
        }))
    }
}

struct MockFunction {
    name: String,
    connection_id: u64,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl Function for MockFunction {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&mut self, input: Option<Value>) -> Result<Value> {
        self.recorder.invocations.fetch_add(1, Ordering::SeqCst);
        if Recorder::take(&self.recorder.communication_failures) {
            return Err(RfcError::Communication("connection reset by partner".into()));
        }
        if self.recorder.application_failure.load(Ordering::SeqCst) {
            return Err(RfcError::Application(format!("{} raised NOT_FOUND", self.name)));
        }
        Ok(json!({
            "function": self.name,
            "connection": self.connection_id,
            "input": input,
        }))
    }
}

/// Factory handing out sequentially numbered mock connections, starting at 1
pub(crate) struct MockFactory {
    recorder: Arc<Recorder>,
}

impl MockFactory {
    pub(crate) fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

impl ConnectionFactory for MockFactory {
    fn create(&self, _parameters: &ConnectionParameters) -> Result<Box<dyn Connection>> {
        if Recorder::take(&self.recorder.factory_failures) {
            return Err(RfcError::Creation("destination not configured".into()));
        }
        let id = self.recorder.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockConnection {
            id,
            recorder: self.recorder.clone(),
            connected: false,
        }))
    }
}
