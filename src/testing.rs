//! Stub handles and factories for unit tests.

use crate::error::{CallFailure, ResolveError, SoapFault};
use crate::handle::{HandleFactory, OperationArgs, ServiceHandle};
use crate::transport::SoapTransport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted outcome of a stub operation.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Value(Value),
    Fault(String),
    Connection(String),
    Xml(String),
}

impl Reply {
    fn into_result(self) -> Result<Value, CallFailure> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Fault(msg) => Err(CallFailure::Fault(SoapFault::new("soap:Server", msg))),
            Self::Connection(msg) => Err(CallFailure::Connection(msg)),
            Self::Xml(msg) => Err(CallFailure::XmlSyntax(msg)),
        }
    }
}

/// Handle exposing a fixed set of operations and recording every call.
#[derive(Debug, Default)]
pub(crate) struct StubHandle {
    operations: Vec<String>,
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<(String, OperationArgs)>>,
}

impl StubHandle {
    pub fn new(operations: &[&str]) -> Self {
        Self {
            operations: operations.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_reply(self, operation: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(operation.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<(String, OperationArgs)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceHandle for StubHandle {
    async fn invoke(&self, operation: &str, args: OperationArgs) -> Result<Value, CallFailure> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), args));

        if !self.operations.iter().any(|op| op == operation) {
            return Err(CallFailure::OperationNotFound(operation.to_string()));
        }

        let reply = self.replies.lock().unwrap().get(operation).cloned();
        reply.map_or(Ok(Value::Null), Reply::into_result)
    }

    fn operations(&self) -> Vec<String> {
        self.operations.clone()
    }
}

/// Factory counting constructions, optionally failing the first attempts.
#[derive(Debug, Default)]
pub(crate) struct CountingFactory {
    builds: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Option<Duration>,
    locations: Mutex<Vec<String>>,
    saw_auth: Mutex<Vec<bool>>,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(times: usize) -> Self {
        let factory = Self::default();
        factory.failures_left.store(times, Ordering::SeqCst);
        factory
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn locations(&self) -> Vec<String> {
        self.locations.lock().unwrap().clone()
    }

    pub fn saw_auth(&self) -> Vec<bool> {
        self.saw_auth.lock().unwrap().clone()
    }
}

#[async_trait]
impl HandleFactory for CountingFactory {
    async fn build(
        &self,
        location: &str,
        transport: SoapTransport,
    ) -> Result<Arc<dyn ServiceHandle>, ResolveError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.locations.lock().unwrap().push(location.to_string());
        self.saw_auth.lock().unwrap().push(transport.has_basic_auth());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ResolveError::InvalidWsdl("WSDL connection error".to_string()));
        }

        Ok(Arc::new(StubHandle::new(&["GetUser", "UpdateProductStock"])))
    }
}
