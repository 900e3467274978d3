//! Remote service handles.
//!
//! A [`ServiceHandle`] is the bound, ready-to-use view of the remote service:
//! it exposes the operations named by the WSDL and invokes them with keyword
//! arguments. A [`HandleFactory`] turns a WSDL location and a transport into a
//! handle; the registry calls it at most once per initialization.

use crate::envelope::{build_request, parse_response};
use crate::error::{CallFailure, ResolveError};
use crate::transport::{HttpResponse, SoapTransport};
use crate::wsdl::{parse_wsdl, SoapVersion, WsdlDocument};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Longest HTTP body excerpt kept in errors.
const MAX_BODY_EXCERPT: usize = 512;

/// Ordered keyword arguments for a remote operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationArgs(Vec<(String, Value)>);

impl OperationArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Arguments as a JSON object (later duplicates win).
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self.0.iter().cloned().collect();
        Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for OperationArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Callable view of a remote SOAP service.
#[async_trait]
pub trait ServiceHandle: Send + Sync {
    /// Invoke a remote operation.
    async fn invoke(&self, operation: &str, args: OperationArgs) -> Result<Value, CallFailure>;

    /// Names of the operations the service exposes.
    fn operations(&self) -> Vec<String>;

    fn has_operation(&self, operation: &str) -> bool {
        self.operations().iter().any(|op| op == operation)
    }
}

impl std::fmt::Debug for dyn ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("operations", &self.operations())
            .finish()
    }
}

/// Builds a [`ServiceHandle`] from a WSDL location.
#[async_trait]
pub trait HandleFactory: Send + Sync {
    async fn build(
        &self,
        location: &str,
        transport: SoapTransport,
    ) -> Result<Arc<dyn ServiceHandle>, ResolveError>;
}

/// Handle backed by a parsed WSDL and an HTTP transport.
#[derive(Debug)]
pub struct WsdlServiceHandle {
    wsdl: WsdlDocument,
    address: String,
    transport: SoapTransport,
}

impl WsdlServiceHandle {
    pub fn new(wsdl: WsdlDocument, address: impl Into<String>, transport: SoapTransport) -> Self {
        Self {
            wsdl,
            address: address.into(),
            transport,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn version(&self) -> SoapVersion {
        self.wsdl.version
    }

    pub fn wsdl(&self) -> &WsdlDocument {
        &self.wsdl
    }
}

#[async_trait]
impl ServiceHandle for WsdlServiceHandle {
    async fn invoke(&self, operation: &str, args: OperationArgs) -> Result<Value, CallFailure> {
        let op = self
            .wsdl
            .operation(operation)
            .ok_or_else(|| CallFailure::OperationNotFound(operation.to_string()))?;

        let envelope = build_request(
            self.wsdl.version,
            self.wsdl.target_namespace.as_deref(),
            operation,
            &args,
        )?;
        let response = self
            .transport
            .post_envelope(&self.address, self.wsdl.version, op.soap_action.as_deref(), envelope)
            .await?;

        debug!(operation = %operation, status = response.status, "SOAP response received");
        decode(response)
    }

    fn operations(&self) -> Vec<String> {
        self.wsdl.operation_names()
    }

    fn has_operation(&self, operation: &str) -> bool {
        self.wsdl.operation(operation).is_some()
    }
}

/// Faults win over the HTTP status; other non-success responses become
/// [`CallFailure::Http`].
fn decode(response: HttpResponse) -> Result<Value, CallFailure> {
    let success = response.is_success();
    match parse_response(&response.body) {
        Ok(value) if success => Ok(value),
        Err(CallFailure::Fault(fault)) => Err(CallFailure::Fault(fault)),
        Err(CallFailure::XmlSyntax(detail)) if success => Err(CallFailure::XmlSyntax(detail)),
        _ => Err(CallFailure::Http {
            status: response.status,
            body: excerpt(&response.body),
        }),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Resolves WSDL documents over HTTP(S) or from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsdlHandleFactory;

fn is_http(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

impl WsdlHandleFactory {
    async fn load(&self, location: &str, transport: &SoapTransport) -> Result<String, ResolveError> {
        if is_http(location) {
            let response = transport.fetch(location).await.map_err(ResolveError::Fetch)?;
            if !response.is_success() {
                return Err(ResolveError::Fetch(CallFailure::Http {
                    status: response.status,
                    body: excerpt(&response.body),
                }));
            }
            Ok(response.body)
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            Ok(tokio::fs::read_to_string(path).await?)
        }
    }
}

#[async_trait]
impl HandleFactory for WsdlHandleFactory {
    async fn build(
        &self,
        location: &str,
        transport: SoapTransport,
    ) -> Result<Arc<dyn ServiceHandle>, ResolveError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(ResolveError::EmptyLocation);
        }

        let xml = self.load(location, &transport).await?;
        let wsdl = parse_wsdl(&xml)?;

        let address = match (&wsdl.address, is_http(location)) {
            (Some(address), _) => address.clone(),
            (None, true) => location.split('?').next().unwrap_or(location).to_string(),
            (None, false) => {
                return Err(ResolveError::InvalidWsdl(
                    "no SOAP service address declared".to_string(),
                ))
            }
        };

        info!(
            address = %address,
            version = ?wsdl.version,
            operations = wsdl.operations.len(),
            "WSDL resolved"
        );

        Ok(Arc::new(WsdlServiceHandle::new(wsdl, address, transport)))
    }
}
