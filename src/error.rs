//! Error types for the legacy SOAP client.
//!
//! Remote-call failures flow through two layers:
//!
//! - [`CallFailure`] is the tagged failure produced by the transport and SOAP
//!   binding. It is an internal contract between a [`ServiceHandle`] and the
//!   call adapter.
//! - [`LegacySystemError`] is the only failure callers of business operations
//!   ever see. It is built by [`invoke_remote`] from a `CallFailure` and keeps
//!   it as its source.
//!
//! [`InitializationError`] is separate: it is raised once, when the registry
//! fails to construct the service handle.
//!
//! [`ServiceHandle`]: crate::handle::ServiceHandle
//! [`invoke_remote`]: crate::adapter::invoke_remote

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("timeout must be a positive number of seconds")]
    ZeroTimeout,

    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("failed to parse config file: {0}")]
    Parse(String),
}

/// Failures while turning a WSDL location into a service handle.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("WSDL location is empty")]
    EmptyLocation,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP transport: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to fetch WSDL: {0}")]
    Fetch(#[source] CallFailure),

    #[error("failed to read WSDL file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid WSDL document: {0}")]
    InvalidWsdl(String),
}

/// Fatal error raised when the service handle cannot be constructed.
///
/// The registry stays uninitialized after this error, so the next
/// `acquire` attempts construction again.
#[derive(Error, Debug)]
#[error("could not initialize SOAP client: {source}")]
pub struct InitializationError {
    #[source]
    source: ResolveError,
}

impl InitializationError {
    pub fn new(source: ResolveError) -> Self {
        Self { source }
    }

    /// The underlying construction failure.
    pub fn cause(&self) -> &ResolveError {
        &self.source
    }
}

/// A fault returned by the remote service inside the SOAP body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapFault {
    /// `faultcode` (1.1) or `Code/Value` (1.2)
    pub code: String,
    /// `faultstring` (1.1) or `Reason/Text` (1.2)
    pub message: String,
    /// `faultactor` (1.1) or `Role` (1.2)
    pub actor: Option<String>,
    /// Flattened text of the `detail` element
    pub detail: Option<String>,
}

impl SoapFault {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            actor: None,
            detail: None,
        }
    }
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SoapFault {}

/// Tagged failure reported by a service handle for a single remote call.
#[derive(Error, Debug)]
pub enum CallFailure {
    /// The service answered with a SOAP Fault.
    #[error(transparent)]
    Fault(SoapFault),

    /// The response could not be parsed as a SOAP envelope.
    #[error("{0}")]
    XmlSyntax(String),

    /// The service could not be reached or the connection dropped.
    #[error("{0}")]
    Connection(String),

    /// Error reported by the HTTP client.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status without a SOAP envelope in the body.
    #[error("HTTP status {status}: {body}")]
    Http { status: u16, body: String },

    /// The resolved handle does not expose the requested operation.
    #[error("operation '{0}' not found on service")]
    OperationNotFound(String),

    /// An operation or argument name is not a valid XML element name.
    #[error("invalid XML element name '{0}'")]
    InvalidName(String),

    #[error("{0}")]
    Other(String),
}

impl CallFailure {
    /// Whether this failure means the service was unreachable.
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Transport(e) => e.is_connect() || e.is_timeout() || is_dropped_connection(e),
            _ => false,
        }
    }
}

/// Whether the error chain shows a connection that was closed or reset
/// after it was established.
fn is_dropped_connection(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        if let Some(hyper) = err.downcast_ref::<hyper::Error>() {
            if hyper.is_incomplete_message() || hyper.is_closed() {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Category assigned to a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The remote service signaled an application error
    ProtocolFault,
    /// The response was not valid XML / SOAP
    MalformedResponse,
    /// Transport or connectivity failure
    ConnectionFailure,
    /// Anything else, including interface mismatches
    Unexpected,
}

impl ErrorCategory {
    /// Classify a call failure.
    ///
    /// Checks run in a fixed order: fault, malformed XML, connection, then
    /// the catch-all.
    pub fn classify(failure: &CallFailure) -> Self {
        if matches!(failure, CallFailure::Fault(_)) {
            Self::ProtocolFault
        } else if matches!(failure, CallFailure::XmlSyntax(_)) {
            Self::MalformedResponse
        } else if failure.is_connection() {
            Self::ConnectionFailure
        } else {
            Self::Unexpected
        }
    }

    /// Get the string code for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProtocolFault => "PROTOCOL_FAULT",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
            Self::ConnectionFailure => "CONNECTION_FAILURE",
            Self::Unexpected => "UNEXPECTED",
        }
    }

    fn message_prefix(&self) -> &'static str {
        match self {
            Self::ProtocolFault => "legacy system error",
            Self::MalformedResponse => "XML syntax error",
            Self::ConnectionFailure => "connection error with legacy service",
            Self::Unexpected => "unexpected error communicating with legacy system",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type surfaced by remote operations.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct LegacySystemError {
    category: ErrorCategory,
    message: String,
    #[source]
    cause: CallFailure,
}

impl LegacySystemError {
    /// Normalize a call failure.
    pub fn from_failure(cause: CallFailure) -> Self {
        let category = ErrorCategory::classify(&cause);
        let message = format!("{}: {}", category.message_prefix(), cause);
        Self {
            category,
            message,
            cause,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The original failure.
    pub fn cause(&self) -> &CallFailure {
        &self.cause
    }

    /// The SOAP fault, if the service signaled one.
    pub fn fault(&self) -> Option<&SoapFault> {
        match &self.cause {
            CallFailure::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<CallFailure> for LegacySystemError {
    fn from(cause: CallFailure) -> Self {
        Self::from_failure(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_as_str() {
        assert_eq!(ErrorCategory::ProtocolFault.as_str(), "PROTOCOL_FAULT");
        assert_eq!(ErrorCategory::ConnectionFailure.as_str(), "CONNECTION_FAILURE");
    }

    #[test]
    fn test_classify_each_variant() {
        let cases = vec![
            (
                CallFailure::Fault(SoapFault::new("soap:Server", "boom")),
                ErrorCategory::ProtocolFault,
            ),
            (
                CallFailure::XmlSyntax("bad".to_string()),
                ErrorCategory::MalformedResponse,
            ),
            (
                CallFailure::Connection("refused".to_string()),
                ErrorCategory::ConnectionFailure,
            ),
            (
                CallFailure::Http {
                    status: 502,
                    body: "bad gateway".to_string(),
                },
                ErrorCategory::Unexpected,
            ),
            (
                CallFailure::OperationNotFound("Nope".to_string()),
                ErrorCategory::Unexpected,
            ),
            (CallFailure::Other("?".to_string()), ErrorCategory::Unexpected),
            (CallFailure::InvalidName("a>b".to_string()), ErrorCategory::Unexpected),
        ];

        for (failure, expected) in cases {
            assert_eq!(ErrorCategory::classify(&failure), expected, "{:?}", failure);
        }
    }

    #[derive(Debug)]
    struct Wrapped(std::io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "error sending request")
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_dropped_connection_in_source_chain() {
        use std::io::{Error as IoError, ErrorKind};

        for kind in [
            ErrorKind::ConnectionReset,
            ErrorKind::ConnectionAborted,
            ErrorKind::BrokenPipe,
            ErrorKind::UnexpectedEof,
        ] {
            assert!(is_dropped_connection(&Wrapped(IoError::from(kind))), "{:?}", kind);
        }
        assert!(!is_dropped_connection(&Wrapped(IoError::from(ErrorKind::InvalidData))));
    }

    #[test]
    fn test_fault_message() {
        let err = LegacySystemError::from_failure(CallFailure::Fault(SoapFault::new(
            "soap:Client",
            "User not found",
        )));
        assert_eq!(err.category(), ErrorCategory::ProtocolFault);
        assert_eq!(err.to_string(), "legacy system error: User not found");
        assert_eq!(err.fault().map(|f| f.code.as_str()), Some("soap:Client"));
    }

    #[test]
    fn test_connection_message() {
        let err: LegacySystemError = CallFailure::Connection("Service unavailable".to_string()).into();
        assert_eq!(
            err.message(),
            "connection error with legacy service: Service unavailable"
        );
        assert!(err.fault().is_none());
    }

    #[test]
    fn test_source_chain_preserved() {
        use std::error::Error as _;

        let err: LegacySystemError = CallFailure::XmlSyntax("unexpected EOF".to_string()).into();
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "unexpected EOF");
    }

    #[test]
    fn test_initialization_error_contains_cause() {
        let err = InitializationError::new(ResolveError::InvalidWsdl("no operations".to_string()));
        assert!(err.to_string().contains("no operations"));
        assert!(matches!(err.cause(), ResolveError::InvalidWsdl(_)));
    }
}
