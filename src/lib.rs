//! Resilient client adapter for legacy SOAP services
//!
//! Connects to a WSDL-described SOAP backend once, reuses that connection for
//! every caller, and reports every remote failure through a single error type.
//!
//! # Features
//!
//! - Single-flight, lazily built service handle ([`ClientRegistry`])
//! - HTTP Basic authentication and a fixed per-call timeout
//! - Uniform failure classification ([`LegacySystemError`]): protocol faults,
//!   malformed XML, connection failures and unexpected errors
//! - WSDL 1.1 operation discovery and document/literal envelopes (SOAP 1.1 and 1.2)
//!
//! # Example
//!
//! ```ignore
//! use legacy_soap_client::{ClientRegistry, LegacyClientConfig, LegacySoapClient};
//!
//! let registry = ClientRegistry::new();
//! let config = LegacyClientConfig::from_env()?;
//! let client = LegacySoapClient::connect(&registry, &config).await?;
//!
//! let user = client.get_user_data("user123").await?;
//! client.update_product_stock("prod456", 100).await?;
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handle;
pub mod registry;
pub mod transport;
pub mod wsdl;

mod xml;

#[cfg(test)]
mod testing;

pub use adapter::invoke_remote;
pub use client::LegacySoapClient;
pub use config::LegacyClientConfig;
pub use error::{CallFailure, ErrorCategory, InitializationError, LegacySystemError, SoapFault};
pub use handle::{HandleFactory, OperationArgs, ServiceHandle, WsdlHandleFactory};
pub use registry::{ClientRegistry, RegistryState};
