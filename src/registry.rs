//! Owner of the single shared service handle.
//!
//! The registry builds the handle on the first [`ClientRegistry::acquire`]
//! and hands out clones of the same `Arc` afterwards. Construction is
//! single-flight: concurrent first callers wait on an async mutex and all
//! observe the handle built by whichever of them ran first. Once initialized,
//! `acquire` only takes a short read lock.
//!
//! The registry is an ordinary value. Create one at startup and share it
//! (usually behind an `Arc`) with whatever serves business operations.

use crate::config::LegacyClientConfig;
use crate::error::{InitializationError, ResolveError};
use crate::handle::{HandleFactory, ServiceHandle, WsdlHandleFactory};
use crate::transport::SoapTransport;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Lifecycle state of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Uninitialized,
    Initialized,
}

struct Cached {
    handle: Arc<dyn ServiceHandle>,
    config: LegacyClientConfig,
}

/// Lazily-initialized holder of one [`ServiceHandle`].
pub struct ClientRegistry<F = WsdlHandleFactory> {
    factory: F,
    slot: RwLock<Option<Cached>>,
    init_lock: Mutex<()>,
}

impl ClientRegistry<WsdlHandleFactory> {
    /// Registry resolving WSDL documents over HTTP(S) or from disk.
    pub fn new() -> Self {
        Self::with_factory(WsdlHandleFactory)
    }
}

impl Default for ClientRegistry<WsdlHandleFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> std::fmt::Debug for ClientRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("state", &self.state())
            .finish()
    }
}

impl<F> ClientRegistry<F> {
    pub fn with_factory(factory: F) -> Self {
        Self {
            factory,
            slot: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn state(&self) -> RegistryState {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            RegistryState::Initialized
        } else {
            RegistryState::Uninitialized
        }
    }

    /// The cached handle, if initialized.
    pub fn cached(&self) -> Option<Arc<dyn ServiceHandle>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|cached| Arc::clone(&cached.handle))
    }

    /// Drop the cached handle so the next `acquire` rebuilds it.
    ///
    /// Operational and test hook; normal runtime code never calls this.
    pub fn reset(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.take().is_some() {
            info!("SOAP client registry reset");
        }
    }

    fn cached_for(&self, config: &LegacyClientConfig) -> Option<Arc<dyn ServiceHandle>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        let cached = slot.as_ref()?;
        if cached.config != *config {
            // First configuration wins for the lifetime of the handle.
            debug!(
                active_endpoint = %cached.config.endpoint_url,
                requested_endpoint = %config.endpoint_url,
                "Ignoring configuration passed to an initialized registry"
            );
        }
        Some(Arc::clone(&cached.handle))
    }
}

impl<F: HandleFactory> ClientRegistry<F> {
    /// Return the shared handle, building it on first use.
    ///
    /// After a successful build the `config` argument is ignored until
    /// [`reset`](Self::reset). A failed build leaves the registry
    /// uninitialized, so the next call tries again.
    pub async fn acquire(
        &self,
        config: &LegacyClientConfig,
    ) -> Result<Arc<dyn ServiceHandle>, InitializationError> {
        if let Some(handle) = self.cached_for(config) {
            return Ok(handle);
        }

        let _guard = self.init_lock.lock().await;
        if let Some(handle) = self.cached_for(config) {
            return Ok(handle);
        }

        info!(endpoint = %config.endpoint_url, "Initializing SOAP client");

        match self.construct(config).await {
            Ok(handle) => {
                let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
                *slot = Some(Cached {
                    handle: Arc::clone(&handle),
                    config: config.clone(),
                });
                info!(
                    endpoint = %config.endpoint_url,
                    operations = handle.operations().len(),
                    "SOAP client initialized"
                );
                Ok(handle)
            }
            Err(source) => {
                error!(
                    severity = "critical",
                    endpoint = %config.endpoint_url,
                    error = %source,
                    cause = ?source,
                    "Failed to initialize SOAP client"
                );
                Err(InitializationError::new(source))
            }
        }
    }

    async fn construct(
        &self,
        config: &LegacyClientConfig,
    ) -> Result<Arc<dyn ServiceHandle>, ResolveError> {
        config.validate()?;
        let transport = SoapTransport::new(config)?;
        self.factory.build(&config.endpoint_url, transport).await
    }
}
