//! Business operations on the legacy service.
//!
//! [`LegacySoapClient`] holds the handle acquired from a
//! [`ClientRegistry`] and routes every operation through
//! [`invoke_remote`], so callers only ever see [`LegacySystemError`].

use crate::adapter::invoke_remote;
use crate::config::LegacyClientConfig;
use crate::error::{InitializationError, LegacySystemError};
use crate::handle::{HandleFactory, OperationArgs, ServiceHandle};
use crate::registry::ClientRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Remote operation used by [`LegacySoapClient::get_user_data`].
pub const OP_GET_USER: &str = "GetUser";
/// Remote operation used by [`LegacySoapClient::update_product_stock`].
pub const OP_UPDATE_PRODUCT_STOCK: &str = "UpdateProductStock";

/// Client for the legacy SOAP service.
///
/// Cheap to clone; all clones share the registry's handle.
#[derive(Clone)]
pub struct LegacySoapClient {
    handle: Arc<dyn ServiceHandle>,
}

impl std::fmt::Debug for LegacySoapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacySoapClient")
            .field("operations", &self.handle.operations())
            .finish()
    }
}

impl LegacySoapClient {
    pub fn new(handle: Arc<dyn ServiceHandle>) -> Self {
        Self { handle }
    }

    /// Acquire the registry's handle (building it on first use).
    pub async fn connect<F: HandleFactory>(
        registry: &ClientRegistry<F>,
        config: &LegacyClientConfig,
    ) -> Result<Self, InitializationError> {
        let handle = registry.acquire(config).await?;
        Ok(Self::new(handle))
    }

    pub fn handle(&self) -> &Arc<dyn ServiceHandle> {
        &self.handle
    }

    /// Operations exposed by the service.
    pub fn operations(&self) -> Vec<String> {
        self.handle.operations()
    }

    /// Invoke any operation by name.
    pub async fn call(
        &self,
        operation: &str,
        args: OperationArgs,
    ) -> Result<Value, LegacySystemError> {
        invoke_remote(operation, || self.handle.invoke(operation, args)).await
    }

    /// Look up a user with `GetUser`.
    pub async fn get_user_data(&self, user_id: &str) -> Result<Value, LegacySystemError> {
        let response = self
            .call(OP_GET_USER, OperationArgs::new().arg("userId", user_id))
            .await?;
        info!(user_id = %user_id, "User data retrieved");
        Ok(response)
    }

    /// Set a product's stock with `UpdateProductStock`.
    ///
    /// Returns `true` whenever the call completes; the response body is not
    /// inspected.
    pub async fn update_product_stock(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> Result<bool, LegacySystemError> {
        let args = OperationArgs::new()
            .arg("productId", product_id)
            .arg("newQuantity", quantity);
        self.call(OP_UPDATE_PRODUCT_STOCK, args).await?;
        info!(product_id = %product_id, quantity = quantity, "Product stock updated");
        Ok(true)
    }
}
