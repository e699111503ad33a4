use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use super::{JsonRpcRequest, JsonRpcResponse, RpcTransport, TransportKind};
use crate::error::{PermitError, ProviderError};

/// A backend that takes a JSON-RPC envelope and returns a future.
#[async_trait]
pub trait PromiseDispatch: Send + Sync {
    /// Sends an envelope and resolves with the response envelope.
    ///
    /// Backends that only accept positional arguments should fail with
    /// [`ProviderError::ObjectPayloadUnsupported`].
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError>;

    /// Sends `method` with positional `params` and resolves with the bare result.
    async fn send_positional(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

/// Transport over a [`PromiseDispatch`] backend.
pub struct PromiseTransport<'a> {
    dispatch: &'a dyn PromiseDispatch,
}

impl<'a> PromiseTransport<'a> {
    /// Wraps a promise backend.
    #[must_use]
    pub const fn new(dispatch: &'a dyn PromiseDispatch) -> Self {
        Self { dispatch }
    }
}

#[async_trait]
impl RpcTransport for PromiseTransport<'_> {
    fn kind(&self) -> TransportKind {
        TransportKind::Promise
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value, PermitError> {
        let request = JsonRpcRequest::new(method, params.clone());
        match self.dispatch.send(request).await {
            Ok(response) => response.into_result(),
            Err(ProviderError::ObjectPayloadUnsupported) => {
                tracing::warn!(method, "Backend rejected object payload, retrying with positional params");
                Ok(self.dispatch.send_positional(method, params).await?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl fmt::Debug for PromiseTransport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseTransport").finish_non_exhaustive()
    }
}
