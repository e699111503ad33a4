use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use super::{JsonRpcRequest, JsonRpcResponse, RpcTransport, TransportKind};
use crate::error::{PermitError, ProviderError};

/// Error-first completion callback: `Err` is the transport failure, `Ok` the response envelope.
pub type RpcCallback = Box<dyn FnOnce(Result<JsonRpcResponse, ProviderError>) + Send>;

/// A backend that takes a JSON-RPC envelope and answers through a callback.
pub trait CallbackDispatch: Send + Sync {
    /// Dispatches `request`; `callback` must be invoked at most once.
    fn send_async(&self, request: JsonRpcRequest, callback: RpcCallback);
}

/// Transport over a [`CallbackDispatch`] backend.
pub struct CallbackTransport<'a> {
    dispatch: &'a dyn CallbackDispatch,
}

impl<'a> CallbackTransport<'a> {
    /// Wraps a callback backend.
    #[must_use]
    pub const fn new(dispatch: &'a dyn CallbackDispatch) -> Self {
        Self { dispatch }
    }
}

#[async_trait]
impl RpcTransport for CallbackTransport<'_> {
    fn kind(&self) -> TransportKind {
        TransportKind::Callback
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value, PermitError> {
        let (tx, rx) = oneshot::channel();
        let request = JsonRpcRequest::new(method, params);
        self.dispatch.send_async(
            request,
            Box::new(move |outcome| {
                // Receiver is gone only if the caller stopped waiting.
                let _ = tx.send(outcome);
            }),
        );
        let response = rx.await.map_err(|_| ProviderError::Dropped)??;
        response.into_result()
    }
}

impl fmt::Debug for CallbackTransport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTransport").finish_non_exhaustive()
    }
}
