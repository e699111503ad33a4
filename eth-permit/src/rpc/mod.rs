//! JSON-RPC dispatch across wallet calling conventions.
//!
//! Wallet backends expose signing in three incompatible ways. A
//! [`ProviderHandle`] advertises which of them it supports, and
//! [`Dispatcher::probe`] picks exactly one, in this priority:
//!
//! 1. [`SignerTransport`] - the handle signs typed data itself and answers
//!    reads through its own call mechanism, without a JSON-RPC envelope.
//! 2. [`CallbackTransport`] - the handle takes a `{id, method, params}`
//!    envelope and answers through an error-first callback.
//! 3. [`PromiseTransport`] - the handle takes the same envelope and returns
//!    a future; backends that refuse object payloads are retried once with
//!    positional arguments.
//!
//! The chosen transport is fixed for the lifetime of the dispatcher, so the
//! call path never branches on handle shape again.

mod callback;
#[cfg(feature = "signer-local")]
mod local;
mod promise;
#[cfg(feature = "provider")]
mod provider;
mod signer;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub use callback::{CallbackDispatch, CallbackTransport, RpcCallback};
#[cfg(feature = "signer-local")]
pub use local::{LocalSigner, SignerLike};
pub use promise::{PromiseDispatch, PromiseTransport};
#[cfg(feature = "provider")]
pub use provider::AlloyDispatch;
pub use signer::{SignerTransport, TypedDataSigner};

use crate::error::{JsonRpcError, PermitError};
use crate::signature::{SignatureRsv, decode_signature};
use crate::typed_data::PermitTypedData;

/// Exclusive upper bound of request ids.
const REQUEST_ID_BOUND: u64 = 10_000_000_000;

/// A JSON-RPC request envelope.
///
/// Ids are random and only need to be unique enough for a single in-flight
/// request; responses are never correlated across requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Request id.
    pub id: u64,
    /// RPC method name.
    pub method: String,
    /// Positional parameters.
    pub params: Value,
}

impl JsonRpcRequest {
    /// Creates an envelope with a fresh random id.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            id: rand::rng().random_range(0..REQUEST_ID_BOUND),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC response envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Id echoed by the backend, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Successful result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Provider-level error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// A successful response to request `id`.
    #[must_use]
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id: Some(id.into()),
            result: Some(result),
            error: None,
        }
    }

    /// A failed response to request `id`.
    #[must_use]
    pub fn failure(id: u64, error: JsonRpcError) -> Self {
        Self {
            id: Some(id.into()),
            result: None,
            error: Some(error),
        }
    }

    /// Unwraps the result, rejecting an embedded error envelope.
    ///
    /// The envelope is logged before it is returned as [`PermitError::Rpc`].
    ///
    /// # Errors
    ///
    /// Returns [`PermitError::Rpc`] if the response carries an error.
    pub fn into_result(self) -> Result<Value, PermitError> {
        if let Some(error) = self.error {
            return Err(PermitError::rpc(error));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// The calling convention a dispatcher settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Signer with native typed-data signing.
    Signer,
    /// Envelope dispatch with an error-first callback.
    Callback,
    /// Envelope dispatch returning a future.
    Promise,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signer => write!(f, "signer"),
            Self::Callback => write!(f, "callback"),
            Self::Promise => write!(f, "promise"),
        }
    }
}

/// RPC method used to request a typed-data signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignTypedDataMethod {
    /// `eth_signTypedData`, typed data passed as an object.
    #[serde(rename = "eth_signTypedData")]
    Legacy,
    /// `eth_signTypedData_v3`, typed data passed as a JSON string.
    #[serde(rename = "eth_signTypedData_v3")]
    V3,
    /// `eth_signTypedData_v4`, typed data passed as a JSON string.
    #[default]
    #[serde(rename = "eth_signTypedData_v4")]
    V4,
}

impl SignTypedDataMethod {
    /// The JSON-RPC method name.
    #[must_use]
    pub const fn rpc_method(self) -> &'static str {
        match self {
            Self::Legacy => "eth_signTypedData",
            Self::V3 => "eth_signTypedData_v3",
            Self::V4 => "eth_signTypedData_v4",
        }
    }

    /// The method to retry with when this one is reported unsupported.
    ///
    /// Only the newest method falls back, and only once.
    #[must_use]
    pub const fn fallback(self) -> Option<Self> {
        match self {
            Self::V4 => Some(Self::Legacy),
            Self::Legacy | Self::V3 => None,
        }
    }

    /// Builds the positional `[address, typedData]` parameters.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the typed data cannot be serialized.
    pub fn params(
        self,
        from: Address,
        typed_data: &PermitTypedData,
    ) -> Result<Value, serde_json::Error> {
        Ok(match self {
            Self::Legacy => json!([from, typed_data]),
            Self::V3 | Self::V4 => json!([from, typed_data.to_json_string()?]),
        })
    }
}

impl fmt::Display for SignTypedDataMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rpc_method())
    }
}

/// Error for an unrecognized signing method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signing method: {0}")]
pub struct UnknownSignMethod(pub String);

impl FromStr for SignTypedDataMethod {
    type Err = UnknownSignMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eth_signTypedData" => Ok(Self::Legacy),
            "eth_signTypedData_v3" => Ok(Self::V3),
            "eth_signTypedData_v4" => Ok(Self::V4),
            other => Err(UnknownSignMethod(other.to_owned())),
        }
    }
}

/// One calling convention for talking to a wallet backend.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Which convention this transport implements.
    fn kind(&self) -> TransportKind;

    /// Sends one request and returns its result.
    async fn send(&self, method: &str, params: Value) -> Result<Value, PermitError>;

    /// Requests a typed-data signature from `from`.
    ///
    /// The default implementation sends `method` over [`send`](Self::send);
    /// if the backend reports that method unsupported and it has a
    /// [`fallback`](SignTypedDataMethod::fallback), the fallback is tried once.
    /// Any other failure propagates unchanged.
    async fn sign_typed_data(
        &self,
        from: Address,
        typed_data: &PermitTypedData,
        method: SignTypedDataMethod,
    ) -> Result<SignatureRsv, PermitError> {
        let result = match self.send(method.rpc_method(), method.params(from, typed_data)?).await {
            Ok(result) => result,
            Err(err) if err.is_method_unsupported(method.rpc_method()) => {
                let Some(older) = method.fallback() else {
                    return Err(err);
                };
                tracing::warn!(unsupported = %method, fallback = %older, "Signing method unsupported, retrying with older method");
                self.send(older.rpc_method(), older.params(from, typed_data)?)
                    .await?
            }
            Err(err) => return Err(err),
        };
        Ok(decode_signature(&result)?)
    }
}

/// Capability probe for a wallet or provider object.
///
/// Implementors return `Some` for every calling convention they support;
/// [`Dispatcher::probe`] picks the highest-priority one.
pub trait ProviderHandle: Send + Sync {
    /// Native typed-data signing capability.
    fn typed_data_signer(&self) -> Option<&dyn TypedDataSigner> {
        None
    }

    /// Callback-based envelope dispatch.
    fn callback_dispatch(&self) -> Option<&dyn CallbackDispatch> {
        None
    }

    /// Future-based envelope dispatch.
    fn promise_dispatch(&self) -> Option<&dyn PromiseDispatch> {
        None
    }
}

impl<T: ProviderHandle + ?Sized> ProviderHandle for &T {
    fn typed_data_signer(&self) -> Option<&dyn TypedDataSigner> {
        (**self).typed_data_signer()
    }

    fn callback_dispatch(&self) -> Option<&dyn CallbackDispatch> {
        (**self).callback_dispatch()
    }

    fn promise_dispatch(&self) -> Option<&dyn PromiseDispatch> {
        (**self).promise_dispatch()
    }
}

impl<T: ProviderHandle + ?Sized> ProviderHandle for Arc<T> {
    fn typed_data_signer(&self) -> Option<&dyn TypedDataSigner> {
        (**self).typed_data_signer()
    }

    fn callback_dispatch(&self) -> Option<&dyn CallbackDispatch> {
        (**self).callback_dispatch()
    }

    fn promise_dispatch(&self) -> Option<&dyn PromiseDispatch> {
        (**self).promise_dispatch()
    }
}

/// Sends requests over the transport chosen for one provider handle.
pub struct Dispatcher<'a> {
    transport: Box<dyn RpcTransport + 'a>,
}

impl<'a> Dispatcher<'a> {
    /// Classifies `handle` and binds the highest-priority transport it supports.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError::NoTransport`] if the handle supports none.
    pub fn probe<P: ProviderHandle + ?Sized>(handle: &'a P) -> Result<Self, PermitError> {
        let dispatcher = if let Some(signer) = handle.typed_data_signer() {
            Self::new(SignerTransport::new(signer))
        } else if let Some(dispatch) = handle.callback_dispatch() {
            Self::new(CallbackTransport::new(dispatch))
        } else if let Some(dispatch) = handle.promise_dispatch() {
            Self::new(PromiseTransport::new(dispatch))
        } else {
            return Err(PermitError::NoTransport);
        };
        tracing::debug!(transport = %dispatcher.kind(), "Selected provider transport");
        Ok(dispatcher)
    }

    /// Wraps an explicit transport.
    #[must_use]
    pub fn new(transport: impl RpcTransport + 'a) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    /// The calling convention in use.
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Sends one request.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError`] on transport failure or an error envelope.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value, PermitError> {
        tracing::debug!(transport = %self.kind(), method, "Dispatching request");
        self.transport.send(method, params).await
    }

    /// Performs a raw `eth_call` against `to` at the latest block.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError`] if the request fails.
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Value, PermitError> {
        self.send("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    /// Requests a typed-data signature from `from`.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError`] if signing fails or the result is malformed.
    pub async fn sign_typed_data(
        &self,
        from: Address,
        typed_data: &PermitTypedData,
        method: SignTypedDataMethod,
    ) -> Result<SignatureRsv, PermitError> {
        tracing::debug!(transport = %self.kind(), %from, %method, "Requesting typed data signature");
        self.transport.sign_typed_data(from, typed_data, method).await
    }
}

impl fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transport", &self.kind())
            .finish()
    }
}
