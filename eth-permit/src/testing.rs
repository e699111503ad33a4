//! In-memory wallet backends for unit tests.

use std::sync::Mutex;

use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes, U256, address, hex};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{JsonRpcError, METHOD_NOT_FOUND, ProviderError};
use crate::rpc::{
    CallbackDispatch, JsonRpcRequest, JsonRpcResponse, PromiseDispatch, ProviderHandle,
    RpcCallback, TypedDataSigner,
};
use crate::typed_data::{
    DaiPermitMessage, PermitDomain, PermitTypedData, build_dai_typed_data,
};

/// First well-known development key.
const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub(crate) const TOKEN: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");

pub(crate) fn test_signer() -> PrivateKeySigner {
    TEST_KEY.parse().unwrap()
}

pub(crate) fn typed_data_fixture() -> PermitTypedData {
    build_dai_typed_data(
        DaiPermitMessage {
            holder: test_signer().address(),
            spender: address!("0x0000000000000000000000000000000000000002"),
            nonce: U256::ZERO,
            expiry: U256::MAX,
            allowed: true,
        },
        PermitDomain::new("Dai Stablecoin", 1, TOKEN),
    )
}

/// Signs the typed data carried in `params[1]` the way a wallet would.
///
/// The payload may be a JSON string (v3/v4) or an object (legacy).
pub(crate) fn wallet_signature(params: &Value) -> Value {
    let typed: TypedData = match &params[1] {
        Value::String(s) => serde_json::from_str(s).unwrap(),
        other => serde_json::from_value(other.clone()).unwrap(),
    };
    let hash = typed.eip712_signing_hash().unwrap();
    let signature = test_signer().sign_hash_sync(&hash).unwrap();
    json!(hex::encode_prefixed(signature.as_bytes()))
}

/// ABI-encodes a `string` return value.
pub(crate) fn abi_string(s: &str) -> String {
    let mut data = hex::encode(s.as_bytes());
    while data.len() % 64 != 0 {
        data.push('0');
    }
    format!("0x{:064x}{:064x}{data}", 32, s.len())
}

/// A wallet answering name, nonce, chain id and signing requests.
pub(crate) fn wallet(
    name: &'static str,
    nonce: u64,
    chain_id: u64,
) -> impl Fn(&str, &Value) -> Result<Value, MockError> + Send + Sync + 'static {
    move |method, params| match method {
        "eth_chainId" => Ok(json!(format!("0x{chain_id:x}"))),
        "eth_call" => {
            let data = params[0]["data"].as_str().unwrap_or_default();
            if data.starts_with("0x06fdde03") {
                Ok(json!(abi_string(name)))
            } else {
                Ok(json!(format!("0x{nonce:064x}")))
            }
        }
        m if m.starts_with("eth_signTypedData") => Ok(wallet_signature(params)),
        other => Err(JsonRpcError::new(METHOD_NOT_FOUND, format!("unexpected {other}")).into()),
    }
}

/// Failure a mock handler can produce.
#[derive(Debug)]
pub(crate) enum MockError {
    /// Delivered inside a response envelope where the convention has one.
    Rpc(JsonRpcError),
    /// Delivered as a backend failure.
    Provider(ProviderError),
}

impl From<JsonRpcError> for MockError {
    fn from(err: JsonRpcError) -> Self {
        Self::Rpc(err)
    }
}

impl From<ProviderError> for MockError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl MockError {
    /// Collapses into the error a positional backend would throw.
    fn into_provider(self, method: &str) -> ProviderError {
        match self {
            Self::Provider(err) => err,
            Self::Rpc(err) if err.code == METHOD_NOT_FOUND => {
                ProviderError::MethodUnsupported(method.to_owned())
            }
            Self::Rpc(err) => ProviderError::Rpc(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallStyle {
    /// `{id, method, params}` envelope.
    Envelope,
    /// Positional `(method, params)` retry.
    Positional,
    /// Signer's own call mechanism.
    Native,
    /// Native typed-data signing.
    Signed,
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub method: String,
    pub params: Value,
    pub style: CallStyle,
}

type Handler = Box<dyn Fn(&str, &Value) -> Result<Value, MockError> + Send + Sync>;

/// A scriptable wallet backend that records every request it sees.
pub(crate) struct MockRpc {
    handler: Handler,
    calls: Mutex<Vec<Call>>,
    key: PrivateKeySigner,
    signer: bool,
    callback: bool,
    promise: bool,
    rejects_object_payloads: bool,
}

impl MockRpc {
    fn with_handler(
        handler: impl Fn(&str, &Value) -> Result<Value, MockError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            key: test_signer(),
            signer: false,
            callback: false,
            promise: false,
            rejects_object_payloads: false,
        }
    }

    pub(crate) fn callback(
        handler: impl Fn(&str, &Value) -> Result<Value, MockError> + Send + Sync + 'static,
    ) -> Self {
        Self::with_handler(handler).with_callback()
    }

    pub(crate) fn promise(
        handler: impl Fn(&str, &Value) -> Result<Value, MockError> + Send + Sync + 'static,
    ) -> Self {
        Self::with_handler(handler).with_promise()
    }

    /// A signer backed by [`test_signer`]; `handler` answers its reads.
    pub(crate) fn signer(
        handler: impl Fn(&str, &Value) -> Result<Value, MockError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            signer: true,
            ..Self::with_handler(handler)
        }
    }

    pub(crate) fn with_callback(mut self) -> Self {
        self.callback = true;
        self
    }

    pub(crate) fn with_promise(mut self) -> Self {
        self.promise = true;
        self
    }

    /// Envelopes fail with [`ProviderError::ObjectPayloadUnsupported`].
    pub(crate) fn rejecting_object_payloads(mut self) -> Self {
        self.rejects_object_payloads = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    fn record(&self, method: &str, params: &Value, style: CallStyle) {
        self.calls.lock().unwrap().push(Call {
            method: method.to_owned(),
            params: params.clone(),
            style,
        });
    }

    fn envelope(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError> {
        self.record(&request.method, &request.params, CallStyle::Envelope);
        match (self.handler)(&request.method, &request.params) {
            Ok(result) => Ok(JsonRpcResponse::success(request.id, result)),
            Err(MockError::Rpc(err)) => Ok(JsonRpcResponse::failure(request.id, err)),
            Err(MockError::Provider(err)) => Err(err),
        }
    }

    fn positional(&self, method: &str, params: &Value, style: CallStyle) -> Result<Value, ProviderError> {
        self.record(method, params, style);
        (self.handler)(method, params).map_err(|e| e.into_provider(method))
    }
}

impl CallbackDispatch for MockRpc {
    fn send_async(&self, request: JsonRpcRequest, callback: RpcCallback) {
        callback(self.envelope(&request));
    }
}

#[async_trait]
impl PromiseDispatch for MockRpc {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError> {
        if self.rejects_object_payloads {
            self.record(&request.method, &request.params, CallStyle::Envelope);
            return Err(ProviderError::ObjectPayloadUnsupported);
        }
        self.envelope(&request)
    }

    async fn send_positional(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.positional(method, &params, CallStyle::Positional)
    }
}

#[async_trait]
impl TypedDataSigner for MockRpc {
    async fn address(&self) -> Result<Address, ProviderError> {
        Ok(self.key.address())
    }

    async fn sign_typed_data(&self, typed_data: &PermitTypedData) -> Result<Bytes, ProviderError> {
        self.record("signTypedData", &json!(typed_data), CallStyle::Signed);
        let signature = self
            .key
            .sign_hash_sync(&typed_data.signing_hash())
            .map_err(ProviderError::transport)?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.positional(method, &params, CallStyle::Native)
    }
}

impl ProviderHandle for MockRpc {
    fn typed_data_signer(&self) -> Option<&dyn TypedDataSigner> {
        self.signer.then_some(self as &dyn TypedDataSigner)
    }

    fn callback_dispatch(&self) -> Option<&dyn CallbackDispatch> {
        self.callback.then_some(self as &dyn CallbackDispatch)
    }

    fn promise_dispatch(&self) -> Option<&dyn PromiseDispatch> {
        self.promise.then_some(self as &dyn PromiseDispatch)
    }
}
