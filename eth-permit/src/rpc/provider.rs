use std::fmt;

use alloy_provider::Provider;
use async_trait::async_trait;
use serde_json::Value;

use super::{JsonRpcRequest, JsonRpcResponse, PromiseDispatch, ProviderHandle};
use crate::error::{JsonRpcError, METHOD_NOT_FOUND, ProviderError};

/// Promise-style backend over an alloy [`Provider`].
///
/// Envelope requests are forwarded with [`Provider::raw_request`]. The
/// provider assigns its own wire id, so the envelope id is only echoed back
/// in the response. Error responses from the node become error envelopes,
/// or [`ProviderError::Rpc`] on the positional path; transport failures
/// become [`ProviderError::Transport`].
pub struct AlloyDispatch<P> {
    provider: P,
}

impl<P: Provider> AlloyDispatch<P> {
    /// Wraps a connected provider.
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns the wrapped provider.
    pub const fn inner(&self) -> &P {
        &self.provider
    }

    async fn raw(&self, method: &str, params: Value) -> Result<Value, Outcome> {
        self.provider
            .raw_request::<Value, Value>(method.to_owned().into(), params)
            .await
            .map_err(|err| match err.as_error_resp() {
                Some(payload) => Outcome::Rpc(JsonRpcError {
                    code: payload.code,
                    message: payload.message.to_string(),
                    data: payload
                        .data
                        .as_ref()
                        .and_then(|raw| serde_json::from_str(raw.get()).ok()),
                }),
                None => Outcome::Transport(ProviderError::transport(err)),
            })
    }
}

enum Outcome {
    Rpc(JsonRpcError),
    Transport(ProviderError),
}

#[async_trait]
impl<P: Provider> PromiseDispatch for AlloyDispatch<P> {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError> {
        match self.raw(&request.method, request.params).await {
            Ok(result) => Ok(JsonRpcResponse::success(request.id, result)),
            Err(Outcome::Rpc(error)) => Ok(JsonRpcResponse::failure(request.id, error)),
            Err(Outcome::Transport(err)) => Err(err),
        }
    }

    async fn send_positional(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match self.raw(method, params).await {
            Ok(result) => Ok(result),
            Err(Outcome::Rpc(error)) if error.code == METHOD_NOT_FOUND => {
                Err(ProviderError::MethodUnsupported(method.to_owned()))
            }
            Err(Outcome::Rpc(error)) => Err(ProviderError::Rpc(error)),
            Err(Outcome::Transport(err)) => Err(err),
        }
    }
}

impl<P: Provider> ProviderHandle for AlloyDispatch<P> {
    fn promise_dispatch(&self) -> Option<&dyn PromiseDispatch> {
        Some(self)
    }
}

impl<P> fmt::Debug for AlloyDispatch<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlloyDispatch").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PermitError;
    use crate::permit::PermitClient;
    use crate::rpc::{Dispatcher, SignTypedDataMethod, TransportKind};
    use crate::testing::{TOKEN, abi_string, test_signer, wallet_signature};
    use alloy_primitives::{Signature, U256, address};
    use alloy_provider::ProviderBuilder;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    /// Answers like a node whose wallet only knows the legacy signing method.
    fn legacy_node(req: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&req.body).unwrap();
        let id = body["id"].clone();
        let reply = |field: &str, value: Value| {
            ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": id, field: value }))
        };
        match body["method"].as_str().unwrap() {
            "eth_chainId" => reply("result", json!("0x1")),
            "eth_call" => {
                let data = body["params"][0]["data"].as_str().unwrap();
                if data.starts_with("0x06fdde03") {
                    reply("result", json!(abi_string("TestDai")))
                } else {
                    reply("result", json!(format!("0x{:064x}", 7)))
                }
            }
            "eth_signTypedData" => reply("result", wallet_signature(&body["params"])),
            _ => reply(
                "error",
                json!({ "code": -32601, "message": "the method does not exist/is not available" }),
            ),
        }
    }

    async fn node() -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(legacy_node)
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_envelope_echoes_request_id() {
        let mock_server = node().await;
        let dispatch =
            AlloyDispatch::new(ProviderBuilder::new().connect_http(mock_server.uri().parse().unwrap()));

        let request = JsonRpcRequest::new("eth_chainId", json!([]));
        let id = request.id;
        let response = dispatch.send(request).await.unwrap();
        assert_eq!(response.id, Some(json!(id)));
        assert_eq!(response.into_result().unwrap(), json!("0x1"));
    }

    #[tokio::test]
    async fn test_node_error_becomes_envelope() {
        let mock_server = node().await;
        let dispatch =
            AlloyDispatch::new(ProviderBuilder::new().connect_http(mock_server.uri().parse().unwrap()));
        let dispatcher = Dispatcher::probe(&dispatch).unwrap();
        assert_eq!(dispatcher.kind(), TransportKind::Promise);

        let err = dispatcher.send("eth_unknown", json!([])).await.unwrap_err();
        assert!(matches!(err, PermitError::Rpc(e) if e.code == METHOD_NOT_FOUND));

        let err = dispatch.send_positional("eth_unknown", json!([])).await.unwrap_err();
        assert!(matches!(err, ProviderError::MethodUnsupported(m) if m == "eth_unknown"));
    }

    #[tokio::test]
    async fn test_positional_node_error_keeps_code() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(|req: &Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": body["id"],
                    "error": { "code": -32000, "message": "header not found" },
                }))
            })
            .mount(&mock_server)
            .await;
        let dispatch =
            AlloyDispatch::new(ProviderBuilder::new().connect_http(mock_server.uri().parse().unwrap()));

        let err = dispatch.send_positional("eth_call", json!([])).await.unwrap_err();
        assert!(matches!(&err, ProviderError::Rpc(e) if e.code == -32000 && e.message == "header not found"));

        let err = PermitError::from(err);
        assert!(matches!(err, PermitError::Rpc(e) if e.code == -32000));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        let mock_server = MockServer::start().await;
        let uri = mock_server.uri();
        drop(mock_server);
        let dispatch = AlloyDispatch::new(ProviderBuilder::new().connect_http(uri.parse().unwrap()));

        let err = dispatch
            .send(JsonRpcRequest::new("eth_chainId", json!([])))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[tokio::test]
    async fn test_signs_dai_permit_over_http() {
        let mock_server = node().await;
        let dispatch =
            AlloyDispatch::new(ProviderBuilder::new().connect_http(mock_server.uri().parse().unwrap()));
        let holder = test_signer().address();
        let spender = address!("0x0000000000000000000000000000000000000002");

        let client = PermitClient::new(&dispatch).unwrap();
        let signed = client
            .sign_dai_permit(TOKEN.into(), holder, spender, None, None)
            .await
            .unwrap();
        assert_eq!(signed.message.nonce, U256::from(7));
        assert_eq!(signed.message.expiry, U256::MAX);

        let domain = client.resolve_domain(TOKEN.into()).await.unwrap();
        assert_eq!(domain.name, "TestDai");
        assert_eq!(domain.chain_id, 1);

        let typed = crate::typed_data::build_dai_typed_data(signed.message.clone(), domain);
        let signature = Signature::from_raw(&signed.signature.to_bytes()).unwrap();
        assert_eq!(
            signature.recover_address_from_prehash(&typed.signing_hash()).unwrap(),
            holder
        );
        assert_eq!(client.sign_method(), SignTypedDataMethod::V4);

        let methods = mock_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap()["method"].clone())
            .collect::<Vec<_>>();
        assert!(methods.contains(&json!("eth_signTypedData_v4")));
        assert!(methods.contains(&json!("eth_signTypedData")));
    }
}
