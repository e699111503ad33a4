//! Error types for permit signing.
//!
//! Backends report failures as [`ProviderError`], JSON-RPC error envelopes
//! surface as [`JsonRpcError`], and every public operation returns
//! [`PermitError`]. The two scripted fallbacks (older signing method,
//! positional dispatch) are decided on typed error kinds, not on message text.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::signature::SignatureFormatError;

/// JSON-RPC error code for a method the endpoint does not know.
pub const METHOD_NOT_FOUND: i64 = -32601;

const LEGACY_METHOD_UNSUPPORTED_PREFIX: &str = "Method ";
const LEGACY_METHOD_UNSUPPORTED_SUFFIX: &str = " not supported.";
const LEGACY_OBJECT_PAYLOAD_UNSUPPORTED: &str =
    "Hardhat Network doesn't support JSON-RPC params sent as an object";

/// Failure reported by a wallet or provider backend.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The backend does not implement the requested RPC method.
    #[error("method {0} not supported")]
    MethodUnsupported(String),
    /// The backend rejects JSON-RPC envelopes and only accepts positional arguments.
    #[error("JSON-RPC params sent as an object are not supported")]
    ObjectPayloadUnsupported,
    /// The backend dropped the request without ever answering it.
    #[error("provider dropped the request without responding")]
    Dropped,
    /// The backend answered a positional call with a JSON-RPC error payload.
    #[error(transparent)]
    Rpc(JsonRpcError),
    /// Any other failure of the underlying transport.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Wraps an arbitrary transport failure.
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(err.into())
    }

    /// Classifies a bare error message from a backend that cannot surface typed errors.
    ///
    /// Only the two wordings wallets are known to emit map to typed kinds;
    /// everything else becomes [`ProviderError::Transport`] carrying the message.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message == LEGACY_OBJECT_PAYLOAD_UNSUPPORTED {
            return Self::ObjectPayloadUnsupported;
        }
        if let Some(method) = message
            .strip_prefix(LEGACY_METHOD_UNSUPPORTED_PREFIX)
            .and_then(|rest| rest.strip_suffix(LEGACY_METHOD_UNSUPPORTED_SUFFIX))
        {
            return Self::MethodUnsupported(method.to_owned());
        }
        Self::transport(message)
    }
}

/// Error envelope embedded in a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional provider-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Creates an error envelope without extra data.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Error returned by every permit operation.
#[derive(Debug, thiserror::Error)]
pub enum PermitError {
    /// The backend failed; propagated unmodified.
    #[error(transparent)]
    Provider(ProviderError),
    /// The response carried a JSON-RPC error envelope.
    #[error(transparent)]
    Rpc(#[from] JsonRpcError),
    /// A signer backend resolved to a different address than the one asked to sign.
    #[error("signer address {actual} does not match requested signing address {expected}")]
    SignerMismatch {
        /// Address the permit must be signed by.
        expected: Address,
        /// Address the signer backend reported.
        actual: Address,
    },
    /// The provider handle exposes none of the supported calling conventions.
    #[error("provider handle exposes no supported transport")]
    NoTransport,
    /// The signing result is not a 65-byte signature.
    #[error(transparent)]
    Signature(#[from] SignatureFormatError),
    /// A read returned something that cannot be interpreted.
    #[error("invalid {context} in provider response: {reason}")]
    InvalidResponse {
        /// Which value was being read.
        context: &'static str,
        /// Why it could not be decoded.
        reason: String,
    },
    /// Typed data could not be serialized for the signing request.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<ProviderError> for PermitError {
    /// A JSON-RPC error payload becomes [`PermitError::Rpc`] whichever
    /// convention carried it.
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rpc(error) => Self::rpc(error),
            other => Self::Provider(other),
        }
    }
}

impl PermitError {
    /// Logs a JSON-RPC error payload and wraps it as [`PermitError::Rpc`].
    pub(crate) fn rpc(error: JsonRpcError) -> Self {
        tracing::error!(code = error.code, rpc_message = %error.message, data = ?error.data, "Provider returned an error");
        Self::Rpc(error)
    }

    /// Builds an [`PermitError::InvalidResponse`].
    pub fn invalid_response(context: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidResponse {
            context,
            reason: reason.to_string(),
        }
    }

    /// Returns `true` when the backend reported `method` as unsupported.
    ///
    /// Covers both a typed [`ProviderError::MethodUnsupported`] for that
    /// method and a JSON-RPC envelope with code [`METHOD_NOT_FOUND`].
    #[must_use]
    pub fn is_method_unsupported(&self, method: &str) -> bool {
        match self {
            Self::Provider(ProviderError::MethodUnsupported(unsupported)) => unsupported == method,
            Self::Rpc(err) => err.code == METHOD_NOT_FOUND,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_message_method_unsupported() {
        let err = ProviderError::from_message("Method eth_signTypedData_v4 not supported.");
        assert!(matches!(err, ProviderError::MethodUnsupported(m) if m == "eth_signTypedData_v4"));
    }

    #[test]
    fn test_from_message_object_payload() {
        let err = ProviderError::from_message(
            "Hardhat Network doesn't support JSON-RPC params sent as an object",
        );
        assert!(matches!(err, ProviderError::ObjectPayloadUnsupported));
    }

    #[test]
    fn test_from_message_other_wording_is_transport() {
        let err = ProviderError::from_message("Method eth_signTypedData_v4 is not supported");
        assert!(matches!(err, ProviderError::Transport(_)));
        assert_eq!(err.to_string(), "Method eth_signTypedData_v4 is not supported");
    }

    #[test]
    fn test_is_method_unsupported_matches_method_name() {
        let err = PermitError::from(ProviderError::MethodUnsupported(
            "eth_signTypedData_v4".into(),
        ));
        assert!(err.is_method_unsupported("eth_signTypedData_v4"));
        assert!(!err.is_method_unsupported("eth_signTypedData_v3"));
    }

    #[test]
    fn test_is_method_unsupported_rpc_code() {
        let err = PermitError::from(JsonRpcError::new(METHOD_NOT_FOUND, "method not found"));
        assert!(err.is_method_unsupported("eth_signTypedData_v4"));

        let err = PermitError::from(JsonRpcError::new(-32000, "execution reverted"));
        assert!(!err.is_method_unsupported("eth_signTypedData_v4"));
    }

    #[test]
    fn test_positional_rpc_payload_surfaces_as_rpc() {
        let err = PermitError::from(ProviderError::Rpc(JsonRpcError::new(-32000, "header not found")));
        assert!(matches!(&err, PermitError::Rpc(e) if e.code == -32000));
        assert_eq!(err.to_string(), "JSON-RPC error -32000: header not found");

        let err = PermitError::from(ProviderError::Dropped);
        assert!(matches!(err, PermitError::Provider(ProviderError::Dropped)));
    }

    #[test]
    fn test_json_rpc_error_deserialize() {
        let err: JsonRpcError =
            serde_json::from_str(r#"{"code":-32000,"message":"boom","data":"0x"}"#).unwrap();
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "boom");
        assert_eq!(err.data, Some(Value::String("0x".into())));
    }
}
