use std::fmt;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use serde_json::Value;

use super::{RpcTransport, SignTypedDataMethod, TransportKind};
use crate::error::{PermitError, ProviderError};
use crate::signature::SignatureRsv;
use crate::typed_data::PermitTypedData;

/// A signer that produces typed-data signatures itself.
///
/// Reads are forwarded to the signer's own call mechanism with positional
/// parameters and return the bare result.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// Resolves the address this signer signs for.
    async fn address(&self) -> Result<Address, ProviderError>;

    /// Signs `typed_data`, returning the raw 65-byte signature.
    async fn sign_typed_data(&self, typed_data: &PermitTypedData) -> Result<Bytes, ProviderError>;

    /// Sends a read request through the signer's connected provider.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

/// Transport over a [`TypedDataSigner`].
pub struct SignerTransport<'a> {
    signer: &'a dyn TypedDataSigner,
}

impl<'a> SignerTransport<'a> {
    /// Wraps a signer.
    #[must_use]
    pub const fn new(signer: &'a dyn TypedDataSigner) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl RpcTransport for SignerTransport<'_> {
    fn kind(&self) -> TransportKind {
        TransportKind::Signer
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value, PermitError> {
        Ok(self.signer.request(method, params).await?)
    }

    /// Signs natively after checking the signer is the requested address.
    ///
    /// The signing `method` does not apply; no signing RPC is sent.
    async fn sign_typed_data(
        &self,
        from: Address,
        typed_data: &PermitTypedData,
        _method: SignTypedDataMethod,
    ) -> Result<SignatureRsv, PermitError> {
        let actual = self.signer.address().await?;
        if actual != from {
            return Err(PermitError::SignerMismatch {
                expected: from,
                actual,
            });
        }
        let raw = self.signer.sign_typed_data(typed_data).await?;
        Ok(SignatureRsv::from_bytes(&raw)?)
    }
}

impl fmt::Debug for SignerTransport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerTransport").finish_non_exhaustive()
    }
}
