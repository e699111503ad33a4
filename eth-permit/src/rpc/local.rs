use std::fmt;
use std::future::Future;
use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, Signature};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use serde_json::Value;

use super::{PromiseDispatch, ProviderHandle, TypedDataSigner};
use crate::error::ProviderError;
use crate::typed_data::PermitTypedData;

/// A key that can sign an EIP-712 digest, owned or shared behind an `Arc`.
///
/// Alloy's `Signer` is not implemented for `Arc<T>`, and `PrivateKeySigner`
/// is not `Clone`, so one key serving several [`LocalSigner`]s needs this.
pub trait SignerLike: Send + Sync {
    /// Address the key signs for.
    fn address(&self) -> Address;

    /// Signs a 32-byte digest.
    fn sign_hash(
        &self,
        hash: &B256,
    ) -> impl Future<Output = Result<Signature, alloy_signer::Error>> + Send;
}

impl SignerLike for PrivateKeySigner {
    fn address(&self) -> Address {
        Self::address(self)
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_hash(self, hash).await
    }
}

impl<T: SignerLike + Send + Sync> SignerLike for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_hash(hash).await
    }
}

/// A local key acting as a signer backend.
///
/// Typed data is hashed in-process and signed with the key; `v` comes out
/// as 27/28. Reads go to an optional connected provider, called with
/// positional parameters. Without one, every read reports
/// [`ProviderError::MethodUnsupported`].
pub struct LocalSigner<S> {
    signer: S,
    reads: Option<Box<dyn PromiseDispatch>>,
}

impl<S: SignerLike> LocalSigner<S> {
    /// Creates a signer backend with no read provider.
    pub const fn new(signer: S) -> Self {
        Self {
            signer,
            reads: None,
        }
    }

    /// Connects a provider for `eth_call` and `eth_chainId` reads.
    #[must_use]
    pub fn with_reads(mut self, reads: impl PromiseDispatch + 'static) -> Self {
        self.reads = Some(Box::new(reads));
        self
    }
}

#[async_trait]
impl<S: SignerLike> TypedDataSigner for LocalSigner<S> {
    async fn address(&self) -> Result<Address, ProviderError> {
        Ok(self.signer.address())
    }

    async fn sign_typed_data(&self, typed_data: &PermitTypedData) -> Result<Bytes, ProviderError> {
        let hash = typed_data.signing_hash();
        let signature = self
            .signer
            .sign_hash(&hash)
            .await
            .map_err(ProviderError::transport)?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match &self.reads {
            Some(reads) => reads.send_positional(method, params).await,
            None => Err(ProviderError::MethodUnsupported(method.to_owned())),
        }
    }
}

impl<S: SignerLike> ProviderHandle for LocalSigner<S> {
    fn typed_data_signer(&self) -> Option<&dyn TypedDataSigner> {
        Some(self)
    }
}

impl<S: SignerLike> fmt::Debug for LocalSigner<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.signer.address())
            .field("reads", &self.reads.is_some())
            .finish()
    }
}
