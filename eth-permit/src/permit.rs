//! Permit signing pipeline.
//!
//! [`PermitClient`] binds one provider handle to a transport and runs the
//! two permit flows against it:
//!
//! 1. Resolve the domain. A [`PermitDomain`] is used as-is; a bare token
//!    address triggers concurrent `name()` and chain id reads.
//! 2. Read `nonces(holder)` unless the caller supplied a nonce.
//! 3. Default expiry, deadline and ERC-2612 value to [`MAX_UINT256`].
//! 4. Build the typed data, request a signature, split it into `r`, `s`, `v`.
//!
//! Errors other than the two transport fallbacks propagate unchanged.

use alloy_primitives::{Address, Bytes, U256};
use futures_util::future::try_join;
use serde::{Deserialize, Serialize};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::ChainIdResolver;
use crate::config::PermitConfig;
use crate::encoding::{decode_abi_string, parse_quantity};
use crate::error::PermitError;
use crate::rpc::{Dispatcher, ProviderHandle, SignTypedDataMethod, TransportKind};
use crate::signature::SignatureRsv;
use crate::typed_data::{
    DaiPermitMessage, Erc2612PermitMessage, MAX_UINT256, PermitDomain, PermitTypedData,
    build_dai_typed_data, build_erc2612_typed_data,
};

/// Selector of `name()`.
pub const NAME_SELECTOR: [u8; 4] = [0x06, 0xfd, 0xde, 0x03];

/// Selector of `nonces(address)`.
pub const NONCES_SELECTOR: [u8; 4] = [0x7e, 0xce, 0xbe, 0x00];

/// Awaits a future, optionally instrumenting it with a tracing span.
macro_rules! traced {
    ($fut:expr, $span:expr) => {{
        #[cfg(feature = "telemetry")]
        {
            use tracing::Instrument;
            $fut.instrument($span)
        }
        #[cfg(not(feature = "telemetry"))]
        {
            $fut
        }
    }};
}

/// The token a permit is for: a contract to resolve, or a finished domain.
///
/// In JSON, an object carrying `verifyingContract` is a domain and a bare
/// address string is a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenOrDomain {
    /// Pre-resolved domain; no reads are made for it.
    Domain(PermitDomain),
    /// Token contract; name and chain id are read before signing.
    Token(Address),
}

impl TokenOrDomain {
    /// The token contract the permit is verified by.
    #[must_use]
    pub const fn verifying_contract(&self) -> Address {
        match self {
            Self::Token(token) => *token,
            Self::Domain(domain) => domain.verifying_contract,
        }
    }
}

impl From<Address> for TokenOrDomain {
    fn from(token: Address) -> Self {
        Self::Token(token)
    }
}

impl From<PermitDomain> for TokenOrDomain {
    fn from(domain: PermitDomain) -> Self {
        Self::Domain(domain)
    }
}

/// A permit message merged with its signature.
///
/// Serializes flat: the message fields followed by `r`, `s` and `v`.
/// The `U256` fields (`nonce`, `expiry`, `value`, `deadline`) are written as
/// `0x`-prefixed hex quantity strings, so a zero nonce is `"0x0"`, never the
/// JSON number `0`. `v` is a plain number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPermit<M> {
    /// The signed message.
    #[serde(flatten)]
    pub message: M,
    /// Signature over the message's typed data.
    #[serde(flatten)]
    pub signature: SignatureRsv,
}

/// A signed Dai-style permit.
pub type SignedDaiPermit = SignedPermit<DaiPermitMessage>;

/// A signed ERC-2612 permit.
pub type SignedErc2612Permit = SignedPermit<Erc2612PermitMessage>;

/// Signs permits through one provider handle.
#[derive(Debug)]
pub struct PermitClient<'a> {
    dispatcher: Dispatcher<'a>,
    chain_id: ChainIdResolver,
    sign_method: SignTypedDataMethod,
}

impl<'a> PermitClient<'a> {
    /// Probes `provider` and binds a client with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError::NoTransport`] if the handle supports no transport.
    pub fn new<P: ProviderHandle + ?Sized>(provider: &'a P) -> Result<Self, PermitError> {
        Self::with_config(provider, &PermitConfig::default())
    }

    /// Probes `provider` and binds a client with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError::NoTransport`] if the handle supports no transport.
    pub fn with_config<P: ProviderHandle + ?Sized>(
        provider: &'a P,
        config: &PermitConfig,
    ) -> Result<Self, PermitError> {
        Ok(Self::from_dispatcher(Dispatcher::probe(provider)?, config))
    }

    /// Builds a client over an already selected transport.
    #[must_use]
    pub const fn from_dispatcher(dispatcher: Dispatcher<'a>, config: &PermitConfig) -> Self {
        Self {
            dispatcher,
            chain_id: ChainIdResolver::with_override(config.chain_id_override),
            sign_method: config.sign_method,
        }
    }

    /// Pins the chain id for every later domain resolution.
    pub const fn set_chain_id_override(&mut self, chain_id: u64) {
        self.chain_id.set_chain_id_override(chain_id);
    }

    /// The calling convention selected for the provider.
    #[must_use]
    pub fn transport_kind(&self) -> TransportKind {
        self.dispatcher.kind()
    }

    /// The signing method requested first.
    #[must_use]
    pub const fn sign_method(&self) -> SignTypedDataMethod {
        self.sign_method
    }

    /// The underlying dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher<'a> {
        &self.dispatcher
    }

    /// Resolves the chain id, honoring the override.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError`] if the `eth_chainId` read fails.
    pub async fn chain_id(&self) -> Result<u64, PermitError> {
        self.chain_id.get_chain_id(&self.dispatcher).await
    }

    /// Reads the token's display name with `name()`.
    ///
    /// Both ABI `string` and bare `bytes32` return data are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError`] if the call fails or the result is not text.
    pub async fn token_name(&self, token: Address) -> Result<String, PermitError> {
        let raw = self
            .dispatcher
            .call(token, Bytes::from_static(&NAME_SELECTOR))
            .await?;
        let hex = raw
            .as_str()
            .ok_or_else(|| PermitError::invalid_response("token name", &raw))?;
        decode_abi_string(hex).map_err(|e| PermitError::invalid_response("token name", e))
    }

    /// Reads `nonces(holder)` from the token.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError`] if the call fails or the result is not a number.
    pub async fn nonce(&self, token: Address, holder: Address) -> Result<U256, PermitError> {
        let raw = self.dispatcher.call(token, nonces_calldata(holder)).await?;
        parse_quantity(&raw).map_err(|e| PermitError::invalid_response("nonce", e))
    }

    /// Returns the domain for `token`, reading name and chain id concurrently if needed.
    ///
    /// Either read failing fails the whole resolution.
    ///
    /// # Errors
    ///
    /// Returns the first [`PermitError`] of the two reads.
    pub async fn resolve_domain(&self, token: TokenOrDomain) -> Result<PermitDomain, PermitError> {
        match token {
            TokenOrDomain::Domain(domain) => Ok(domain),
            TokenOrDomain::Token(token) => {
                let (name, chain_id) = try_join(
                    traced!(self.token_name(token), tracing::info_span!("token_name", %token)),
                    traced!(self.chain_id(), tracing::info_span!("chain_id")),
                )
                .await?;
                Ok(PermitDomain::new(name, chain_id, token))
            }
        }
    }

    async fn resolve_nonce(
        &self,
        domain: &PermitDomain,
        holder: Address,
        nonce: Option<U256>,
    ) -> Result<U256, PermitError> {
        match nonce {
            Some(nonce) => Ok(nonce),
            None => self.nonce(domain.verifying_contract, holder).await,
        }
    }

    async fn sign(
        &self,
        from: Address,
        typed_data: &PermitTypedData,
    ) -> Result<SignatureRsv, PermitError> {
        self.dispatcher
            .sign_typed_data(from, typed_data, self.sign_method)
            .await
    }

    /// Signs a Dai-style permit granting `spender` an unlimited allowance over `holder`'s tokens.
    ///
    /// `expiry` defaults to [`MAX_UINT256`]; `nonce` is read from the token when omitted.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError`] if any read or the signing request fails.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(%holder, %spender)))]
    pub async fn sign_dai_permit(
        &self,
        token: TokenOrDomain,
        holder: Address,
        spender: Address,
        expiry: Option<U256>,
        nonce: Option<U256>,
    ) -> Result<SignedDaiPermit, PermitError> {
        let domain = self.resolve_domain(token).await?;
        let nonce = self.resolve_nonce(&domain, holder, nonce).await?;
        let message = DaiPermitMessage {
            holder,
            spender,
            nonce,
            expiry: expiry.unwrap_or(MAX_UINT256),
            allowed: true,
        };
        let typed_data = build_dai_typed_data(message.clone(), domain);
        let signature = self.sign(holder, &typed_data).await?;
        Ok(SignedPermit { message, signature })
    }

    /// Signs an ERC-2612 permit letting `spender` move `value` of `owner`'s tokens.
    ///
    /// `value` and `deadline` default to [`MAX_UINT256`]; `nonce` is read from
    /// the token when omitted.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError`] if any read or the signing request fails.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(%owner, %spender)))]
    pub async fn sign_erc2612_permit(
        &self,
        token: TokenOrDomain,
        owner: Address,
        spender: Address,
        value: Option<U256>,
        deadline: Option<U256>,
        nonce: Option<U256>,
    ) -> Result<SignedErc2612Permit, PermitError> {
        let domain = self.resolve_domain(token).await?;
        let nonce = self.resolve_nonce(&domain, owner, nonce).await?;
        let message = Erc2612PermitMessage {
            owner,
            spender,
            value: value.unwrap_or(MAX_UINT256),
            nonce,
            deadline: deadline.unwrap_or(MAX_UINT256),
        };
        let typed_data = build_erc2612_typed_data(message.clone(), domain);
        let signature = self.sign(owner, &typed_data).await?;
        Ok(SignedPermit { message, signature })
    }
}

/// Signs a Dai-style permit through `provider` with the default configuration.
///
/// See [`PermitClient::sign_dai_permit`].
///
/// # Errors
///
/// Returns [`PermitError`] if the provider has no transport or any step fails.
pub async fn sign_dai_permit<P: ProviderHandle + ?Sized>(
    provider: &P,
    token: impl Into<TokenOrDomain>,
    holder: Address,
    spender: Address,
    expiry: Option<U256>,
    nonce: Option<U256>,
) -> Result<SignedDaiPermit, PermitError> {
    PermitClient::new(provider)?
        .sign_dai_permit(token.into(), holder, spender, expiry, nonce)
        .await
}

/// Signs an ERC-2612 permit through `provider` with the default configuration.
///
/// See [`PermitClient::sign_erc2612_permit`].
///
/// # Errors
///
/// Returns [`PermitError`] if the provider has no transport or any step fails.
pub async fn sign_erc2612_permit<P: ProviderHandle + ?Sized>(
    provider: &P,
    token: impl Into<TokenOrDomain>,
    owner: Address,
    spender: Address,
    value: Option<U256>,
    deadline: Option<U256>,
    nonce: Option<U256>,
) -> Result<SignedErc2612Permit, PermitError> {
    PermitClient::new(provider)?
        .sign_erc2612_permit(token.into(), owner, spender, value, deadline, nonce)
        .await
}

fn nonces_calldata(holder: Address) -> Bytes {
    let mut data = Vec::with_capacity(NONCES_SELECTOR.len() + 32);
    data.extend_from_slice(&NONCES_SELECTOR);
    data.extend_from_slice(holder.into_word().as_slice());
    data.into()
}
