#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EIP-712 token permit signing across wallet backends.
//!
//! This crate builds and signs off-chain token permits, so a holder can grant
//! a spending allowance without sending a transaction. It supports the
//! ERC-2612 layout and the Dai-style layout with an `allowed` flag, and works
//! with wallets that sign natively, take a callback, or return a future.
//!
//! # Features
//!
//! - **Two Permit Layouts**: ERC-2612 `Permit(owner, spender, value, nonce, deadline)`
//!   and Dai `Permit(holder, spender, nonce, expiry, allowed)`
//! - **Transport Probe**: One of three calling conventions is selected once per
//!   provider handle
//! - **Default Resolution**: Domain, nonce and expiry are read or defaulted when
//!   not supplied
//! - **Typed Fallbacks**: Older signing method and positional dispatch retries are
//!   keyed on error kinds, not error text
//!
//! # Architecture
//!
//! - [`permit`] - Public signing pipeline and [`PermitClient`]
//! - [`rpc`] - JSON-RPC envelopes, transports and the capability probe
//! - [`typed_data`] - EIP-712 schemas and typed-data builders
//! - [`chain`] - Chain id resolution with an explicit override
//! - [`signature`] - Splitting signatures into `r`, `s`, `v`
//! - [`encoding`] - Hex and ABI helpers for raw reads
//! - [`config`] - Client configuration
//! - [`error`] - Error types
//!
//! # Feature Flags
//!
//! - `provider` - Promise transport over an alloy `Provider`
//! - `signer-local` - Signer transport over a local private key
//! - `telemetry` - Tracing spans on public operations
//!
//! # Example
//!
//! ```ignore
//! use eth_permit::{LocalSigner, sign_erc2612_permit};
//!
//! let wallet = LocalSigner::new(key).with_reads(AlloyDispatch::new(provider));
//! let permit = sign_erc2612_permit(&wallet, token, owner, spender, None, None, None).await?;
//! ```

pub mod chain;
pub mod config;
pub mod encoding;
pub mod error;
pub mod permit;
pub mod rpc;
pub mod signature;
pub mod typed_data;

#[cfg(test)]
mod testing;

pub use chain::ChainIdResolver;
pub use config::PermitConfig;
pub use error::{JsonRpcError, PermitError, ProviderError};
pub use permit::{
    PermitClient, SignedDaiPermit, SignedErc2612Permit, SignedPermit, TokenOrDomain,
    sign_dai_permit, sign_erc2612_permit,
};
pub use rpc::{Dispatcher, ProviderHandle, SignTypedDataMethod, TransportKind};
pub use signature::SignatureRsv;
pub use typed_data::{
    DaiPermitMessage, Erc2612PermitMessage, MAX_UINT256, PermitDomain, PermitTypedData,
};

#[cfg(feature = "provider")]
pub use rpc::AlloyDispatch;
#[cfg(feature = "signer-local")]
pub use rpc::{LocalSigner, SignerLike};
