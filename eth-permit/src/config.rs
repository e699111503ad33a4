//! Permit client configuration.
//!
//! Configuration is a plain value threaded into each
//! [`PermitClient`](crate::permit::PermitClient); nothing is stored
//! process-wide. It deserializes with serde, or loads from the environment.
//!
//! # Environment Variables
//!
//! - `ETH_PERMIT_CHAIN_ID` - Chain id to use instead of querying `eth_chainId`
//!   (decimal or `0x`-prefixed hex)
//! - `ETH_PERMIT_SIGN_METHOD` - One of `eth_signTypedData`,
//!   `eth_signTypedData_v3`, `eth_signTypedData_v4` (default)

use std::str::FromStr;

use alloy_primitives::U64;
use serde::{Deserialize, Serialize};

use crate::rpc::{SignTypedDataMethod, UnknownSignMethod};

/// Environment variable holding the chain id override.
pub const CHAIN_ID_ENV: &str = "ETH_PERMIT_CHAIN_ID";

/// Environment variable holding the signing method.
pub const SIGN_METHOD_ENV: &str = "ETH_PERMIT_SIGN_METHOD";

/// Settings for a [`PermitClient`](crate::permit::PermitClient).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitConfig {
    /// Chain id used for every domain instead of querying the provider.
    #[serde(default)]
    pub chain_id_override: Option<u64>,

    /// Signing RPC method (default: `eth_signTypedData_v4`).
    #[serde(default)]
    pub sign_method: SignTypedDataMethod,
}

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The chain id is not a decimal or hex integer that fits in `u64`.
    #[error("invalid ETH_PERMIT_CHAIN_ID value {0:?}")]
    InvalidChainId(String),
    /// The signing method name is not recognized.
    #[error(transparent)]
    UnknownSignMethod(#[from] UnknownSignMethod),
}

impl PermitConfig {
    /// Sets the chain id override.
    #[must_use]
    pub const fn with_chain_id_override(mut self, chain_id: u64) -> Self {
        self.chain_id_override = Some(chain_id);
        self
    }

    /// Sets the signing method.
    #[must_use]
    pub const fn with_sign_method(mut self, sign_method: SignTypedDataMethod) -> Self {
        self.sign_method = sign_method;
        self
    }

    /// Loads configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a present value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(CHAIN_ID_ENV) {
            let chain_id = parse_chain_id(raw.trim()).ok_or(ConfigError::InvalidChainId(raw))?;
            config.chain_id_override = Some(chain_id);
        }
        if let Some(raw) = lookup(SIGN_METHOD_ENV) {
            config.sign_method = SignTypedDataMethod::from_str(raw.trim())?;
        }
        Ok(config)
    }
}

fn parse_chain_id(raw: &str) -> Option<u64> {
    if raw.starts_with("0x") {
        U64::from_str(raw).ok().map(|id| id.to::<u64>())
    } else {
        raw.parse().ok()
    }
}
