//! Chain ID resolution with an explicit override.

use serde_json::json;

use crate::encoding::parse_quantity;
use crate::error::PermitError;
use crate::rpc::Dispatcher;

/// Resolves the chain id a permit domain is bound to.
///
/// With an override set, the override is returned for every call and no
/// request is made. Without one, the chain id is queried with `eth_chainId`.
/// The resolver is owned by its caller, so concurrent clients do not share
/// overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainIdResolver {
    chain_id_override: Option<u64>,
}

impl ChainIdResolver {
    /// Creates a resolver that always queries the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chain_id_override: None,
        }
    }

    /// Creates a resolver from an optional override.
    #[must_use]
    pub const fn with_override(chain_id_override: Option<u64>) -> Self {
        Self { chain_id_override }
    }

    /// Sets the override. The latest value wins; there is no way back to querying.
    pub const fn set_chain_id_override(&mut self, chain_id: u64) {
        self.chain_id_override = Some(chain_id);
    }

    /// Returns the current override, if any.
    #[must_use]
    pub const fn chain_id_override(&self) -> Option<u64> {
        self.chain_id_override
    }

    /// Resolves the active chain id.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError`] if the `eth_chainId` request fails or its
    /// result is not a quantity that fits in a `u64`.
    pub async fn get_chain_id(&self, dispatcher: &Dispatcher<'_>) -> Result<u64, PermitError> {
        if let Some(chain_id) = self.chain_id_override {
            return Ok(chain_id);
        }
        let raw = dispatcher.send("eth_chainId", json!([])).await?;
        let chain_id = parse_quantity(&raw).map_err(|e| PermitError::invalid_response("chain id", e))?;
        u64::try_from(chain_id).map_err(|e| PermitError::invalid_response("chain id", e))
    }
}
