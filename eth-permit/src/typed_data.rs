//! EIP-712 typed data for the two permit layouts.
//!
//! The field order of each schema below is part of the on-chain contract:
//! it determines the struct hash the token's `permit` function recomputes.
//! A reordered schema still produces a signature, but one the token rejects.
//!
//! - [`build_dai_typed_data`] - Dai-style `Permit(holder, spender, nonce, expiry, allowed)`
//! - [`build_erc2612_typed_data`] - ERC-2612 `Permit(owner, spender, value, nonce, deadline)`

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain};
use serde::{Deserialize, Serialize};

/// Domain version every permit token is assumed to use.
pub const PERMIT_VERSION: &str = "1";

/// Primary type of every permit typed-data object.
pub const PRIMARY_TYPE: &str = "Permit";

/// The "never expires" sentinel for expiry, deadline and unlimited value.
pub const MAX_UINT256: U256 = U256::MAX;

/// One `{name, type}` entry of an EIP-712 struct schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypedField {
    /// Member name.
    pub name: &'static str,
    /// Solidity type of the member.
    #[serde(rename = "type")]
    pub ty: &'static str,
}

const fn field(name: &'static str, ty: &'static str) -> TypedField {
    TypedField { name, ty }
}

/// Schema of the `EIP712Domain` struct shared by both permit layouts.
pub const EIP712_DOMAIN_FIELDS: &[TypedField] = &[
    field("name", "string"),
    field("version", "string"),
    field("chainId", "uint256"),
    field("verifyingContract", "address"),
];

/// Schema of the Dai-style `Permit` struct.
pub const DAI_PERMIT_FIELDS: &[TypedField] = &[
    field("holder", "address"),
    field("spender", "address"),
    field("nonce", "uint256"),
    field("expiry", "uint256"),
    field("allowed", "bool"),
];

/// Schema of the ERC-2612 `Permit` struct.
pub const ERC2612_PERMIT_FIELDS: &[TypedField] = &[
    field("owner", "address"),
    field("spender", "address"),
    field("value", "uint256"),
    field("nonce", "uint256"),
    field("deadline", "uint256"),
];

mod dai {
    alloy_sol_types::sol! {
        struct Permit {
            address holder;
            address spender;
            uint256 nonce;
            uint256 expiry;
            bool allowed;
        }
    }
}

mod erc2612 {
    alloy_sol_types::sol! {
        struct Permit {
            address owner;
            address spender;
            uint256 value;
            uint256 nonce;
            uint256 deadline;
        }
    }
}

/// EIP-712 domain binding a permit to one token on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitDomain {
    /// The token's display name, as returned by `name()`.
    pub name: String,
    /// Domain version, normally [`PERMIT_VERSION`].
    pub version: String,
    /// Chain the permit is valid on.
    pub chain_id: u64,
    /// The token contract.
    pub verifying_contract: Address,
}

impl PermitDomain {
    /// Creates a domain with the default [`PERMIT_VERSION`].
    #[must_use]
    pub fn new(name: impl Into<String>, chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: name.into(),
            version: PERMIT_VERSION.to_owned(),
            chain_id,
            verifying_contract,
        }
    }

    /// Converts into alloy's domain type for hashing.
    #[must_use]
    pub fn eip712_domain(&self) -> Eip712Domain {
        eip712_domain! {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.verifying_contract,
        }
    }
}

/// Dai-style permit message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaiPermitMessage {
    /// Token holder granting the allowance.
    pub holder: Address,
    /// Address allowed to spend.
    pub spender: Address,
    /// Holder's current permit nonce.
    pub nonce: U256,
    /// Expiry timestamp, or [`MAX_UINT256`] for never.
    pub expiry: U256,
    /// Always `true`; `false` would revoke instead of grant.
    pub allowed: bool,
}

/// ERC-2612 permit message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Erc2612PermitMessage {
    /// Token owner granting the allowance.
    pub owner: Address,
    /// Address allowed to spend.
    pub spender: Address,
    /// Allowance amount, or [`MAX_UINT256`] for unlimited.
    pub value: U256,
    /// Owner's current permit nonce.
    pub nonce: U256,
    /// Deadline timestamp, or [`MAX_UINT256`] for never.
    pub deadline: U256,
}

/// Either permit message layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PermitMessage {
    /// Dai-style layout.
    Dai(DaiPermitMessage),
    /// ERC-2612 layout.
    Erc2612(Erc2612PermitMessage),
}

/// The `types` member of a permit typed-data object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermitTypes {
    /// `EIP712Domain` schema.
    #[serde(rename = "EIP712Domain")]
    pub eip712_domain: &'static [TypedField],
    /// `Permit` schema.
    #[serde(rename = "Permit")]
    pub permit: &'static [TypedField],
}

/// A complete EIP-712 typed-data object, serialized in the layout wallets expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitTypedData {
    /// Struct schemas.
    pub types: PermitTypes,
    /// Always [`PRIMARY_TYPE`].
    pub primary_type: &'static str,
    /// Signing domain.
    pub domain: PermitDomain,
    /// Message to sign.
    pub message: PermitMessage,
}

/// Builds the typed data for a Dai-style permit.
#[must_use]
pub fn build_dai_typed_data(message: DaiPermitMessage, domain: PermitDomain) -> PermitTypedData {
    PermitTypedData {
        types: PermitTypes {
            eip712_domain: EIP712_DOMAIN_FIELDS,
            permit: DAI_PERMIT_FIELDS,
        },
        primary_type: PRIMARY_TYPE,
        domain,
        message: PermitMessage::Dai(message),
    }
}

/// Builds the typed data for an ERC-2612 permit.
#[must_use]
pub fn build_erc2612_typed_data(
    message: Erc2612PermitMessage,
    domain: PermitDomain,
) -> PermitTypedData {
    PermitTypedData {
        types: PermitTypes {
            eip712_domain: EIP712_DOMAIN_FIELDS,
            permit: ERC2612_PERMIT_FIELDS,
        },
        primary_type: PRIMARY_TYPE,
        domain,
        message: PermitMessage::Erc2612(message),
    }
}

impl PermitTypedData {
    /// Renders the primary type's EIP-712 type string, e.g.
    /// `Permit(address owner,address spender,...)`.
    #[must_use]
    pub fn encode_type(&self) -> String {
        let members = self
            .types
            .permit
            .iter()
            .map(|f| format!("{} {}", f.ty, f.name))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({members})", self.primary_type)
    }

    /// Computes the EIP-712 signing digest of the message under its layout's schema.
    #[must_use]
    pub fn signing_hash(&self) -> B256 {
        let domain = self.domain.eip712_domain();
        match &self.message {
            PermitMessage::Dai(m) => dai::Permit {
                holder: m.holder,
                spender: m.spender,
                nonce: m.nonce,
                expiry: m.expiry,
                allowed: m.allowed,
            }
            .eip712_signing_hash(&domain),
            PermitMessage::Erc2612(m) => erc2612::Permit {
                owner: m.owner,
                spender: m.spender,
                value: m.value,
                nonce: m.nonce,
                deadline: m.deadline,
            }
            .eip712_signing_hash(&domain),
        }
    }

    /// Serializes to the JSON string form taken by `eth_signTypedData_v3`/`_v4`.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
