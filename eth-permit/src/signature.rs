//! Splitting raw signing results into `r`, `s` and `v`.
//!
//! Every backend's result goes through [`SignatureRsv::from_bytes`]: the
//! first 32 bytes are `r`, the next 32 are `s`, and the final byte is `v`.
//! `v` is passed through as-is; some backends return 27/28, others 0/1.

use alloy_primitives::{B256, hex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Length of a raw `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Field under which some backends nest the signature hex.
const NESTED_RESULT_FIELD: &str = "result";

/// A permit signature split into its three components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRsv {
    /// First 32 bytes of the signature.
    pub r: B256,
    /// Second 32 bytes of the signature.
    pub s: B256,
    /// Recovery byte, unnormalized.
    pub v: u8,
}

/// Errors from decoding a raw signature.
#[derive(Debug, thiserror::Error)]
pub enum SignatureFormatError {
    /// The signature hex could not be decoded.
    #[error("invalid signature hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    /// The signature is not exactly 65 bytes.
    #[error("expected a 65-byte signature, got {0} bytes")]
    InvalidLength(usize),
    /// The signing result is neither a hex string nor an object wrapping one.
    #[error("unexpected signing result: {0}")]
    UnexpectedShape(String),
}

impl SignatureRsv {
    /// Splits a raw 65-byte signature.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureFormatError::InvalidLength`] for any other length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureFormatError> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(SignatureFormatError::InvalidLength(bytes.len()));
        }
        Ok(Self {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        })
    }

    /// Parses a `0x`-prefixed 65-byte signature hex string.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureFormatError`] if the string is not hex or not 65 bytes.
    pub fn from_hex(signature: &str) -> Result<Self, SignatureFormatError> {
        Self::from_bytes(&hex::decode(signature)?)
    }

    /// Joins the components back into `r || s || v`.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }
}

/// Decodes the result of a signing RPC call.
///
/// Accepts either the bare signature hex string or an object carrying it
/// under a nested `result` field.
///
/// # Errors
///
/// Returns [`SignatureFormatError`] if no 65-byte signature can be extracted.
pub fn decode_signature(raw: &Value) -> Result<SignatureRsv, SignatureFormatError> {
    match raw {
        Value::String(signature) => SignatureRsv::from_hex(signature),
        Value::Object(fields) => match fields.get(NESTED_RESULT_FIELD) {
            Some(nested) => decode_signature(nested),
            None => Err(SignatureFormatError::UnexpectedShape(raw.to_string())),
        },
        other => Err(SignatureFormatError::UnexpectedShape(other.to_string())),
    }
}
