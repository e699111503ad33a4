//! Hex and ABI helpers for raw `eth_call` results.

use std::str::FromStr;

use alloy_primitives::{U256, hex};
use serde_json::Value;

/// Size of one ABI word in bytes.
const WORD: usize = 32;

/// Errors from decoding raw hex payloads.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload is not valid hex.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// The unpadded bytes are not valid UTF-8.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    /// The value is neither a quantity string nor a JSON number.
    #[error("expected a hex or decimal quantity, got {0}")]
    Quantity(String),
}

/// Decodes zero-padded hex into UTF-8 text.
///
/// The optional `0x` prefix is dropped and `00` bytes are stripped from both
/// ends before decoding.
///
/// # Errors
///
/// Returns [`DecodeError`] if the input is not hex or the remaining bytes are not UTF-8.
pub fn hex_to_utf8(input: &str) -> Result<String, DecodeError> {
    let bytes = hex::decode(input)?;
    Ok(String::from_utf8(trim_zero_padding(&bytes).to_vec())?)
}

/// Decodes the return data of a `string`-returning view function such as `name()`.
///
/// When the data starts with the `0x20` offset word, the ABI head (offset
/// word and length word) is skipped and the remaining data, possibly empty,
/// is decoded with the same padding rule as [`hex_to_utf8`]. Anything else
/// is treated as a bare `bytes32` name.
///
/// # Errors
///
/// Returns [`DecodeError`] if the input is not hex or the text is not UTF-8.
pub fn decode_abi_string(input: &str) -> Result<String, DecodeError> {
    let bytes = hex::decode(input)?;
    let data = if has_string_head(&bytes) {
        &bytes[2 * WORD..]
    } else {
        &bytes[..]
    };
    Ok(String::from_utf8(trim_zero_padding(data).to_vec())?)
}

/// Parses a numeric RPC result.
///
/// Accepts `0x`-prefixed hex strings (as returned by `eth_call` and
/// `eth_chainId`), decimal strings, and plain JSON numbers.
///
/// # Errors
///
/// Returns [`DecodeError::Quantity`] for anything else, including the empty `0x`.
pub fn parse_quantity(value: &Value) -> Result<U256, DecodeError> {
    match value {
        Value::String(s) if s != "0x" && !s.is_empty() => {
            U256::from_str(s).map_err(|_| DecodeError::Quantity(s.clone()))
        }
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| DecodeError::Quantity(n.to_string())),
        other => Err(DecodeError::Quantity(other.to_string())),
    }
}

fn has_string_head(bytes: &[u8]) -> bool {
    bytes.len() >= 2 * WORD && U256::from_be_slice(&bytes[..WORD]) == U256::from(WORD)
}

fn trim_zero_padding(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| *b != 0).map_or(start, |i| i + 1);
    &bytes[start..end]
}
