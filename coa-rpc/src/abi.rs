//! Minimal ABI encoding for the one read call this pipeline makes.
//!
//! `tokenURI(uint256)` takes a single word argument and returns a single
//! dynamic string; nothing here generalizes beyond that.

use coa_core::constants::TOKEN_URI_SELECTOR;
use coa_core::error::{CoaError, Result};

/// Encodes the calldata for `tokenURI(uint256 tokenId)`.
pub fn encode_token_uri_call(token_id: u64) -> String {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&token_id.to_be_bytes());
    format!("0x{}{}", hex::encode(TOKEN_URI_SELECTOR), hex::encode(word))
}

/// Decodes an ABI-encoded string return value.
///
/// Layout: one word holding the offset of the string head, then at that
/// offset a length word followed by the UTF-8 bytes padded to a word
/// boundary.
pub fn decode_abi_string(hex_data: &str) -> Result<String> {
    let data = hex_data.strip_prefix("0x").unwrap_or(hex_data);
    if data.is_empty() || data == "0" {
        return Err(CoaError::Rpc("empty eth_call result".into()));
    }

    let bytes = hex::decode(data).map_err(|e| CoaError::Rpc(format!("invalid hex result: {e}")))?;
    if bytes.len() < 64 {
        return Err(CoaError::Rpc("eth_call result too short".into()));
    }

    let offset = read_word(&bytes, 0)?;
    let length = read_word(&bytes, offset)?;

    let start = offset
        .checked_add(32)
        .ok_or_else(|| CoaError::Rpc("string offset overflow".into()))?;
    let end = start
        .checked_add(length)
        .ok_or_else(|| CoaError::Rpc("string length overflow".into()))?;
    if bytes.len() < end {
        return Err(CoaError::Rpc("declared string runs past result".into()));
    }

    String::from_utf8(bytes[start..end].to_vec())
        .map_err(|e| CoaError::Rpc(format!("tokenURI is not UTF-8: {e}")))
}

/// Reads a 32-byte big-endian word as usize; words that exceed u64 are
/// malformed for this call shape.
fn read_word(bytes: &[u8], at: usize) -> Result<usize> {
    let end = at
        .checked_add(32)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| CoaError::Rpc("word out of bounds".into()))?;
    let word = &bytes[at..end];
    if word[..24].iter().any(|&b| b != 0) {
        return Err(CoaError::Rpc("oversized word in result".into()));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(tail) as usize)
}

/// Decodes a quantity result like `eth_blockNumber`'s `"0x10d4f"`.
pub fn decode_quantity(result: &serde_json::Value) -> Result<u64> {
    let text = result
        .as_str()
        .ok_or_else(|| CoaError::Rpc("quantity result is not a string".into()))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(digits, 16).map_err(|e| CoaError::Rpc(format!("invalid quantity: {e}")))
}
