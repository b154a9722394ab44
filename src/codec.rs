//! Felt-style wire encoding.
//!
//! Every value crossing the contract boundary travels as a `0x`-prefixed
//! hex field element. These helpers convert between those and the typed
//! values the clients work with. A decode failure means the client and the
//! deployed contract disagree about a signature, so it is surfaced as an
//! invalid response rather than retried.

use crate::error::GatewayError;

/// Encode an unsigned integer as a hex felt.
pub fn encode_u64(value: u64) -> String {
    format!("{value:#x}")
}

/// Encode a signed timestamp. Ledger timestamps are never negative.
pub fn encode_i64(value: i64) -> String {
    format!("{:#x}", value.max(0))
}

pub fn encode_bool(value: bool) -> String {
    if value {
        "0x1".to_string()
    } else {
        "0x0".to_string()
    }
}

/// Encode a short string (at most 31 bytes) as a single felt.
pub fn encode_short_string(value: &str) -> String {
    let bytes = value.as_bytes();
    let take = bytes.len().min(31);
    format!("0x{}", hex::encode(&bytes[..take]))
}

pub fn decode_u64(felt: &str) -> Result<u64, GatewayError> {
    let body = felt
        .strip_prefix("0x")
        .ok_or_else(|| GatewayError::InvalidResponse(format!("not a felt: {felt}")))?;
    u64::from_str_radix(body, 16)
        .map_err(|e| GatewayError::InvalidResponse(format!("bad integer felt {felt}: {e}")))
}

pub fn decode_u32(felt: &str) -> Result<u32, GatewayError> {
    let wide = decode_u64(felt)?;
    u32::try_from(wide)
        .map_err(|_| GatewayError::InvalidResponse(format!("felt out of u32 range: {felt}")))
}

pub fn decode_i64(felt: &str) -> Result<i64, GatewayError> {
    let wide = decode_u64(felt)?;
    i64::try_from(wide)
        .map_err(|_| GatewayError::InvalidResponse(format!("felt out of i64 range: {felt}")))
}

pub fn decode_bool(felt: &str) -> Result<bool, GatewayError> {
    Ok(decode_u64(felt)? != 0)
}

pub fn decode_short_string(felt: &str) -> Result<String, GatewayError> {
    let body = felt
        .strip_prefix("0x")
        .ok_or_else(|| GatewayError::InvalidResponse(format!("not a felt: {felt}")))?;
    let bytes = hex::decode(body)
        .map_err(|e| GatewayError::InvalidResponse(format!("bad string felt {felt}: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| GatewayError::InvalidResponse(format!("non-utf8 string felt {felt}: {e}")))
}

/// Expect exactly one felt in a call result.
pub fn expect_single(values: &[String]) -> Result<&str, GatewayError> {
    match values {
        [one] => Ok(one),
        other => Err(GatewayError::InvalidResponse(format!(
            "expected 1 felt, got {}",
            other.len()
        ))),
    }
}
