//! Base62 encoding between durable identifiers and short codes.
//!
//! The alphabet is digits, then lowercase, then uppercase letters. A symbol's
//! position in [`ALPHABET`] is its radix value, so codes sort the same way as
//! the identifiers they encode only within a given length.

use thiserror::Error;

/// Ordered base62 alphabet; index = radix value.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Radix of the encoding.
pub const BASE: u64 = 62;

/// Longest code `encode` can produce (`u64::MAX` needs 11 symbols).
pub const MAX_CODE_LEN: usize = 11;

/// Errors raised when a string is not a code produced by [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("short code is empty")]
    Empty,
    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("short code {0:?} exceeds the identifier range")]
    Overflow(String),
    #[error("short code {0:?} has a leading zero symbol")]
    LeadingZero(String),
}

/// Maps a symbol to its radix value.
fn symbol_value(symbol: char) -> Option<u64> {
    match symbol {
        '0'..='9' => Some(symbol as u64 - '0' as u64),
        'a'..='z' => Some(symbol as u64 - 'a' as u64 + 10),
        'A'..='Z' => Some(symbol as u64 - 'A' as u64 + 36),
        _ => None,
    }
}

/// Encodes an identifier as a base62 short code, most significant symbol first.
///
/// `0` encodes to `"0"`, never to an empty string.
///
/// # Examples
///
/// ```
/// use base62_shortener::utils::code_codec::encode;
///
/// assert_eq!(encode(0), "0");
/// assert_eq!(encode(61), "Z");
/// assert_eq!(encode(62), "10");
/// ```
pub fn encode(identifier: u64) -> String {
    if identifier == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut buffer = [0u8; MAX_CODE_LEN];
    let mut start = MAX_CODE_LEN;
    let mut remaining = identifier;

    while remaining > 0 {
        start -= 1;
        buffer[start] = ALPHABET[(remaining % BASE) as usize];
        remaining /= BASE;
    }

    // Every byte written comes from ALPHABET, which is ASCII.
    buffer[start..].iter().map(|&b| b as char).collect()
}

/// Decodes a short code back to its identifier.
///
/// Only canonical codes are accepted, so every identifier has exactly one
/// code: `"0"` itself is valid, but `"01"` is not another spelling of `"1"`.
///
/// # Errors
///
/// - [`CodecError::Empty`] for an empty string
/// - [`CodecError::InvalidCharacter`] when a character is outside [`ALPHABET`]
/// - [`CodecError::LeadingZero`] when a multi-symbol code starts with `0`
/// - [`CodecError::Overflow`] when the value does not fit in `u64`
pub fn decode(code: &str) -> Result<u64, CodecError> {
    if code.is_empty() {
        return Err(CodecError::Empty);
    }

    let mut value: u64 = 0;

    for (position, character) in code.chars().enumerate() {
        let digit =
            symbol_value(character).ok_or(CodecError::InvalidCharacter { character, position })?;

        value = value
            .checked_mul(BASE)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| CodecError::Overflow(code.to_string()))?;
    }

    if code.len() > 1 && code.starts_with(ALPHABET[0] as char) {
        return Err(CodecError::LeadingZero(code.to_string()));
    }

    Ok(value)
}

/// Returns true if `code` decodes to an identifier.
pub fn is_valid_code(code: &str) -> bool {
    decode(code).is_ok()
}
