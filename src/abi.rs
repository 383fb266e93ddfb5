//! Minimal Solidity ABI encoding for the values the compiler stores out of band.
//!
//! Only single-value `abi.encode` layouts are needed: a static word for
//! `uint256`/`address`, and the head/tail layout for `string`/`bytes`.

use ruint::aliases::U256;
use sha3::{Digest, Keccak256};
use thiserror::Error;

const WORD: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("encoded value is {actual} bytes, expected at least {expected}")]
    Truncated { expected: usize, actual: usize },

    #[error("dynamic value offset {offset} does not point inside the encoding")]
    BadOffset { offset: U256 },

    #[error("dynamic value length {length} overruns the encoding")]
    BadLength { length: U256 },

    #[error("address word has non-zero high bytes")]
    DirtyAddress,

    #[error("string value is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid hex literal '{text}'")]
    InvalidHex { text: String },
}

/// Keccak-256 of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Keccak256::digest(data));
    hash
}

/// The inline operand standing in for an out-of-band literal.
#[must_use]
pub fn literal_surrogate(encoded: &[u8]) -> U256 {
    U256::from_be_bytes(keccak256(encoded))
}

#[must_use]
pub fn encode_uint(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

#[must_use]
pub fn encode_address(address: &[u8; 20]) -> Vec<u8> {
    let mut word = vec![0u8; WORD];
    word[12..].copy_from_slice(address);
    word
}

#[must_use]
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let padded = data.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(2 * WORD + padded);
    out.extend_from_slice(&encode_uint(U256::from(WORD as u64)));
    out.extend_from_slice(&encode_uint(U256::from(data.len() as u64)));
    out.extend_from_slice(data);
    out.resize(2 * WORD + padded, 0);
    out
}

#[must_use]
pub fn encode_string(text: &str) -> Vec<u8> {
    encode_bytes(text.as_bytes())
}

/// # Errors
///
/// Returns [`AbiError::Truncated`] if `encoded` is shorter than one word.
pub fn decode_uint(encoded: &[u8]) -> Result<U256, AbiError> {
    let word = first_word(encoded)?;
    Ok(U256::from_be_bytes(word))
}

/// # Errors
///
/// Fails on short input or when the upper twelve bytes are not zero.
pub fn decode_address(encoded: &[u8]) -> Result<[u8; 20], AbiError> {
    let word = first_word(encoded)?;
    if word[..12].iter().any(|&b| b != 0) {
        return Err(AbiError::DirtyAddress);
    }
    let mut address = [0u8; 20];
    address.copy_from_slice(&word[12..]);
    Ok(address)
}

/// # Errors
///
/// Fails when the head offset or the length word point outside `encoded`.
pub fn decode_bytes(encoded: &[u8]) -> Result<Vec<u8>, AbiError> {
    let offset_word = decode_uint(encoded)?;
    let offset = word_to_usize(offset_word)
        .filter(|&o| o.checked_add(WORD).is_some_and(|end| end <= encoded.len()))
        .ok_or(AbiError::BadOffset {
            offset: offset_word,
        })?;
    let length_word = decode_uint(&encoded[offset..])?;
    let start = offset + WORD;
    let length = word_to_usize(length_word)
        .filter(|&l| start.checked_add(l).is_some_and(|end| end <= encoded.len()))
        .ok_or(AbiError::BadLength {
            length: length_word,
        })?;
    Ok(encoded[start..start + length].to_vec())
}

/// # Errors
///
/// Fails like [`decode_bytes`], or with [`AbiError::InvalidUtf8`].
pub fn decode_string(encoded: &[u8]) -> Result<String, AbiError> {
    String::from_utf8(decode_bytes(encoded)?).map_err(|_| AbiError::InvalidUtf8)
}

/// Parse `0x` followed by exactly 40 hex digits.
#[must_use]
pub fn parse_address(text: &str) -> Option<[u8; 20]> {
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))?;
    if digits.len() != 40 {
        return None;
    }
    let mut address = [0u8; 20];
    hex::decode_to_slice(digits, &mut address).ok()?;
    Some(address)
}

#[must_use]
pub fn format_address(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}

/// Parse a `0x`-prefixed hex byte string.
///
/// # Errors
///
/// Returns [`AbiError::InvalidHex`] for a missing prefix, odd length or
/// non-hex digits.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, AbiError> {
    text.strip_prefix("0x")
        .and_then(|digits| hex::decode(digits).ok())
        .ok_or_else(|| AbiError::InvalidHex {
            text: text.to_owned(),
        })
}

fn first_word(encoded: &[u8]) -> Result<[u8; 32], AbiError> {
    encoded
        .get(..WORD)
        .and_then(|w| <[u8; 32]>::try_from(w).ok())
        .ok_or(AbiError::Truncated {
            expected: WORD,
            actual: encoded.len(),
        })
}

fn word_to_usize(word: U256) -> Option<usize> {
    if word.bit_len() > 64 {
        return None;
    }
    usize::try_from(word.as_limbs()[0]).ok()
}
