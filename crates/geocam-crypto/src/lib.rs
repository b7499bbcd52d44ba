//! Cryptographic primitives shared by the GeoCam server.
//!
//! Covers the parts of the pipeline that must agree bit-for-bit between the
//! signer and the verifier: standard (padded) Base64 for wire payloads,
//! SHA-256/SHA-512 derived identifiers, and secp256k1 ECDSA verification over
//! a pre-hashed digest.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

mod public_key_id;
mod secp256k1;

pub use public_key_id::PublicKeyId;
pub use secp256k1::{verify_compact, Secp256k1VerifyError};

/// Error type for Base64 decoding failures.
#[derive(Debug, thiserror::Error)]
#[error("invalid base64 encoding: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

/// Encode bytes as standard Base64 (RFC 4648, padded).
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a standard Base64 (RFC 4648, padded) string to bytes.
///
/// # Errors
/// Returns `DecodeError` if the input is not valid Base64.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(encoded).map_err(DecodeError::from)
}

/// Compute the SHA-256 fingerprint of a public key, as used for short
/// human-facing display (first 16 hex characters of `SHA-256(public_key_b64)`).
///
/// Not a security boundary — collisions here only affect display, not
/// verification (see [`PublicKeyId`] for the collision-resistant identifier).
#[must_use]
pub fn fingerprint(public_key_b64: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(public_key_b64.as_bytes());
    hex_encode(&hash)[..16].to_string()
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Compute the canonical signed hash over already-canonicalized PNG bytes:
/// `SHA-512(png_bytes)`, rendered as 128 lower-case hex characters.
#[must_use]
pub fn canonical_hash_hex(canonical_png_bytes: &[u8]) -> String {
    use sha2::{Digest, Sha512};
    let digest = Sha512::digest(canonical_png_bytes);
    hex_encode(&digest)
}

/// Decode a 128-character lower-case hex digest into its 64 raw bytes.
///
/// # Errors
/// Returns `HexError` if the string is not valid hex or not exactly 128
/// characters long.
pub fn decode_hex_digest(hex: &str) -> Result<[u8; 64], HexError> {
    if hex.len() != 128 {
        return Err(HexError::WrongLength(hex.len()));
    }
    let mut out = [0u8; 64];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk).map_err(|_| HexError::InvalidChar)?;
        out[i] = u8::from_str_radix(s, 16).map_err(|_| HexError::InvalidChar)?;
    }
    Ok(out)
}

/// Errors decoding a hex digest.
#[derive(Debug, thiserror::Error)]
pub enum HexError {
    #[error("expected 128 hex characters, got {0}")]
    WrongLength(usize),
    #[error("invalid hex character")]
    InvalidChar,
}
