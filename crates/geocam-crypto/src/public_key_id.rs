//! Public key identifier — a validated, type-safe wrapper for device public
//! key identifiers.
//!
//! A `PublicKeyId` is `"gc_" + base32(SHA-256(public_key_b64))[0..24]`,
//! always exactly 27 characters (the `gc_` prefix plus 24 upper-case base32
//! characters).

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use sha2::{Digest, Sha256};

/// A validated public key identifier.
///
/// Construct via [`PublicKeyId::derive`] (from the device's Base64-encoded
/// public key) or [`PublicKeyId::from_str`] (from a string, e.g. a database
/// column).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyId(String);

/// Error returned when a string is not a valid `PublicKeyId`.
#[derive(Debug, thiserror::Error)]
#[error("invalid public key id: {reason}")]
pub struct PublicKeyIdError {
    reason: &'static str,
}

const PREFIX: &str = "gc_";
const SUFFIX_LEN: usize = 24;

impl PublicKeyId {
    /// Derive a `PublicKeyId` from a device's Base64-encoded public key.
    ///
    /// Computed as `"gc_" + base32(SHA-256(public_key_b64))[0..24]`.
    #[must_use]
    pub fn derive(public_key_b64: &str) -> Self {
        let hash = Sha256::digest(public_key_b64.as_bytes());
        let encoded = BASE32_NOPAD.encode(&hash);
        let truncated = &encoded[..SUFFIX_LEN.min(encoded.len())];
        Self(format!("{PREFIX}{truncated}"))
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), PublicKeyIdError> {
        let Some(suffix) = s.strip_prefix(PREFIX) else {
            return Err(PublicKeyIdError {
                reason: "must start with 'gc_'",
            });
        };
        if suffix.len() != SUFFIX_LEN {
            return Err(PublicKeyIdError {
                reason: "suffix must be exactly 24 characters",
            });
        }
        if !suffix
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(PublicKeyIdError {
                reason: "suffix contains invalid characters (expected base32)",
            });
        }
        Ok(())
    }
}

impl FromStr for PublicKeyId {
    type Err = PublicKeyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for PublicKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PublicKeyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for PublicKeyId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for PublicKeyId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
