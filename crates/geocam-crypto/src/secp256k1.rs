//! secp256k1 ECDSA verification against a pre-hashed digest.
//!
//! The caller has already computed the canonical SHA-512 digest (see
//! [`crate::canonical_hash_hex`]); this module never hashes anything itself.

use elliptic_curve::group::prime::PrimeCurveAffine;
use elliptic_curve::sec1::FromEncodedPoint;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use k256::{AffinePoint, EncodedPoint};

/// Outcome of a failed [`verify_compact`] call. A successful verification is
/// `Ok(())`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Secp256k1VerifyError {
    /// The signature does not satisfy the ECDSA verification equation for
    /// the given public key and digest.
    #[error("signature does not verify against the given public key and digest")]
    InvalidSignature,
    /// The signature bytes are not a well-formed 64-byte `r ‖ s` pair, or
    /// `r` or `s` is zero.
    #[error("malformed signature")]
    MalformedSignature,
    /// The public key bytes are not a well-formed 33-byte compressed point,
    /// or they decompress to the point at infinity.
    #[error("malformed public key")]
    MalformedPublicKey,
    /// The public key's x-coordinate does not correspond to a point on the
    /// curve.
    #[error("public key point is not on the curve")]
    PointNotOnCurve,
}

/// Verify a compact (`r ‖ s`) secp256k1 ECDSA signature against a
/// 33-byte compressed public key and a pre-computed digest.
///
/// `digest_bytes` is treated as already-hashed data: per SEC1 4.1.4, only
/// its leftmost 32 bytes (256 bits, matching secp256k1's group order size)
/// are used as the verification scalar. No hash function is applied here.
///
/// High-`s` signatures are accepted (no canonical-low-`s` enforcement);
/// `r == 0` or `s == 0` is rejected as [`Secp256k1VerifyError::MalformedSignature`].
///
/// # Errors
/// Returns the appropriate [`Secp256k1VerifyError`] variant on any
/// malformed input or verification failure.
pub fn verify_compact(
    signature_bytes: &[u8],
    public_key_bytes: &[u8],
    digest_bytes: &[u8],
) -> Result<(), Secp256k1VerifyError> {
    let signature = parse_signature(signature_bytes)?;
    let verifying_key = parse_public_key(public_key_bytes)?;

    verifying_key
        .verify_prehash(digest_bytes, &signature)
        .map_err(|_| Secp256k1VerifyError::InvalidSignature)
}

fn parse_signature(bytes: &[u8]) -> Result<Signature, Secp256k1VerifyError> {
    if bytes.len() != 64 {
        return Err(Secp256k1VerifyError::MalformedSignature);
    }
    let (r, s) = bytes.split_at(32);
    if r.iter().all(|&b| b == 0) || s.iter().all(|&b| b == 0) {
        return Err(Secp256k1VerifyError::MalformedSignature);
    }
    Signature::from_slice(bytes).map_err(|_| Secp256k1VerifyError::MalformedSignature)
}

fn parse_public_key(bytes: &[u8]) -> Result<VerifyingKey, Secp256k1VerifyError> {
    if bytes.len() != 33 || (bytes[0] != 0x02 && bytes[0] != 0x03) {
        return Err(Secp256k1VerifyError::MalformedPublicKey);
    }
    let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| Secp256k1VerifyError::MalformedPublicKey)?;

    let affine = AffinePoint::from_encoded_point(&encoded);
    if affine.is_none().into() {
        return Err(Secp256k1VerifyError::PointNotOnCurve);
    }
    let affine = affine.expect("checked Some above");
    if bool::from(affine.is_identity()) {
        return Err(Secp256k1VerifyError::MalformedPublicKey);
    }

    VerifyingKey::from_affine(affine).map_err(|_| Secp256k1VerifyError::MalformedPublicKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::SigningKey;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32].into()).expect("valid scalar")
    }

    fn sign(digest: &[u8]) -> (Signature, VerifyingKey) {
        let sk = signing_key();
        let sig: Signature = sk.sign_prehash(digest).expect("sign");
        (sig, *sk.verifying_key())
    }

    #[test]
    fn valid_signature_verifies() {
        let digest = [42u8; 64];
        let (sig, vk) = sign(&digest);
        let pk_bytes = vk.to_encoded_point(true).as_bytes().to_vec();
        assert!(verify_compact(&sig.to_bytes(), &pk_bytes, &digest).is_ok());
    }

    #[test]
    fn tampered_digest_is_invalid() {
        let digest = [42u8; 64];
        let (sig, vk) = sign(&digest);
        let pk_bytes = vk.to_encoded_point(true).as_bytes().to_vec();
        let mut other = digest;
        other[0] ^= 0xFF;
        assert_eq!(
            verify_compact(&sig.to_bytes(), &pk_bytes, &other),
            Err(Secp256k1VerifyError::InvalidSignature)
        );
    }

    #[test]
    fn wrong_length_signature_is_malformed() {
        let digest = [1u8; 64];
        let (_, vk) = sign(&digest);
        let pk_bytes = vk.to_encoded_point(true).as_bytes().to_vec();
        assert_eq!(
            verify_compact(&[0u8; 63], &pk_bytes, &digest),
            Err(Secp256k1VerifyError::MalformedSignature)
        );
    }

    #[test]
    fn zero_r_is_malformed() {
        let digest = [1u8; 64];
        let (sig, vk) = sign(&digest);
        let pk_bytes = vk.to_encoded_point(true).as_bytes().to_vec();
        let mut bytes = sig.to_bytes().to_vec();
        bytes[..32].fill(0);
        assert_eq!(
            verify_compact(&bytes, &pk_bytes, &digest),
            Err(Secp256k1VerifyError::MalformedSignature)
        );
    }

    #[test]
    fn zero_s_is_malformed() {
        let digest = [1u8; 64];
        let (sig, vk) = sign(&digest);
        let pk_bytes = vk.to_encoded_point(true).as_bytes().to_vec();
        let mut bytes = sig.to_bytes().to_vec();
        bytes[32..].fill(0);
        assert_eq!(
            verify_compact(&bytes, &pk_bytes, &digest),
            Err(Secp256k1VerifyError::MalformedSignature)
        );
    }

    #[test]
    fn wrong_length_public_key_is_malformed() {
        let digest = [1u8; 64];
        let (sig, _) = sign(&digest);
        assert_eq!(
            verify_compact(&sig.to_bytes(), &[0u8; 32], &digest),
            Err(Secp256k1VerifyError::MalformedPublicKey)
        );
    }

    #[test]
    fn bad_prefix_public_key_is_malformed() {
        let digest = [1u8; 64];
        let (sig, vk) = sign(&digest);
        let mut pk_bytes = vk.to_encoded_point(true).as_bytes().to_vec();
        pk_bytes[0] = 0x04;
        assert_eq!(
            verify_compact(&sig.to_bytes(), &pk_bytes, &digest),
            Err(Secp256k1VerifyError::MalformedPublicKey)
        );
    }

    #[test]
    fn invalid_x_coordinate_is_not_on_curve() {
        let digest = [1u8; 64];
        let (sig, _) = sign(&digest);
        // All-zero x with 0x02 prefix: 0 is not a valid x-coordinate for
        // the secp256k1 curve equation y^2 = x^3 + 7.
        let mut pk_bytes = vec![0x02u8];
        pk_bytes.extend_from_slice(&[0u8; 32]);
        assert_eq!(
            verify_compact(&sig.to_bytes(), &pk_bytes, &digest),
            Err(Secp256k1VerifyError::PointNotOnCurve)
        );
    }

    #[test]
    fn high_s_signature_is_accepted() {
        let digest = [9u8; 64];
        let (sig, vk) = sign(&digest);
        let pk_bytes = vk.to_encoded_point(true).as_bytes().to_vec();

        let low_s_sig = sig.normalize_s().unwrap_or(sig);
        let (r, s) = (low_s_sig.r(), low_s_sig.s());
        let flipped_s = -*s.as_ref();
        let high_s_scalar =
            k256::NonZeroScalar::new(flipped_s).expect("negated nonzero scalar is nonzero");
        let high_s_sig =
            Signature::from_scalars(*r.as_ref(), *high_s_scalar.as_ref()).expect("valid scalars");

        // The reconstructed signature must actually be in high-s form for
        // this test to exercise anything.
        assert_ne!(high_s_sig.s(), low_s_sig.s());
        assert!(verify_compact(&high_s_sig.to_bytes(), &pk_bytes, &digest).is_ok());
    }
}
