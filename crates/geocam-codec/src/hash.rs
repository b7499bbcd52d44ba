//! Canonical-hash builder: the single function both the signer and the
//! verifier call to agree on what gets signed.

use crate::encode::encode_canonical;
use crate::raster::{CodecError, RasterImage};
use crate::stego::clear_last_row;

/// Compute the canonical SHA-512 hash of `image` for signing or verification.
///
/// The last row's alpha channel is cleared first (the signature frame must
/// never influence what it signs), then the raster is canonically
/// re-encoded and hashed. `image` is not mutated; the clearing happens on a
/// clone.
///
/// # Errors
/// Returns [`CodecError`] if the raster's dimensions can't be canonically
/// encoded.
pub fn canonical_hash_hex(image: &RasterImage) -> Result<String, CodecError> {
    let mut scratch = image.clone();
    clear_last_row(&mut scratch);
    let canonical_bytes = encode_canonical(&scratch)?;
    Ok(geocam_crypto::canonical_hash_hex(&canonical_bytes))
}
