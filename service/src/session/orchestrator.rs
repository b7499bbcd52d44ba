//! Two-phase signing orchestrator (component E, spec.md §4.E).
//!
//! `process` hashes a freshly uploaded photo and buffers it behind a
//! session id; `complete` consumes that session once the device has signed
//! the returned hash and embeds the signature into the final PNG. The
//! device never sees nor chooses how the signed bytes are constructed.

use std::time::Instant;

use chrono::Utc;
use geocam_codec::RasterImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::store::{Session, SessionStore, TakeResult};

/// Minimum width/height a raster must have for the body and last-row
/// regions to carry anything at all (spec.md §8 boundary behaviors).
const MIN_WIDTH: u32 = 9;
const MIN_HEIGHT: u32 = 2;

const LAST_ROW_FRAME_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("could not decode the uploaded image")]
    ImageDecodeFailed,
    #[error("image dimensions are too small to carry a signature frame")]
    DimensionsTooSmall,
    #[error("public key does not decode to a 33-byte compressed secp256k1 point")]
    MalformedPublicKey,
    #[error("basic-info payload does not fit in the available body region")]
    PayloadTooLarge,
    #[error("unknown session")]
    UnknownSession,
    #[error("session existed but aged past its TTL")]
    SessionExpired,
    #[error("signature does not decode to 64 bytes")]
    MalformedSignature,
    #[error("signature failed verification against the issued hash")]
    SignatureVerificationFailed,
    #[error(transparent)]
    Codec(#[from] geocam_codec::CodecError),
    #[error(transparent)]
    Stego(#[from] geocam_codec::StegoError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub rgba_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutput {
    pub session_id: Uuid,
    pub hash_hex: String,
    pub image_info: ImageInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteStats {
    pub original_size: usize,
    pub png_size: usize,
    pub dimensions: Dimensions,
    pub compression_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteOutput {
    pub png_bytes: Vec<u8>,
    pub stats: CompleteStats,
}

#[derive(Debug, Serialize, Deserialize)]
struct LastRowFrame {
    sig: String,
    pk: String,
    ts: String,
    v: u32,
}

/// Decode `photo_bytes` (JPEG or any format the `image` crate supports),
/// embed `basic_info` into the body region, compute the canonical hash, and
/// buffer the result behind a fresh session id.
///
/// # Errors
/// See [`SessionError`]: image decode failures, undersized dimensions, a
/// malformed public key, or a basic-info payload that doesn't fit.
pub fn process(
    store: &SessionStore,
    photo_bytes: &[u8],
    basic_info: &str,
    public_key_base64: &str,
) -> Result<ProcessOutput, SessionError> {
    let decoded = image::load_from_memory(photo_bytes).map_err(|_| SessionError::ImageDecodeFailed)?;
    let rgba = decoded.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());

    if height < MIN_HEIGHT || width < MIN_WIDTH {
        return Err(SessionError::DimensionsTooSmall);
    }

    validate_public_key(public_key_base64)?;

    let mut image = RasterImage::new(width, height, rgba.into_raw())?;

    let basic_info_bytes = basic_info.as_bytes();
    geocam_codec::embed_body(&mut image, basic_info_bytes).map_err(|e| match e {
        geocam_codec::StegoError::PayloadTooLarge => SessionError::PayloadTooLarge,
        other => SessionError::Stego(other),
    })?;

    let hash_hex = geocam_codec::canonical_hash_hex(&image)?;
    let rgba_size = image.pixels.len();

    let session_id = Uuid::new_v4();
    store.insert(
        session_id,
        Session {
            image,
            public_key_base64: public_key_base64.to_string(),
            canonical_hash_hex: hash_hex.clone(),
            created_at: Instant::now(),
        },
    );

    Ok(ProcessOutput {
        session_id,
        hash_hex,
        image_info: ImageInfo {
            width,
            height,
            rgba_size,
        },
    })
}

/// Consume the session named by `session_id`, embed the device's signature
/// into the last-row frame, and re-encode the final PNG.
///
/// The session is removed from the store whether or not this call
/// succeeds once past the `UnknownSession` check — a cryptographic failure
/// here does not reinstate it; the client must restart from `process`.
///
/// # Errors
/// See [`SessionError`]: `UnknownSession` if the id was never issued,
/// `SessionExpired` if it existed but aged past its TTL, `MalformedSignature`
/// if the signature doesn't decode to 64 bytes, or
/// `SignatureVerificationFailed` on the defense-in-depth pre-check.
pub fn complete(
    store: &SessionStore,
    session_id: Uuid,
    signature_base64: &str,
) -> Result<CompleteOutput, SessionError> {
    let session = match store.take(session_id) {
        TakeResult::Found(session) => session,
        TakeResult::Expired => return Err(SessionError::SessionExpired),
        TakeResult::Absent => return Err(SessionError::UnknownSession),
    };

    let signature_bytes =
        geocam_crypto::decode_base64(signature_base64).map_err(|_| SessionError::MalformedSignature)?;
    if signature_bytes.len() != 64 {
        return Err(SessionError::MalformedSignature);
    }

    let public_key_bytes = geocam_crypto::decode_base64(&session.public_key_base64)
        .map_err(|_| SessionError::MalformedSignature)?;
    let digest = geocam_crypto::decode_hex_digest(&session.canonical_hash_hex)
        .map_err(|_| SessionError::SignatureVerificationFailed)?;
    geocam_crypto::verify_compact(&signature_bytes, &public_key_bytes, &digest)
        .map_err(|_| SessionError::SignatureVerificationFailed)?;

    let frame = LastRowFrame {
        sig: signature_base64.to_string(),
        pk: session.public_key_base64.clone(),
        ts: Utc::now().to_rfc3339(),
        v: LAST_ROW_FRAME_VERSION,
    };
    let frame_bytes = serde_json::to_vec(&frame).map_err(|_| SessionError::SignatureVerificationFailed)?;

    let mut image = session.image;
    let original_size = image.pixels.len();
    geocam_codec::embed_last_row(&mut image, &frame_bytes)?;
    let png_bytes = geocam_codec::encode_canonical(&image)?;
    let png_size = png_bytes.len();

    Ok(CompleteOutput {
        png_bytes,
        stats: CompleteStats {
            original_size,
            png_size,
            dimensions: Dimensions {
                width: image.width,
                height: image.height,
            },
            #[allow(clippy::cast_precision_loss)]
            compression_ratio: png_size as f64 / original_size.max(1) as f64,
        },
    })
}

fn validate_public_key(public_key_base64: &str) -> Result<(), SessionError> {
    let bytes =
        geocam_crypto::decode_base64(public_key_base64).map_err(|_| SessionError::MalformedPublicKey)?;
    if bytes.len() != 33 || (bytes[0] != 0x02 && bytes[0] != 0x03) {
        return Err(SessionError::MalformedPublicKey);
    }
    Ok(())
}
