//! Verification orchestrator (component F, spec.md §4.F).
//!
//! The single entry point for "is this PNG authentic?". Every step records
//! a terminal `reason` rather than raising: a forged or malformed image is
//! a verdict, never an HTTP error (spec.md §7).

use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::registry::{Device, DeviceRegistry};

/// The stable reason codes a [`VerificationResult`] can carry (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Ok,
    NotAValidPng,
    NoSignatureFrame,
    MalformedFrame,
    InvalidSignature,
    UnknownDevice,
    RevokedDevice,
    NoBasicInfo,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeviceInfo {
    pub public_key_id: String,
    pub geocam_name: String,
    pub device_model: String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Device> for DeviceInfo {
    fn from(device: &Device) -> Self {
        Self {
            public_key_id: device.public_key_id.as_str().to_string(),
            geocam_name: device.geocam_name(),
            device_model: device.device_model.clone(),
            registered_at: device.registered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerificationResult {
    pub authentic: bool,
    pub signature_valid: bool,
    pub device_known: bool,
    pub device_revoked: bool,
    pub device_info: Option<DeviceInfo>,
    pub basic_info: Option<String>,
    pub reason: Reason,
}

impl VerificationResult {
    fn failure(reason: Reason) -> Self {
        Self {
            authentic: false,
            signature_valid: false,
            device_known: false,
            device_revoked: false,
            device_info: None,
            basic_info: None,
            reason,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct LastRowFrame {
    sig: String,
    pk: String,
    #[allow(dead_code)]
    v: u32,
}

/// Verify `png_bytes` end to end: decode, read the signature frame, check
/// the signature, and cross-reference the device registry.
///
/// Every outcome is a terminal `VerificationResult`; this function does not
/// return an `Err` for cryptographically meaningful input. Decode/parse
/// failures and verification failures are both recorded as reasons.
pub async fn verify(registry: &dyn DeviceRegistry, png_bytes: &[u8]) -> VerificationResult {
    let image = match geocam_codec::decode(png_bytes) {
        Ok(image) => image,
        Err(_) => return VerificationResult::failure(Reason::NotAValidPng),
    };

    let frame_bytes = match geocam_codec::read_last_row(&image) {
        Ok(bytes) => bytes,
        Err(_) => return VerificationResult::failure(Reason::NoSignatureFrame),
    };

    let frame: LastRowFrame = match serde_json::from_slice(&frame_bytes) {
        Ok(frame) => frame,
        Err(_) => return VerificationResult::failure(Reason::MalformedFrame),
    };

    let basic_info = geocam_codec::read_body(&image)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());

    let hash_hex = match geocam_codec::canonical_hash_hex(&image) {
        Ok(hash) => hash,
        Err(_) => return VerificationResult::failure(Reason::MalformedFrame),
    };

    let signature_valid = verify_signature(&frame, &hash_hex);

    let device = match registry.lookup_by_public_key(&frame.pk).await {
        Ok(device) => device,
        Err(_) => None,
    };

    let device_known = device.is_some();
    let device_revoked = device.as_ref().is_some_and(|d| d.revoked);
    let device_info = device.as_ref().map(DeviceInfo::from);

    let authentic = signature_valid && device_known && !device_revoked;

    let reason = if !signature_valid {
        Reason::InvalidSignature
    } else if !device_known {
        Reason::UnknownDevice
    } else if device_revoked {
        Reason::RevokedDevice
    } else if basic_info.is_none() {
        Reason::NoBasicInfo
    } else {
        Reason::Ok
    };

    VerificationResult {
        authentic,
        signature_valid,
        device_known,
        device_revoked,
        device_info,
        basic_info,
        reason,
    }
}

fn verify_signature(frame: &LastRowFrame, hash_hex: &str) -> bool {
    let Ok(signature_bytes) = geocam_crypto::decode_base64(&frame.sig) else {
        return false;
    };
    let Ok(public_key_bytes) = geocam_crypto::decode_base64(&frame.pk) else {
        return false;
    };
    let Ok(digest) = geocam_crypto::decode_hex_digest(hash_hex) else {
        return false;
    };
    geocam_crypto::verify_compact(&signature_bytes, &public_key_bytes, &digest).is_ok()
}

/// Append an audit record for a completed verification (spec.md §3,
/// AMBIENT-6). Best-effort: a logging failure here must never fail the
/// request that triggered it.
pub async fn record_audit(pool: &PgPool, result: &VerificationResult, peer_ip: Option<&str>) {
    let public_key_id = result.device_info.as_ref().map(|d| d.public_key_id.as_str());
    let reason = serde_json::to_value(result.reason)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "ok".to_string());

    let outcome = sqlx::query(
        "INSERT INTO verifications (public_key_id, valid, reason, peer_ip) VALUES ($1, $2, $3, $4)",
    )
    .bind(public_key_id)
    .bind(result.authentic)
    .bind(&reason)
    .bind(peer_ip)
    .execute(pool)
    .await;

    if let Err(error) = outcome {
        tracing::warn!(%error, "failed to write verification audit record");
    }
}

/// Deletes `verifications` rows older than `retention_days` (AMBIENT-6:
/// bounded retention). Runs once immediately and then on `interval`.
pub fn spawn_audit_reaper(pool: PgPool, retention_days: u32, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match sqlx::query(
                "DELETE FROM verifications WHERE happened_at < now() - ($1 || ' days')::interval",
            )
            .bind(retention_days.to_string())
            .execute(&pool)
            .await
            {
                Ok(result) => {
                    let deleted = result.rows_affected();
                    if deleted > 0 {
                        tracing::info!(deleted, "audit log reaper swept expired verification records");
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "audit log reaper failed to sweep expired records");
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MockDeviceRegistry;
    use geocam_codec::RasterImage;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::{Signature, SigningKey};

    fn sample_image(width: u32, height: u32) -> RasterImage {
        let pixels = vec![10u8; width as usize * height as usize * 4];
        let mut image = RasterImage::new(width, height, pixels).expect("valid raster");
        for px in image.pixels.chunks_mut(4) {
            px[3] = 0xFF;
        }
        image
    }

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[11u8; 32].into()).expect("valid scalar")
    }

    fn public_key_base64(sk: &SigningKey) -> String {
        let compressed = sk.verifying_key().to_encoded_point(true);
        geocam_crypto::encode_base64(compressed.as_bytes())
    }

    fn sign_and_embed(mut image: RasterImage, basic_info: Option<&str>) -> Vec<u8> {
        if let Some(basic_info) = basic_info {
            geocam_codec::embed_body(&mut image, basic_info.as_bytes()).expect("embed body");
        }
        let hash_hex = geocam_codec::canonical_hash_hex(&image).expect("hash");
        let digest = geocam_crypto::decode_hex_digest(&hash_hex).expect("hex");
        let sk = signing_key();
        let signature: Signature = sk.sign_prehash(&digest).expect("sign");

        let frame = serde_json::json!({
            "sig": geocam_crypto::encode_base64(&signature.to_bytes()),
            "pk": public_key_base64(&sk),
            "ts": "2026-01-01T00:00:00Z",
            "v": 1,
        });
        let frame_bytes = serde_json::to_vec(&frame).expect("serialize frame");
        geocam_codec::embed_last_row(&mut image, &frame_bytes).expect("embed frame");
        geocam_codec::encode_canonical(&image).expect("encode")
    }

    #[tokio::test]
    async fn honest_roundtrip_is_authentic_when_device_registered() {
        let registry = MockDeviceRegistry::new();
        let sk = signing_key();
        registry
            .register(crate::registry::NewDevice {
                installation_id: "install-1".to_string(),
                device_model: "Pixel 9".to_string(),
                os_name: "Android".to_string(),
                os_version: "15".to_string(),
                public_key_base64: public_key_base64(&sk),
                algorithm: crate::registry::SUPPORTED_ALGORITHM.to_string(),
            })
            .await
            .expect("register");

        let png = sign_and_embed(sample_image(300, 8), Some("{\"lat\":1.0}"));
        let result = verify(&registry, &png).await;

        assert!(result.authentic);
        assert!(result.signature_valid);
        assert!(result.device_known);
        assert!(!result.device_revoked);
        assert_eq!(result.reason, Reason::Ok);
        assert_eq!(result.basic_info.as_deref(), Some("{\"lat\":1.0}"));
    }

    #[tokio::test]
    async fn tampered_pixel_invalidates_signature() {
        let registry = MockDeviceRegistry::new();
        let png = sign_and_embed(sample_image(300, 8), Some("x"));
        let mut image = geocam_codec::decode(&png).expect("decode");
        image.row_mut(0)[0] ^= 0x01;
        let tampered = geocam_codec::encode_canonical(&image).expect("encode");

        let result = verify(&registry, &tampered).await;
        assert!(!result.authentic);
        assert!(!result.signature_valid);
        assert_eq!(result.reason, Reason::InvalidSignature);
    }

    #[tokio::test]
    async fn last_row_padding_jitter_does_not_invalidate() {
        let registry = MockDeviceRegistry::new();
        let sk = signing_key();
        registry
            .register(crate::registry::NewDevice {
                installation_id: "install-1".to_string(),
                device_model: "Pixel 9".to_string(),
                os_name: "Android".to_string(),
                os_version: "15".to_string(),
                public_key_base64: public_key_base64(&sk),
                algorithm: crate::registry::SUPPORTED_ALGORITHM.to_string(),
            })
            .await
            .expect("register");

        let png = sign_and_embed(sample_image(300, 8), Some("x"));
        let mut image = geocam_codec::decode(&png).expect("decode");
        let last_row = image.height - 1;
        let row = image.row_mut(last_row);
        let tail_start = row.len() - 4;
        row[tail_start..].copy_from_slice(&[0x11, 0x22, 0x33, 0x44]);
        let jittered = geocam_codec::encode_canonical(&image).expect("encode");

        let result = verify(&registry, &jittered).await;
        assert!(result.authentic);
        assert_eq!(result.reason, Reason::Ok);
    }

    #[tokio::test]
    async fn unknown_device_is_reported_but_signature_still_valid() {
        let registry = MockDeviceRegistry::new();
        let png = sign_and_embed(sample_image(300, 8), Some("x"));

        let result = verify(&registry, &png).await;
        assert!(result.signature_valid);
        assert!(!result.device_known);
        assert!(!result.authentic);
        assert_eq!(result.reason, Reason::UnknownDevice);
    }

    #[tokio::test]
    async fn revoked_device_is_not_authentic() {
        let registry = MockDeviceRegistry::new();
        let sk = signing_key();
        let registered = registry
            .register(crate::registry::NewDevice {
                installation_id: "install-1".to_string(),
                device_model: "Pixel 9".to_string(),
                os_name: "Android".to_string(),
                os_version: "15".to_string(),
                public_key_base64: public_key_base64(&sk),
                algorithm: crate::registry::SUPPORTED_ALGORITHM.to_string(),
            })
            .await
            .expect("register");
        registry.revoke(registered.device.device_id).await.expect("revoke");

        let png = sign_and_embed(sample_image(300, 8), Some("x"));
        let result = verify(&registry, &png).await;
        assert!(result.signature_valid);
        assert!(result.device_known);
        assert!(result.device_revoked);
        assert!(!result.authentic);
        assert_eq!(result.reason, Reason::RevokedDevice);
    }

    #[tokio::test]
    async fn not_a_png_is_reported_without_panicking() {
        let registry = MockDeviceRegistry::new();
        let result = verify(&registry, b"not a png").await;
        assert_eq!(result.reason, Reason::NotAValidPng);
    }

    #[tokio::test]
    async fn missing_signature_frame_is_reported() {
        let registry = MockDeviceRegistry::new();
        let image = sample_image(16, 8);
        let png = geocam_codec::encode_canonical(&image).expect("encode");
        let result = verify(&registry, &png).await;
        assert_eq!(result.reason, Reason::NoSignatureFrame);
    }
}
