//! `POST /pure-png-verify` and `POST /api/verify-image-secure` (spec.md §6,
//! component F).

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::errors::ApiError;
use super::state::AppState;
use crate::verify::VerificationResult;

/// Best-effort client address for the audit log, from a proxy-set header.
/// Absent (and never required) when the service sits directly on the edge.
fn peer_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PurePngVerifyRequest {
    #[serde(rename = "pngBase64")]
    pub png_base64: String,
}

/// Wraps [`VerificationResult`] with the `decoded_info`/`message` shape the
/// `/pure-png-verify` endpoint has carried since before the secure registry
/// endpoints existed.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyEnvelope {
    pub signature_valid: bool,
    pub device_info: Option<crate::verify::DeviceInfo>,
    pub decoded_info: Option<String>,
    pub message: String,
}

impl From<VerificationResult> for VerifyEnvelope {
    fn from(result: VerificationResult) -> Self {
        let message = reason_message(&result);
        Self {
            signature_valid: result.signature_valid,
            device_info: result.device_info,
            decoded_info: result.basic_info,
            message,
        }
    }
}

fn reason_message(result: &VerificationResult) -> String {
    use crate::verify::Reason;
    match result.reason {
        Reason::Ok => "image is authentic".to_string(),
        Reason::NotAValidPng => "payload does not decode as a PNG image".to_string(),
        Reason::NoSignatureFrame => "image carries no signature frame".to_string(),
        Reason::MalformedFrame => "signature frame is malformed".to_string(),
        Reason::InvalidSignature => "signature does not match the image content".to_string(),
        Reason::UnknownDevice => "signing device is not registered".to_string(),
        Reason::RevokedDevice => "signing device has been revoked".to_string(),
        Reason::NoBasicInfo => "signature is valid but basic info is missing".to_string(),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurePngVerifyResponse {
    pub success: bool,
    pub verification_result: VerifyEnvelope,
}

/// Decode a submitted PNG and report whether its embedded signature and
/// device are authentic. Never returns a non-2xx status for a forged or
/// malformed image — that is a verdict, not an error (spec.md §7).
#[utoipa::path(
    post,
    path = "/pure-png-verify",
    tag = "Verification",
    request_body = PurePngVerifyRequest,
    responses(
        (status = 200, description = "Verification performed", body = PurePngVerifyResponse),
        (status = 400, description = "Malformed request body", body = super::ErrorBody),
        (status = 429, description = "Codec worker pool is at capacity", body = super::ErrorBody),
    )
)]
pub async fn pure_png_verify(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PurePngVerifyRequest>,
) -> Result<Json<PurePngVerifyResponse>, ApiError> {
    let png_bytes = geocam_crypto::decode_base64(&req.png_base64)
        .map_err(|_| ApiError::bad_request("invalid_base64", "pngBase64 is not valid base64"))?;

    let _permit = state.codec_pool.acquire().await?;
    let result = crate::verify::verify(state.registry.as_ref(), &png_bytes).await;
    crate::verify::record_audit(&state.pool, &result, peer_ip(&headers).as_deref()).await;

    Ok(Json(PurePngVerifyResponse {
        success: true,
        verification_result: result.into(),
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyImageSecureRequest {
    pub image_data: String,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub public_key_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyImageSecureResponse {
    pub success: bool,
    pub verification_result: VerificationResult,
}

/// Registry-aware verification: same canonical-hash and signature checks as
/// `/pure-png-verify`, reported through the full structured
/// [`VerificationResult`] rather than the legacy envelope.
#[utoipa::path(
    post,
    path = "/api/verify-image-secure",
    tag = "Verification",
    request_body = VerifyImageSecureRequest,
    responses(
        (status = 200, description = "Verification performed", body = VerifyImageSecureResponse),
        (status = 400, description = "Malformed request body", body = super::ErrorBody),
        (status = 429, description = "Codec worker pool is at capacity", body = super::ErrorBody),
    )
)]
pub async fn verify_image_secure(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<VerifyImageSecureRequest>,
) -> Result<Json<VerifyImageSecureResponse>, ApiError> {
    let image_bytes = geocam_crypto::decode_base64(&req.image_data)
        .map_err(|_| ApiError::bad_request("invalid_base64", "image_data is not valid base64"))?;

    let _permit = state.codec_pool.acquire().await?;
    let result = crate::verify::verify(state.registry.as_ref(), &image_bytes).await;
    crate::verify::record_audit(&state.pool, &result, peer_ip(&headers).as_deref()).await;

    Ok(Json(VerifyImageSecureResponse {
        success: true,
        verification_result: result,
    }))
}
