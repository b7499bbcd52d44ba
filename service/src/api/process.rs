//! `POST /process-geocam-image` (spec.md §6, component E `Process`).

use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::errors::ApiError;
use super::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub jpeg_base64: String,
    pub basic_info: String,
    pub public_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImageInfo {
    pub width: u32,
    pub height: u32,
    pub rgba_size: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub session_id: uuid::Uuid,
    pub hash_to_sign: String,
    pub image_info: ProcessImageInfo,
}

/// Decode a mobile-submitted JPEG, embed `basicInfo` into the body region,
/// and hand back a 128-hex canonical hash for the device to sign.
#[utoipa::path(
    post,
    path = "/process-geocam-image",
    tag = "Signing",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Session created", body = ProcessResponse),
        (status = 400, description = "Malformed input", body = super::ErrorBody),
        (status = 413, description = "Image too large", body = super::ErrorBody),
        (status = 429, description = "Codec worker pool is at capacity", body = super::ErrorBody),
    )
)]
pub async fn process_geocam_image(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let jpeg_bytes = geocam_crypto::decode_base64(&req.jpeg_base64)
        .map_err(|_| ApiError::bad_request("invalid_base64", "jpegBase64 is not valid base64"))?;

    if jpeg_bytes.len() as u64 > state.limits.max_image_bytes {
        return Err(ApiError::payload_too_large(
            "image_too_large",
            "encoded image exceeds the maximum accepted size",
        ));
    }

    if req.basic_info.len() > state.limits.max_basic_info_bytes {
        return Err(ApiError::unprocessable(
            "basic_info_too_large",
            "basicInfo exceeds the maximum accepted size",
        ));
    }

    let _permit = state.codec_pool.acquire().await?;
    let output = crate::session::process(
        &state.session_store,
        &jpeg_bytes,
        &req.basic_info,
        &req.public_key,
    )?;

    Ok(Json(ProcessResponse {
        success: true,
        session_id: output.session_id,
        hash_to_sign: output.hash_hex,
        image_info: ProcessImageInfo {
            width: output.image_info.width,
            height: output.image_info.height,
            rgba_size: output.image_info.rgba_size,
        },
    }))
}
