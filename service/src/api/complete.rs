//! `POST /complete-geocam-image` (spec.md §6, component E `Complete`).

use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::errors::ApiError;
use super::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub session_id: uuid::Uuid,
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteStatsResponse {
    pub original_size: usize,
    pub png_size: usize,
    pub dimensions: CompleteDimensions,
    pub compression_ratio: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    pub success: bool,
    pub png_base64: String,
    pub stats: CompleteStatsResponse,
}

/// Consume a signing session, embed the device's signature into the
/// last-row frame, and return the final canonical PNG.
#[utoipa::path(
    post,
    path = "/complete-geocam-image",
    tag = "Signing",
    request_body = CompleteRequest,
    responses(
        (status = 200, description = "Signed PNG produced", body = CompleteResponse),
        (status = 400, description = "Malformed input", body = super::ErrorBody),
        (status = 404, description = "Unknown session", body = super::ErrorBody),
        (status = 410, description = "Session expired", body = super::ErrorBody),
        (status = 422, description = "Signature failed verification", body = super::ErrorBody),
        (status = 429, description = "Codec worker pool is at capacity", body = super::ErrorBody),
    )
)]
pub async fn complete_geocam_image(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let _permit = state.codec_pool.acquire().await?;
    let output =
        crate::session::complete(&state.session_store, req.session_id, &req.signature)?;

    Ok(Json(CompleteResponse {
        success: true,
        png_base64: geocam_crypto::encode_base64(&output.png_bytes),
        stats: CompleteStatsResponse {
            original_size: output.stats.original_size,
            png_size: output.stats.png_size,
            dimensions: CompleteDimensions {
                width: output.stats.dimensions.width,
                height: output.stats.dimensions.height,
            },
            compression_ratio: output.stats.compression_ratio,
        },
    }))
}
