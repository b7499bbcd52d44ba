//! `POST /api/register-device-secure`, `GET /api/devices-secure`,
//! `DELETE /api/delete-device` (spec.md §6, component G).
//!
//! Unlike the signing and verification endpoints, these use snake_case
//! field names throughout (spec.md §6 preserves this inconsistency rather
//! than normalizing it across the API surface).

use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::errors::ApiError;
use super::state::AppState;
use crate::registry::{DeviceRegistry, NewDevice};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PublicKeyData {
    #[serde(rename = "keyBase64")]
    pub key_base64: String,
    #[serde(rename = "keyId")]
    pub key_id: String,
    pub algorithm: String,
    #[serde(rename = "keySize")]
    pub key_size: u32,
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    pub hash: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterDeviceRequest {
    pub installation_id: String,
    pub device_model: String,
    pub os_name: String,
    pub os_version: String,
    pub public_key_data: PublicKeyData,
    pub registration_timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterDeviceResponse {
    pub success: bool,
    pub device_id: uuid::Uuid,
    pub public_key_id: String,
    pub geocam_sequence: i64,
    pub geocam_name: String,
}

/// Register a device's signing key, or return the pre-existing record if
/// `(installation_id, public_key)` was already registered (spec.md §4.G
/// idempotence invariant).
#[utoipa::path(
    post,
    path = "/api/register-device-secure",
    tag = "Registry",
    request_body = RegisterDeviceRequest,
    responses(
        (status = 200, description = "Device registered (or already known)", body = RegisterDeviceResponse),
        (status = 400, description = "Unsupported algorithm", body = super::ErrorBody),
        (status = 409, description = "installation_id bound to a different key", body = super::ErrorBody),
    )
)]
pub async fn register_device_secure(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<Json<RegisterDeviceResponse>, ApiError> {
    let registered = state
        .registry
        .register(NewDevice {
            installation_id: req.installation_id,
            device_model: req.device_model,
            os_name: req.os_name,
            os_version: req.os_version,
            public_key_base64: req.public_key_data.key_base64,
            algorithm: req.public_key_data.algorithm,
        })
        .await?;

    let device = registered.device;
    Ok(Json(RegisterDeviceResponse {
        success: true,
        device_id: device.device_id,
        public_key_id: device.public_key_id.as_str().to_string(),
        geocam_sequence: device.sequence,
        geocam_name: device.geocam_name(),
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDevicesQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceSummary {
    pub device_id: uuid::Uuid,
    pub installation_id: String,
    pub public_key_id: String,
    pub public_key_fingerprint: String,
    pub geocam_name: String,
    pub device_model: String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub revoked: bool,
}

impl From<crate::registry::Device> for DeviceSummary {
    fn from(device: crate::registry::Device) -> Self {
        Self {
            device_id: device.device_id,
            installation_id: device.installation_id.clone(),
            public_key_id: device.public_key_id.as_str().to_string(),
            public_key_fingerprint: device.public_key_fingerprint.clone(),
            geocam_name: device.geocam_name(),
            device_model: device.device_model.clone(),
            registered_at: device.registered_at,
            revoked: device.revoked,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceListResponse {
    pub success: bool,
    pub devices: Vec<DeviceSummary>,
    pub total_count: i64,
}

/// List registered devices, paginated (spec.md SUPPLEMENT-1). Revoked
/// devices remain visible here; only `revoked` distinguishes them.
#[utoipa::path(
    get,
    path = "/api/devices-secure",
    tag = "Registry",
    params(ListDevicesQuery),
    responses((status = 200, description = "Page of registered devices", body = DeviceListResponse))
)]
pub async fn list_devices_secure(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ListDevicesQuery>,
) -> Result<Json<DeviceListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(crate::registry::DEFAULT_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let (devices, total_count) = state.registry.list_devices(limit, offset).await?;

    Ok(Json(DeviceListResponse {
        success: true,
        devices: devices.into_iter().map(DeviceSummary::from).collect(),
        total_count,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteDeviceRequest {
    pub installation_id: String,
    pub key_fingerprint: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteDeviceResponse {
    pub success: bool,
    pub message: String,
}

/// Delete a device record. Requires both `installation_id` and
/// `key_fingerprint` to match the same row (spec.md §4.G).
#[utoipa::path(
    delete,
    path = "/api/delete-device",
    tag = "Registry",
    request_body = DeleteDeviceRequest,
    responses(
        (status = 200, description = "Device deleted", body = DeleteDeviceResponse),
        (status = 404, description = "No matching device", body = super::ErrorBody),
    )
)]
pub async fn delete_device(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<DeleteDeviceRequest>,
) -> Result<Json<DeleteDeviceResponse>, ApiError> {
    state
        .registry
        .delete_by_installation(&req.installation_id, &req.key_fingerprint)
        .await?;

    Ok(Json(DeleteDeviceResponse {
        success: true,
        message: "device deleted".to_string(),
    }))
}
