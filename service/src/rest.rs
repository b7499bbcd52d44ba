//! REST API handlers and `OpenAPI` documentation.
//!
//! Request/response DTOs live alongside their handlers in `crate::api`; this
//! module holds the `OpenAPI` document that ties every endpoint together.

// The OpenApi derive macro generates code that triggers this lint
#![allow(clippy::needless_for_each)]

use crate::build_info::BuildInfo;
use axum::{extract::Extension, Json};
use utoipa::OpenApi;

/// `OpenAPI` documentation for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "GeoCam API",
        version = "1.0.0",
        description = "Tamper-evident geotagged photography: signing, verification, and device registry",
        license(name = "MIT")
    ),
    servers(
        (url = "/", description = "GeoCam API")
    ),
    paths(
        get_build_info,
        crate::api::health::get_health,
        crate::api::process::process_geocam_image,
        crate::api::complete::complete_geocam_image,
        crate::api::verify_handlers::pure_png_verify,
        crate::api::verify_handlers::verify_image_secure,
        crate::api::devices::register_device_secure,
        crate::api::devices::list_devices_secure,
        crate::api::devices::delete_device,
    ),
    components(schemas(
        BuildInfo,
        crate::api::health::HealthResponse,
        crate::api::process::ProcessRequest,
        crate::api::process::ProcessResponse,
        crate::api::process::ProcessImageInfo,
        crate::api::complete::CompleteRequest,
        crate::api::complete::CompleteResponse,
        crate::api::complete::CompleteStatsResponse,
        crate::api::complete::CompleteDimensions,
        crate::api::verify_handlers::PurePngVerifyRequest,
        crate::api::verify_handlers::VerifyImageSecureRequest,
        crate::api::verify_handlers::VerifyEnvelope,
        crate::api::devices::RegisterDeviceRequest,
        crate::api::devices::PublicKeyData,
        crate::api::devices::RegisterDeviceResponse,
        crate::api::devices::DeviceListResponse,
        crate::api::devices::DeviceSummary,
        crate::api::devices::DeleteDeviceRequest,
        crate::api::devices::DeleteDeviceResponse,
        crate::verify::VerificationResult,
        crate::verify::DeviceInfo,
        crate::verify::Reason,
        crate::api::ErrorBody,
    ))
)]
pub struct ApiDoc;

/// Get build information
///
/// Returns metadata about the running service including version, git SHA, and build time.
#[utoipa::path(
    get,
    path = "/build-info",
    tag = "System",
    responses(
        (status = 200, description = "Build information retrieved successfully", body = BuildInfo),
    )
)]
#[allow(clippy::unused_async)] // Required for Axum handler signature
pub async fn get_build_info(Extension(build_info): Extension<BuildInfo>) -> Json<BuildInfo> {
    Json(build_info)
}
