//! REST surface (spec.md §6): DTOs and handlers for every endpoint, plus
//! the shared [`AppState`] and [`ApiError`] they're built on.

pub mod complete;
pub mod devices;
pub mod errors;
pub mod health;
pub mod process;
pub mod state;
pub mod verify_handlers;

pub use errors::{ApiError, ErrorBody};
pub use state::AppState;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Extension, Router};

/// Assemble the router for every endpoint in spec.md §6, ready to be
/// `.merge`d with the build-info route and wrapped in CORS/security-header
/// layers by the binary.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/process-geocam-image", post(process::process_geocam_image))
        .route("/complete-geocam-image", post(complete::complete_geocam_image))
        .route("/pure-png-verify", post(verify_handlers::pure_png_verify))
        .route(
            "/api/verify-image-secure",
            post(verify_handlers::verify_image_secure),
        )
        .route(
            "/api/register-device-secure",
            post(devices::register_device_secure),
        )
        .route("/api/devices-secure", get(devices::list_devices_secure))
        .route("/api/delete-device", delete(devices::delete_device))
        .route("/api/health", get(health::get_health))
        .layer(Extension(state))
}
