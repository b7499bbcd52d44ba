#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

use std::{net::SocketAddr, sync::Arc, time::Duration, time::Instant};

use axum::{
    error_handling::HandleErrorLayer,
    http::{Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    BoxError, Extension, Json, Router,
};
use geocam_api::{
    api::{self, AppState, ErrorBody},
    build_info::BuildInfoProvider,
    codec_pool::CodecPool,
    config::Config,
    db::setup_database,
    http::security::{build_security_headers, security_headers_middleware},
    registry::PgDeviceRegistry,
    rest::{get_build_info, ApiDoc},
    session::{self, SessionStore},
    verify,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Converts a request that overran `limits.request_deadline_seconds` into
/// the same `{error, code}` shape every other handler error uses
/// (spec.md §5: every request carries a deadline).
async fn handle_deadline_error(error: BoxError) -> (StatusCode, Json<ErrorBody>) {
    if error.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                error: "request exceeded its deadline".to_string(),
                code: "request_timeout".to_string(),
            }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: format!("unhandled error: {error}"),
                code: "internal_error".to_string(),
            }),
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("{e}"))?;

    std::env::set_var("RUST_LOG", &config.logging.level);
    tracing_subscriber::fmt::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "geocam-api starting up");

    tracing::info!("Connecting to database...");
    let pool = setup_database(&config.database).await?;

    let build_info_provider = BuildInfoProvider::from_env();
    let build_info = build_info_provider.build_info();
    tracing::info!(
        version = %build_info.version,
        git_sha = %build_info.git_sha,
        build_time = %build_info.build_time,
        "resolved build metadata"
    );

    let session_store = Arc::new(SessionStore::new(
        config.session.max_sessions,
        std::time::Duration::from_secs(config.session.ttl_seconds),
    ));
    session::spawn_reaper(
        Arc::clone(&session_store),
        std::time::Duration::from_secs(config.session.reaper_interval_seconds),
    );

    verify::spawn_audit_reaper(
        pool.clone(),
        config.audit.retention_days,
        Duration::from_secs(config.audit.reaper_interval_seconds),
    );

    let registry = Arc::new(PgDeviceRegistry::new(pool.clone()));

    let codec_pool = CodecPool::new(
        config.codec_pool.worker_threads,
        config.codec_pool.max_queue_depth,
    );

    let request_deadline = Duration::from_secs(config.limits.request_deadline_seconds);

    let state = Arc::new(AppState {
        session_store,
        registry,
        pool: pool.clone(),
        limits: config.limits.clone(),
        build_info: build_info.clone(),
        started_at: Instant::now(),
        codec_pool,
    });

    let cors_origins = &config.cors.allowed_origins;
    let allow_origin: AllowOrigin = if cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow any origin - not recommended for production");
        AllowOrigin::any()
    } else if cors_origins.is_empty() {
        tracing::info!(
            "CORS allowed origins not configured - cross-origin requests will be blocked"
        );
        AllowOrigin::list(Vec::<axum::http::HeaderValue>::new())
    } else {
        let origins: Vec<axum::http::HeaderValue> =
            cors_origins.iter().filter_map(|origin| origin.parse().ok()).collect();
        tracing::info!(origins = ?cors_origins, "CORS allowed origins configured");
        AllowOrigin::list(origins)
    };

    let security_headers = if config.security_headers.enabled {
        tracing::info!("Security headers enabled");
        Some(build_security_headers(&config.security_headers))
    } else {
        tracing::info!("Security headers disabled");
        None
    };

    let mut app = Router::new()
        .merge(api::router(state))
        .route("/health", get(health_check))
        .route("/build-info", get(get_build_info))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(Extension(build_info))
        .layer(Extension(pool))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .allow_origin(allow_origin),
        );

    if let Some(headers) = security_headers {
        app = app
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(Extension(headers));
    }

    app = app.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_deadline_error))
            .layer(tower::timeout::TimeoutLayer::new(request_deadline)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
