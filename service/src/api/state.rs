//! Shared application state injected into every handler via `Extension`.

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use crate::build_info::BuildInfo;
use crate::codec_pool::CodecPool;
use crate::config::LimitsConfig;
use crate::registry::DeviceRegistry;
use crate::session::SessionStore;

pub struct AppState {
    pub session_store: Arc<SessionStore>,
    pub registry: Arc<dyn DeviceRegistry>,
    pub pool: PgPool,
    pub limits: LimitsConfig,
    pub build_info: BuildInfo,
    pub started_at: Instant,
    pub codec_pool: CodecPool,
}
