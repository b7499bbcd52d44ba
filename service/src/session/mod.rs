//! Signing sessions (component E, spec.md §4.E): a sharded TTL store plus
//! the `process`/`complete` orchestration built on top of it.

mod orchestrator;
mod store;

use std::sync::Arc;
use std::time::Duration;

pub use orchestrator::{
    complete, process, CompleteOutput, CompleteStats, Dimensions, ImageInfo, ProcessOutput,
    SessionError,
};
pub use store::{Session, SessionStore, TakeResult};

/// Spawn the background task that periodically sweeps expired sessions out
/// of `store`. The returned handle is detached; it runs for the lifetime of
/// the process.
pub fn spawn_reaper(store: Arc<SessionStore>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let reaped = store.reap_expired();
            if reaped > 0 {
                tracing::info!(reaped, "session reaper swept expired signing sessions");
            }
        }
    });
}
