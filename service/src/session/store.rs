//! Sharded in-memory signing-session store (spec.md §4.E, §5).
//!
//! The store is split into a fixed number of shards, each guarded by its own
//! lock, so that concurrent `Process`/`Complete` calls for unrelated
//! sessions don't contend on a single mutex. A separate insertion-order
//! queue backs LRU eviction when the store is at capacity.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use geocam_codec::RasterImage;
use parking_lot::Mutex;
use uuid::Uuid;

/// Number of independent lock shards. Spec.md §5 requires at least 16,
/// keyed by `hash(session_id) mod shard_count`.
const SHARD_COUNT: usize = 16;

/// A buffered signing session: the embedded raster awaiting a device
/// signature, plus the canonical hash that was handed to the device.
#[derive(Debug, Clone)]
pub struct Session {
    pub image: RasterImage,
    pub public_key_base64: String,
    pub canonical_hash_hex: String,
    pub created_at: Instant,
}

/// Outcome of [`SessionStore::take`], distinguishing a session that never
/// existed (404) from one that existed but aged out its TTL (410).
pub enum TakeResult {
    Found(Session),
    Expired,
    Absent,
}

pub struct SessionStore {
    shards: Vec<Mutex<HashMap<Uuid, Session>>>,
    insertion_order: Mutex<VecDeque<Uuid>>,
    max_sessions: usize,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(max_sessions: usize, ttl: Duration) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            insertion_order: Mutex::new(VecDeque::new()),
            max_sessions,
            ttl,
        }
    }

    fn shard_for(&self, session_id: Uuid) -> &Mutex<HashMap<Uuid, Session>> {
        let bytes = session_id.as_bytes();
        let shard = bytes.iter().fold(0usize, |acc, &b| acc.wrapping_add(b as usize)) % SHARD_COUNT;
        &self.shards[shard]
    }

    /// Insert a freshly created session, evicting the oldest entry (by
    /// insertion order) if the store is at capacity.
    pub fn insert(&self, session_id: Uuid, session: Session) {
        {
            let mut order = self.insertion_order.lock();
            if order.len() >= self.max_sessions {
                if let Some(oldest) = order.pop_front() {
                    self.shard_for(oldest).lock().remove(&oldest);
                    tracing::warn!(session_id = %oldest, "session store at capacity, evicting oldest session");
                }
            }
            order.push_back(session_id);
        }
        self.shard_for(session_id).lock().insert(session_id, session);
    }

    /// Atomically remove and return a session, honoring TTL expiry.
    pub fn take(&self, session_id: Uuid) -> TakeResult {
        let mut shard = self.shard_for(session_id).lock();
        let Some(session) = shard.remove(&session_id) else {
            return TakeResult::Absent;
        };
        if session.created_at.elapsed() > self.ttl {
            return TakeResult::Expired;
        }
        TakeResult::Found(session)
    }

    /// Explicitly abandon a session without consuming it for `Complete`.
    pub fn abandon(&self, session_id: Uuid) {
        self.shard_for(session_id).lock().remove(&session_id);
    }

    /// Sweep every shard for sessions past their TTL, removing them.
    /// Returns the number of sessions reaped.
    pub fn reap_expired(&self) -> usize {
        let mut reaped = 0usize;
        for shard in &self.shards {
            let mut shard = shard.lock();
            let expired: Vec<Uuid> = shard
                .iter()
                .filter(|(_, s)| s.created_at.elapsed() > self.ttl)
                .map(|(id, _)| *id)
                .collect();
            for id in expired {
                shard.remove(&id);
                reaped += 1;
            }
        }
        reaped
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }
}
