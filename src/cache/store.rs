//! Time-bounded key→bytes storage for serialized list responses.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::counter;
use tracing::debug;

use crate::util::lock::{rw_read, rw_write};

use super::config::CacheConfig;
use super::counters::{HIT_TOTAL, INVALIDATE_TOTAL, MISS_TOTAL};

const SOURCE: &str = "cache::store";

struct CacheEntry {
    value: Bytes,
    /// `None` when `now + ttl` does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

#[derive(Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<String, CacheEntry>,
}

/// Opaque marker of the cache contents at a point in time.
///
/// Taken before reading the store; a fill carrying a stale generation is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeneration(u64);

/// List-response cache with a fixed per-instance TTL.
///
/// Expiry is lazy: an expired entry reads as absent but stays in the map until it
/// is overwritten, purged by [`ListCache::purge_expired`] or flushed by
/// [`ListCache::invalidate_all`]. The cache is never a source of truth; every
/// write path on the store must flush it.
pub struct ListCache {
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl ListCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.get_at(key, Instant::now())
    }

    pub fn set(&self, key: impl Into<String>, value: Bytes) {
        let mut state = rw_write(&self.state, SOURCE, "set");
        self.insert_at(&mut state, key.into(), value, Instant::now());
    }

    /// Current generation; bumped by every [`ListCache::invalidate_all`].
    pub fn generation(&self) -> CacheGeneration {
        CacheGeneration(rw_read(&self.state, SOURCE, "generation").generation)
    }

    /// Store `value` only if no flush happened since `generation` was taken.
    ///
    /// Returns whether the entry was written.
    pub fn set_if_current(
        &self,
        key: impl Into<String>,
        value: Bytes,
        generation: CacheGeneration,
    ) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "set_if_current");
        if state.generation != generation.0 {
            return false;
        }
        self.insert_at(&mut state, key.into(), value, Instant::now());
        true
    }

    /// Drop every entry in one exclusive section.
    pub fn invalidate_all(&self) {
        let mut state = rw_write(&self.state, SOURCE, "invalidate_all");
        let dropped = state.entries.len();
        state.entries.clear();
        state.generation = state.generation.wrapping_add(1);
        drop(state);

        counter!(INVALIDATE_TOTAL).increment(1);
        debug!(dropped, "list cache invalidated");
    }

    /// Remove entries whose TTL has elapsed; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        rw_read(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Bytes> {
        let state = rw_read(&self.state, SOURCE, "get");
        let hit = state
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone());
        drop(state);

        match hit {
            Some(value) => {
                counter!(HIT_TOTAL).increment(1);
                Some(value)
            }
            None => {
                counter!(MISS_TOTAL).increment(1);
                None
            }
        }
    }

    fn insert_at(&self, state: &mut CacheState, key: String, value: Bytes, now: Instant) {
        let entry = CacheEntry {
            value,
            expires_at: now.checked_add(self.ttl),
        };
        state.entries.insert(key, entry);
    }

    #[cfg(test)]
    fn set_at(&self, key: String, value: Bytes, now: Instant) {
        let mut state = rw_write(&self.state, SOURCE, "set");
        self.insert_at(&mut state, key, value, now);
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut state = rw_write(&self.state, SOURCE, "purge_expired");
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        before - state.entries.len()
    }
}
