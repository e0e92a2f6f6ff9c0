//! Stale-while-revalidate cache of aggregated collections.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::{Duration, Instant};

use crate::catalog::QueryKey;
use crate::media::Collection;

/// Result of a cache lookup.
#[derive(Debug)]
pub(crate) enum Lookup {
    /// Entry is within its TTL.
    Fresh(Arc<Collection>),
    /// Entry has expired. `refresh` is true for exactly one caller per expiry,
    /// who is then responsible for starting the background refresh.
    Stale {
        collection: Arc<Collection>,
        refresh: bool,
    },
    Miss,
}

#[derive(Debug)]
struct CacheEntry {
    collection: Arc<Collection>,
    fetched_at: Instant,
    refreshing: bool,
}

/// Collections keyed by query, each with the time it was fetched.
///
/// Holds at most `capacity` entries. Inserting a new key into a full cache
/// evicts the entry fetched longest ago.
#[derive(Debug)]
pub(crate) struct CollectionCache {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<QueryKey, CacheEntry>,
}

impl CollectionCache {
    pub(crate) fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    pub(crate) fn lookup(&mut self, key: &QueryKey) -> Lookup {
        let ttl = self.ttl;
        let Some(entry) = self.entries.get_mut(key) else {
            return Lookup::Miss;
        };

        if entry.fetched_at.elapsed() < ttl {
            return Lookup::Fresh(Arc::clone(&entry.collection));
        }

        let refresh = !entry.refreshing;
        entry.refreshing = true;
        Lookup::Stale {
            collection: Arc::clone(&entry.collection),
            refresh,
        }
    }

    /// Store `collection`. Returns the key evicted to make room, if any.
    pub(crate) fn insert(
        &mut self,
        key: QueryKey,
        collection: Arc<Collection>,
    ) -> Option<QueryKey> {
        let evicted = if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict_oldest()
        } else {
            None
        };

        self.entries.insert(
            key,
            CacheEntry {
                collection,
                fetched_at: Instant::now(),
                refreshing: false,
            },
        );
        evicted
    }

    fn evict_oldest(&mut self) -> Option<QueryKey> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.fetched_at)
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&oldest);
        Some(oldest)
    }

    /// A refresh failed: keep serving the stale entry and let the next lookup retry.
    pub(crate) fn refresh_failed(&mut self, key: &QueryKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.refreshing = false;
        }
    }

    pub(crate) fn remove(&mut self, key: &QueryKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
