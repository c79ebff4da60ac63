//! TTL cache for built graphs
//!
//! Entries are keyed by graph level plus the ids of the entities the graph
//! was built from, and stamped with the injected clock on insert. A read
//! returns the graph only while it is younger than the cache's TTL; expired
//! entries stay in the map until the next [`GraphCache::sweep`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::clock::{Clock, elapsed_between};
use crate::graph::{Graph, GraphLevel};

/// Level plus the input entity ids, in input order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    level: GraphLevel,
    ids: Vec<String>,
}

impl CacheKey {
    pub fn new<I, S>(level: GraphLevel, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            level,
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn level(&self) -> GraphLevel {
        self.level
    }

    pub fn mentions(&self, id: &str) -> bool {
        self.ids.iter().any(|candidate| candidate == id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.level, self.ids.join(","))
    }
}

#[derive(Debug)]
struct CacheEntry {
    graph: Arc<Graph>,
    inserted_at: DateTime<Utc>,
}

pub struct GraphCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl GraphCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    // A panic while holding the lock cannot leave an entry half-written, so
    // poisoned locks are safe to keep using.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        elapsed_between(entry.inserted_at, now) < self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Graph>> {
        let now = self.clock.now();
        let entries = self.read();

        match entries.get(key) {
            Some(entry) if self.is_fresh(entry, now) => {
                trace!(%key, "cache hit");
                Some(Arc::clone(&entry.graph))
            }
            Some(_) => {
                trace!(%key, "cache entry expired");
                None
            }
            None => {
                trace!(%key, "cache miss");
                None
            }
        }
    }

    pub fn insert(&self, key: CacheKey, graph: Arc<Graph>) {
        let inserted_at = self.clock.now();
        self.write().insert(key, CacheEntry { graph, inserted_at });
    }

    /// Returns whether an entry was removed
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.write().remove(key).is_some();
        if removed {
            debug!(%key, "cache entry invalidated");
        }
        removed
    }

    /// Drop every entry built from the entity `id`
    pub fn invalidate_entity(&self, id: &str) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, _| !key.mentions(id));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(entity = id, removed, "cache entries invalidated");
        }
        removed
    }

    /// Evict expired entries; returns how many were removed
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| elapsed_between(entry.inserted_at, now) < self.ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, ttl_secs = self.ttl.as_secs(), "cache sweep");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
