//! Process-wide canonical object cache.
//!
//! Short-lived cache in front of the entity store, shared across
//! concurrently handled activities. Every read hands out an independent
//! clone so one activity's in-progress mutation can never be observed
//! by another before it is committed to the store. The cache starts
//! empty at process start and is never persisted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossfed_db::entities::object;
use tracing::debug;

/// Default entry lifetime: long enough to span one processing burst.
const DEFAULT_TTL: Duration = Duration::from_secs(90);

/// Default maximum number of cached objects.
const DEFAULT_CAPACITY: usize = 5000;

struct Entry {
    obj: object::Model,
    stored_at: Instant,
}

/// Shared, copy-on-read object cache.
#[derive(Clone)]
pub struct ObjectCache {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ObjectCache {
    /// Create a cache with the default lifetime and capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    /// Create a cache with a custom entry lifetime and capacity.
    #[must_use]
    pub fn with_ttl(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            capacity,
        }
    }

    /// Fetch a copy of a cached object. Expired entries are dropped on
    /// access.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<object::Model> {
        let mut entries = lock(&self.inner);
        match entries.get(id) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.obj.clone()),
            Some(_) => {
                debug!(id = %id, "evicting expired cache entry");
                entries.remove(id);
                None
            }
            None => None,
        }
    }

    /// Cache a copy of an object, evicting expired entries (and, at
    /// capacity, the oldest entry) first.
    pub fn insert(&self, obj: &object::Model) {
        let mut entries = lock(&self.inner);
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        if entries.len() >= self.capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(id, _)| id.clone())
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            obj.id.clone(),
            Entry {
                obj: obj.clone(),
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop one entry.
    pub fn remove(&self, id: &str) {
        lock(&self.inner).remove(id);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        lock(&self.inner).clear();
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }
}
