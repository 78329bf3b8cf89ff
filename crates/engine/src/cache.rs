//! Entity-indexed result cache for matrix queries.
//!
//! Entries are keyed by a deterministic rendering of the query filters and
//! carry the set of account and tool ids they contain. Mutations invalidate
//! by entity id, so only the cached pages that actually show a touched row
//! or column are dropped.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use domain::models::{AssignmentMatrix, MatrixFilters};
use shared::clock::Clock;

use crate::config::CacheConfig;

/// Renders filters into a cache key. Fields are sorted by name so two
/// equivalent queries always share an entry; defaulted fields are included
/// to keep explicit-default and omitted forms identical.
pub fn matrix_cache_key(filters: &MatrixFilters) -> String {
    let mut parts: Vec<String> = vec![
        format!("limit={}", filters.limit),
        format!("page={}", filters.page),
        format!("sortBy={}", filters.sort_by.as_str()),
        format!("sortOrder={}", filters.sort_order.as_str()),
    ];
    if let Some(search) = &filters.search {
        parts.push(format!("search={}", search.to_lowercase()));
    }
    if let Some(account_type) = filters.account_type {
        parts.push(format!("accountType={}", account_type.as_str()));
    }
    if let Some(level) = filters.subscription_level {
        parts.push(format!("subscriptionLevel={}", level.as_str()));
    }
    if let Some(status) = filters.status {
        parts.push(format!("status={}", status.as_str()));
    }
    if let Some(expiration) = filters.expiration_status {
        parts.push(format!("expirationStatus={}", expiration.as_str()));
    }
    parts.sort();
    format!("matrix:{}", parts.join("|"))
}

struct CacheEntry {
    matrix: AssignmentMatrix,
    stored_at: DateTime<Utc>,
    entities: Vec<Uuid>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    by_entity: HashMap<Uuid, HashSet<String>>,
}

fn remove_entry(inner: &mut Inner, key: &str) {
    if let Some(entry) = inner.entries.remove(key) {
        for id in entry.entities {
            if let Some(keys) = inner.by_entity.get_mut(&id) {
                keys.remove(key);
                if keys.is_empty() {
                    inner.by_entity.remove(&id);
                }
            }
        }
    }
}

/// Bounded TTL cache for assembled matrices.
pub struct MatrixCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    inner: RwLock<Inner>,
}

impl MatrixCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            inner: RwLock::new(Inner::default()),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.ttl_secs as i64)
    }

    /// Looks up a fresh entry. The returned matrix is marked as served
    /// from cache. An expired entry is removed on the way out.
    pub fn get(&self, key: &str) -> Option<AssignmentMatrix> {
        let now = self.clock.now();
        {
            let inner = self.inner.read().unwrap();
            match inner.entries.get(key) {
                Some(entry) if now - entry.stored_at < self.ttl() => {
                    let mut matrix = entry.matrix.clone();
                    matrix.from_cache = true;
                    return Some(matrix);
                }
                Some(_) => {}
                None => return None,
            }
        }
        // expired: recheck under the write lock, another thread may have
        // refreshed the entry in between
        let mut inner = self.inner.write().unwrap();
        if let Some(entry) = inner.entries.get(key) {
            if now - entry.stored_at < self.ttl() {
                let mut matrix = entry.matrix.clone();
                matrix.from_cache = true;
                return Some(matrix);
            }
        }
        remove_entry(&mut inner, key);
        None
    }

    /// Stores a matrix under `key`, indexed by the entity ids it shows.
    /// When the cache is full the oldest entry is evicted first.
    pub fn insert(&self, key: String, matrix: &AssignmentMatrix, entities: Vec<Uuid>) {
        let now = self.clock.now();
        let mut inner = self.inner.write().unwrap();

        remove_entry(&mut inner, &key);
        if inner.entries.len() >= self.config.max_entries {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                remove_entry(&mut inner, &oldest);
            }
        }

        for id in &entities {
            inner.by_entity.entry(*id).or_default().insert(key.clone());
        }
        let mut stored = matrix.clone();
        stored.from_cache = false;
        inner.entries.insert(
            key,
            CacheEntry {
                matrix: stored,
                stored_at: now,
                entities,
            },
        );
    }

    /// Drops every entry that shows the given account or tool. Returns the
    /// number of entries removed.
    pub fn invalidate_entity(&self, id: Uuid) -> usize {
        let mut inner = self.inner.write().unwrap();
        let Some(keys) = inner.by_entity.remove(&id) else {
            return 0;
        };
        let removed = keys.len();
        for key in &keys {
            remove_entry(&mut inner, key);
        }
        removed
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.entries.clear();
        inner.by_entity.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
