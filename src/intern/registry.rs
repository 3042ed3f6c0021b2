//! Weak-value interning registry.
//!
//! A [`Registry`] maps normalized construction keys to weakly-held instances.
//! Lookup-or-construct runs inside a DashMap entry, which holds the shard's
//! write lock, so at most one live instance exists per key even when several
//! threads race on the same arguments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use super::key::InternKey;

/// Counters for one registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Constructions answered by an existing live instance.
    pub hits: u64,
    /// Constructions that allocated a new instance.
    pub misses: u64,
    /// Constructions with unhashable arguments (never memoized).
    pub bypassed: u64,
    /// Entries whose instance is still alive.
    pub live: usize,
}

impl RegistryStats {
    /// Human-readable effectivity line.
    pub fn summary(&self) -> String {
        let total = self.hits + self.misses;
        if total == 0 {
            "not used".to_string()
        } else {
            format!(
                "effectivity {}% ({} hits, {} misses)",
                (100 * self.hits) / total,
                self.hits,
                self.misses
            )
        }
    }
}

/// Interning store for values of type `V`.
pub struct Registry<V> {
    name: &'static str,
    map: DashMap<InternKey, Weak<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    bypassed: AtomicU64,
}

impl<V> std::fmt::Debug for Registry<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("entries", &self.map.len())
            .finish()
    }
}

impl<V> Registry<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            map: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            bypassed: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Return the live instance for `key`, or build, store and return a new one.
    ///
    /// `build` receives the key it is stored under (`None` when bypassing),
    /// so the value can unregister itself when dropped. `build` must not
    /// intern into this same registry.
    pub fn intern_with<F>(&self, key: Option<InternKey>, build: F) -> Arc<V>
    where
        F: FnOnce(Option<InternKey>) -> V,
    {
        let Some(key) = key else {
            self.bypassed.fetch_add(1, Ordering::Relaxed);
            return Arc::new(build(None));
        };
        match self.map.entry(key) {
            Entry::Occupied(mut e) => {
                if let Some(live) = e.get().upgrade() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return live;
                }
                log::trace!("{}: replacing expired entry", self.name);
                let value = Arc::new(build(Some(e.key().clone())));
                e.insert(Arc::downgrade(&value));
                self.misses.fetch_add(1, Ordering::Relaxed);
                value
            }
            Entry::Vacant(e) => {
                let value = Arc::new(build(Some(e.key().clone())));
                e.insert(Arc::downgrade(&value));
                self.misses.fetch_add(1, Ordering::Relaxed);
                value
            }
        }
    }

    /// Live instance for `key`, if any.
    pub fn get(&self, key: &InternKey) -> Option<Arc<V>> {
        self.map.get(key).and_then(|w| w.upgrade())
    }

    /// Drop the entry for `key` if its instance is gone.
    ///
    /// An entry that was already replaced by a fresh live instance is kept.
    pub fn forget(&self, key: &InternKey) {
        if self
            .map
            .remove_if(key, |_, w| w.strong_count() == 0)
            .is_some()
        {
            log::trace!("{}: expired entry removed", self.name);
        }
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn purge(&self) -> usize {
        let before = self.map.len();
        self.map.retain(|_, w| w.strong_count() > 0);
        let removed = before.saturating_sub(self.map.len());
        if removed > 0 {
            log::trace!("{}: purged {removed} expired entries", self.name);
        }
        removed
    }

    /// Number of entries whose instance is alive.
    pub fn live(&self) -> usize {
        self.map.iter().filter(|e| e.value().strong_count() > 0).count()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            live: self.live(),
        }
    }
}
