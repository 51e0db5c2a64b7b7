//! Directory-listing cache.
//!
//! Each entry caches one directory listing: the directory's own [`Node`] plus its children by
//! name. Entries are evicted lazily, by whichever of these fires first on access:
//!
//! - the entry is older than the configured TTL;
//! - the entry was born temporary (node budget exhausted, or caching disabled) and has now
//!   been read once;
//! - the entry has now been read as many times as the configured access ceiling.
//!
//! There is no background sweep. An entry nobody reads again stays in memory until it is
//! replaced or explicitly removed.
//!
//! # Locking
//!
//! The key to entry map is a [`scc::HashMap`], which serializes membership changes per bucket.
//! Each entry additionally carries a [`Mutex`] over its mutable state. Map operations never
//! run while an entry lock is held, so the two levels cannot deadlock, and operations on
//! different keys never contend on an entry lock.
//!
//! Whoever flips an entry's `evicted` flag (under its lock) owns the removal: it unlinks the
//! entry from the map (only if the map still points at that same entry) and releases the
//! entry's share of the node budget. This keeps the budget exact when several callers race to
//! evict the same entry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::CacheKey;
use crate::config::CacheConfig;
use crate::node::Node;
use crate::sync::{Mutex, atomic::AtomicU64, atomic::Ordering, lock};

/// Children of a cached directory, keyed by name within the directory.
pub type Children = BTreeMap<String, Node>;

/// A cached directory listing, as returned by [`EntryCache::get_all`].
///
/// `children` is shared with the cache until the next mutation of the entry, which then
/// copies the map. A `Listing` never observes changes made after it was returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// The listed directory itself.
    pub parent: Node,
    /// Children of the directory, by name.
    pub children: Arc<Children>,
}

struct EntryState {
    access_count: u64,
    evicted: bool,
    parent: Node,
    children: Arc<Children>,
}

struct CacheEntry {
    created: Instant,
    /// Temporary entries are excluded from the node budget and die after one read.
    temporary: bool,
    state: Mutex<EntryState>,
}

/// TTL, budget and access-ceiling governed cache of directory listings.
pub struct EntryCache {
    entries: scc::HashMap<CacheKey, Arc<CacheEntry>>,
    /// Children held by live, non-temporary entries.
    node_count: AtomicU64,
    ttl: Duration,
    max_entries: i64,
    max_access: i64,
}

impl Default for EntryCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl EntryCache {
    /// Creates an empty cache governed by `config`.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: scc::HashMap::new(),
            node_count: AtomicU64::new(0),
            ttl: config.ttl(),
            max_entries: config.max_entries,
            max_access: config.max_access,
        }
    }

    /// Caches the listing of `container:path`, replacing any previous listing for that key.
    ///
    /// The entry is temporary if caching is disabled (access ceiling of zero) or if adding
    /// `children` would bring the node count to the budget or past it. Temporary entries do not
    /// count toward the budget and are served exactly once.
    pub fn add_all(
        &self,
        container: &str,
        path: &str,
        parent: Node,
        children: impl Into<Arc<Children>>,
    ) {
        let children = children.into();
        let count = children.len() as u64;
        let temporary = self.max_access == 0 || !self.reserve(count);

        let entry = Arc::new(CacheEntry {
            created: Instant::now(),
            temporary,
            state: Mutex::new(EntryState {
                access_count: 0,
                evicted: false,
                parent,
                children,
            }),
        });

        let key = CacheKey::new(container, path);
        let replaced = match self.entries.entry_sync(key) {
            scc::hash_map::Entry::Occupied(mut occ) => {
                Some(std::mem::replace(occ.get_mut(), entry))
            }
            scc::hash_map::Entry::Vacant(vac) => {
                vac.insert_entry(entry);
                None
            }
        };

        if let Some(old) = replaced
            && let Some(released) = Self::retire(&old)
        {
            self.release(released);
        }

        debug!(container, path, children = count, temporary, "cached listing");
    }

    /// Returns child `name` of the cached listing of `container:path`.
    ///
    /// This is a raw peek: it neither checks expiry nor counts as an access. Callers use it
    /// when they already know the listing is fresh (see [`peek`](Self::peek)).
    #[must_use]
    pub fn get(&self, container: &str, path: &str, name: &str) -> Option<Node> {
        let entry = self.entry(container, path)?;
        let state = lock(&entry.state);
        if state.evicted {
            return None;
        }
        state.children.get(name).cloned()
    }

    /// Returns the cached listing of `container:path`, counting one access.
    ///
    /// Returns `None` if the listing is missing or expired (an expired listing is evicted).
    /// If this access is the entry's last one (temporary entry, or access ceiling reached),
    /// the listing is still returned and the entry is evicted afterwards.
    #[must_use]
    pub fn get_all(&self, container: &str, path: &str) -> Option<Listing> {
        let key = CacheKey::new(container, path);
        let entry = self.entries.read_sync(&key, |_, v| Arc::clone(v))?;

        let (listing, released) = {
            let mut state = lock(&entry.state);
            if state.evicted {
                return None;
            }
            state.access_count += 1;

            if self.is_expired(&entry) {
                (None, Some(Self::mark_evicted(&entry, &mut state)))
            } else {
                let listing = Listing {
                    parent: state.parent.clone(),
                    children: Arc::clone(&state.children),
                };
                let last_access = entry.temporary || self.ceiling_reached(state.access_count);
                let released = last_access.then(|| Self::mark_evicted(&entry, &mut state));
                (Some(listing), released)
            }
        };

        if let Some(released) = released {
            drop(self.entries.remove_if_sync(&key, |v| Arc::ptr_eq(v, &entry)));
            self.release(released);
            debug!(
                container,
                path,
                expired = listing.is_none(),
                temporary = entry.temporary,
                "evicted listing"
            );
        }

        listing
    }

    /// Returns the parent node of `container:path` if a valid (present and unexpired) listing
    /// is cached.
    ///
    /// Unlike [`get_all`](Self::get_all) this does not count as an access and never evicts,
    /// so it can guard a targeted [`set`](Self::set) without disturbing eviction.
    #[must_use]
    pub fn peek(&self, container: &str, path: &str) -> Option<Node> {
        let entry = self.entry(container, path)?;
        let state = lock(&entry.state);
        if state.evicted || self.is_expired(&entry) {
            return None;
        }
        Some(state.parent.clone())
    }

    /// Inserts or overwrites child `name` in the cached listing of `container:path`.
    ///
    /// Does nothing if no listing is cached. Callers are expected to check with
    /// [`peek`](Self::peek) first.
    pub fn set(&self, container: &str, path: &str, name: &str, node: Node) {
        let Some(entry) = self.entry(container, path) else {
            return;
        };
        let mut state = lock(&entry.state);
        if state.evicted {
            return;
        }
        let added = Arc::make_mut(&mut state.children)
            .insert(name.to_owned(), node)
            .is_none();
        if added && !entry.temporary {
            self.node_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Removes child `name` from the cached listing of `container:path`, if both exist.
    pub fn delete(&self, container: &str, path: &str, name: &str) {
        let Some(entry) = self.entry(container, path) else {
            return;
        };
        let mut state = lock(&entry.state);
        if state.evicted || !state.children.contains_key(name) {
            return;
        }
        Arc::make_mut(&mut state.children).remove(name);
        if !entry.temporary {
            self.release(1);
        }
    }

    /// Removes the cached listing of `container:path` and releases its share of the budget.
    ///
    /// Temporary listings are left alone: they never consumed budget, and they disappear on
    /// their single read anyway.
    pub fn delete_all(&self, container: &str, path: &str) {
        let key = CacheKey::new(container, path);
        let Some(entry) = self.entries.read_sync(&key, |_, v| Arc::clone(v)) else {
            return;
        };
        if entry.temporary {
            return;
        }
        let Some(released) = Self::retire(&entry) else {
            return;
        };
        drop(self.entries.remove_if_sync(&key, |v| Arc::ptr_eq(v, &entry)));
        self.release(released);
        debug!(container, path, released, "dropped listing");
    }

    /// Number of children held by live, non-temporary listings.
    #[must_use]
    pub fn node_count(&self) -> u64 {
        self.node_count.load(Ordering::Relaxed)
    }

    /// Number of cached listings, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no listing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, container: &str, path: &str) -> Option<Arc<CacheEntry>> {
        self.entries
            .read_sync(&CacheKey::new(container, path), |_, v| Arc::clone(v))
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        Instant::now() > entry.created + self.ttl
    }

    fn ceiling_reached(&self, access_count: u64) -> bool {
        u64::try_from(self.max_access).is_ok_and(|ceiling| access_count == ceiling)
    }

    /// Claims `count` nodes of budget. Returns `false`, claiming nothing, if that would reach
    /// the budget.
    fn reserve(&self, count: u64) -> bool {
        let Ok(budget) = u64::try_from(self.max_entries) else {
            self.node_count.fetch_add(count, Ordering::Relaxed);
            return true;
        };
        self.node_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_add(count).filter(|&next| next < budget)
            })
            .is_ok()
    }

    fn release(&self, count: u64) {
        if count == 0 {
            return;
        }
        let _ = self
            .node_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(count))
            });
    }

    /// Marks a still-live entry evicted. Returns the budget it held, or `None` if it was
    /// already evicted.
    fn retire(entry: &CacheEntry) -> Option<u64> {
        let mut state = lock(&entry.state);
        if state.evicted {
            return None;
        }
        Some(Self::mark_evicted(entry, &mut state))
    }

    fn mark_evicted(entry: &CacheEntry, state: &mut EntryState) -> u64 {
        state.evicted = true;
        if entry.temporary {
            0
        } else {
            state.children.len() as u64
        }
    }
}
