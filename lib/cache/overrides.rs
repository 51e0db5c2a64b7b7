//! Locally-pending mutations.
//!
//! When the filesystem creates or rewrites an object, the remote store may not reflect the
//! change for a while (listings are eventually consistent). The override cache records the
//! locally-known node for that path so lookups trust it over both the listing cache and the
//! store, until the filesystem layer confirms the remote side caught up and removes it.
//!
//! Entries never expire. The map is internally synchronized, so a shared reference can be used
//! from any number of tasks. Sequences of calls (check, then add) are not atomic as a whole;
//! callers that need that must serialize them.

use crate::cache::CacheKey;
use crate::node::Node;

/// Map of `(container, path)` to the node that locally overrides it.
#[derive(Default)]
pub struct OverrideCache {
    changes: scc::HashMap<CacheKey, Node>,
}

impl OverrideCache {
    /// Creates an empty override cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `node` as the authoritative state of `container:path`, replacing any previous
    /// override.
    pub fn add(&self, container: &str, path: &str, node: Node) {
        match self.changes.entry_sync(CacheKey::new(container, path)) {
            scc::hash_map::Entry::Occupied(mut occ) => {
                *occ.get_mut() = node;
            }
            scc::hash_map::Entry::Vacant(vac) => {
                vac.insert_entry(node);
            }
        }
    }

    /// Returns `true` if `container:path` is overridden.
    #[must_use]
    pub fn exists(&self, container: &str, path: &str) -> bool {
        self.changes
            .read_sync(&CacheKey::new(container, path), |_, _| ())
            .is_some()
    }

    /// Returns the overriding node for `container:path`.
    #[must_use]
    pub fn get(&self, container: &str, path: &str) -> Option<Node> {
        self.changes
            .read_sync(&CacheKey::new(container, path), |_, node| node.clone())
    }

    /// Drops the override for `container:path`, returning it if present.
    pub fn remove(&self, container: &str, path: &str) -> Option<Node> {
        self.changes
            .remove_sync(&CacheKey::new(container, path))
            .map(|(_, node)| node)
    }

    /// Number of pending overrides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` if nothing is overridden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
