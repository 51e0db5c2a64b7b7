//! Caches in front of the remote object store.

/// Directory-listing cache with TTL, node budget and access ceiling.
pub mod entry;
/// Locally-pending mutations that mask remote state.
pub mod overrides;

pub use entry::{Children, EntryCache, Listing};
pub use overrides::OverrideCache;

/// Identifies one directory (for the listing cache) or one path (for the override cache)
/// within a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Container name.
    pub container: String,
    /// Path within the container, e.g. `/photos/2024`.
    pub path: String,
}

impl CacheKey {
    /// Builds a key from borrowed parts.
    #[must_use]
    pub fn new(container: &str, path: &str) -> Self {
        Self {
            container: container.to_owned(),
            path: path.to_owned(),
        }
    }
}

