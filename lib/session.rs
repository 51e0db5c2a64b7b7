//! Per-mount caching session.
//!
//! A [`Session`] owns the listing cache, the override cache, the metadata lister and the store
//! client for one mounted namespace. The filesystem adapter holds one session and routes
//! `readdir`, `lookup` and mutation bookkeeping through it; nothing here is global, so tests
//! simply build a fresh session.

use std::sync::Arc;

use futures::StreamExt as _;
use futures::stream::FuturesUnordered;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, instrument};

use crate::cache::{Children, EntryCache, Listing, OverrideCache};
use crate::config::Config;
use crate::lister::{Lister, ListerError};
use crate::node::{Node, ObjectDescriptor};
use crate::store::{ObjectStore, StoreError};

/// Errors returned by [`Session`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configuration is not usable.
    #[error("invalid configuration: {0:?}")]
    InvalidConfig(Vec<String>),

    /// The metadata lister refused work.
    #[error(transparent)]
    Lister(#[from] ListerError),

    /// The object store failed to list a directory.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Caches and workers serving one mounted namespace.
pub struct Session<S: ObjectStore> {
    store: S,
    entries: EntryCache,
    overrides: OverrideCache,
    lister: Lister<S>,
}

impl<S: ObjectStore> Session<S> {
    /// Builds a session from `config` and starts its lister.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &Config, store: S) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::InvalidConfig)?;

        let mut lister = Lister::new(store.clone(), config.lister.concurrency);
        lister.start()?;

        Ok(Self {
            store,
            entries: EntryCache::new(&config.cache),
            overrides: OverrideCache::new(),
            lister,
        })
    }

    /// The directory-listing cache.
    #[must_use]
    pub fn entries(&self) -> &EntryCache {
        &self.entries
    }

    /// The pending-mutation cache.
    #[must_use]
    pub fn overrides(&self) -> &OverrideCache {
        &self.overrides
    }

    /// The metadata lister.
    #[must_use]
    pub fn lister(&self) -> &Lister<S> {
        &self.lister
    }

    /// Lists directory `path` of `container`.
    ///
    /// Served from the listing cache when a valid listing is cached. Otherwise the store is
    /// listed, every child is enriched through the lister, pending overrides are applied, and
    /// the result is cached before being returned.
    #[instrument(skip(self))]
    pub async fn read_dir(&self, container: &str, path: &str) -> Result<Listing, SessionError> {
        if let Some(listing) = self.entries.get_all(container, path) {
            debug!(children = listing.children.len(), "listing cache hit");
            return Ok(listing);
        }

        let prefix = store_prefix(path);
        let listed = self.store.list(container, &prefix).await?;

        let mut pending = FuturesUnordered::new();
        for descriptor in listed {
            let Some(name) = child_name(&prefix, &descriptor.name) else {
                continue;
            };
            let name = name.to_owned();
            let placeholder = Node::from_listing(container, descriptor);
            let (tx, rx) = oneshot::channel();
            self.lister.add_task(placeholder.clone(), tx)?;
            pending.push(async move {
                // A closed channel means the task was lost; fall back to the listing data.
                let node = rx.await.unwrap_or(placeholder);
                (name, node)
            });
        }

        let mut children = Children::new();
        while let Some((name, node)) = pending.next().await {
            let node = self
                .overrides
                .get(container, &join_path(path, &name))
                .unwrap_or(node);
            children.insert(name, node);
        }

        let parent = Node::directory(
            container,
            ObjectDescriptor::named(prefix.trim_end_matches('/')),
        );
        let children = Arc::new(children);
        self.entries
            .add_all(container, path, parent.clone(), Arc::clone(&children));
        debug!(children = children.len(), "listing cache filled");

        Ok(Listing { parent, children })
    }

    /// Resolves child `name` of directory `dir` without contacting the store.
    ///
    /// A pending override wins. Otherwise the child is taken from a valid cached listing of
    /// `dir`, without counting as an access to that listing.
    #[must_use]
    pub fn lookup(&self, container: &str, dir: &str, name: &str) -> Option<Node> {
        if let Some(node) = self.overrides.get(container, &join_path(dir, name)) {
            return Some(node);
        }
        self.entries.peek(container, dir)?;
        self.entries.get(container, dir, name)
    }

    /// Records a local creation or rewrite of child `name` of `dir`.
    ///
    /// The node overrides remote state until [`confirm`](Self::confirm) is called, and is
    /// written into the cached listing of `dir` if one is valid.
    pub fn record_mutation(&self, container: &str, dir: &str, name: &str, node: Node) {
        self.overrides
            .add(container, &join_path(dir, name), node.clone());
        if self.entries.peek(container, dir).is_some() {
            self.entries.set(container, dir, name, node);
        }
    }

    /// Records a local removal of child `name` of `dir`.
    pub fn record_removal(&self, container: &str, dir: &str, name: &str) {
        self.overrides.remove(container, &join_path(dir, name));
        self.entries.delete(container, dir, name);
    }

    /// Drops the override for child `name` of `dir` once the store reflects it.
    pub fn confirm(&self, container: &str, dir: &str, name: &str) -> Option<Node> {
        self.overrides.remove(container, &join_path(dir, name))
    }

    /// Drops the cached listing of `dir`.
    pub fn invalidate(&self, container: &str, dir: &str) {
        self.entries.delete_all(container, dir);
    }
}

/// Joins directory `dir` and child `name` into the child's path.
///
/// ```
/// use swift_fs::session::join_path;
///
/// assert_eq!(join_path("/", "a"), "/a");
/// assert_eq!(join_path("/a/b", "c"), "/a/b/c");
/// ```
#[must_use]
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    format!("{dir}/{name}")
}

/// Turns a directory path into the object-name prefix used to list it.
///
/// ```
/// use swift_fs::session::store_prefix;
///
/// assert_eq!(store_prefix("/"), "");
/// assert_eq!(store_prefix("/a/b"), "a/b/");
/// assert_eq!(store_prefix("a/b/"), "a/b/");
/// ```
#[must_use]
pub fn store_prefix(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Name of a listed object relative to the listed prefix, or `None` for the directory's own
/// marker object and for names outside the prefix.
fn child_name<'a>(prefix: &str, object_name: &'a str) -> Option<&'a str> {
    let name = object_name.strip_prefix(prefix)?.trim_end_matches('/');
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_name_strips_prefix_and_delimiter() {
        assert_eq!(child_name("a/", "a/b.txt"), Some("b.txt"));
        assert_eq!(child_name("a/", "a/sub/"), Some("sub"));
        assert_eq!(child_name("", "top"), Some("top"));
        assert_eq!(child_name("a/", "a/"), None);
        assert_eq!(child_name("a/", "b/c"), None);
    }
}
