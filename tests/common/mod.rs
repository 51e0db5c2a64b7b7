#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use swift_fs::cache::Children;
use swift_fs::node::{Headers, ObjectDescriptor};
use swift_fs::{Node, ObjectStore, StoreError};

#[derive(Default)]
struct Inner {
    objects: Mutex<HashMap<(String, String), (ObjectDescriptor, Headers)>>,
    listings: Mutex<HashMap<(String, String), Vec<ObjectDescriptor>>>,
    failing: Mutex<HashSet<String>>,
    fetched: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    list_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// An in-memory object store that records every request it serves.
#[derive(Clone, Default)]
pub struct MockStore {
    inner: Arc<Inner>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the metadata `fetch_metadata` returns for `container/name`.
    pub fn put_object(&self, container: &str, name: &str, bytes: u64, headers: Headers) {
        let descriptor = ObjectDescriptor {
            bytes,
            content_type: "application/octet-stream".to_owned(),
            etag: Some(format!("etag-{name}")),
            ..ObjectDescriptor::named(name)
        };
        self.inner
            .objects
            .lock()
            .unwrap()
            .insert((container.to_owned(), name.to_owned()), (descriptor, headers));
    }

    /// Registers the result of listing `container` under `prefix`.
    pub fn put_listing(&self, container: &str, prefix: &str, entries: Vec<ObjectDescriptor>) {
        self.inner
            .listings
            .lock()
            .unwrap()
            .insert((container.to_owned(), prefix.to_owned()), entries);
    }

    /// Makes every metadata request for `name` fail.
    pub fn fail_object(&self, name: &str) {
        self.inner.failing.lock().unwrap().insert(name.to_owned());
    }

    /// Delays every metadata request by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = Some(delay);
    }

    /// Object names passed to `fetch_metadata`, in request order.
    pub fn fetched(&self) -> Vec<String> {
        self.inner.fetched.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::SeqCst)
    }

    /// Highest number of metadata requests observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MockStore {
    async fn fetch_metadata(
        &self,
        container: &str,
        object: &str,
    ) -> Result<(ObjectDescriptor, Headers), StoreError> {
        self.inner.fetched.lock().unwrap().push(object.to_owned());

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.inner.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.inner.failing.lock().unwrap().contains(object) {
            return Err(StoreError::Status {
                status: 503,
                container: container.to_owned(),
                object: object.to_owned(),
            });
        }

        self.inner
            .objects
            .lock()
            .unwrap()
            .get(&(container.to_owned(), object.to_owned()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                container: container.to_owned(),
                object: object.to_owned(),
            })
    }

    async fn list(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectDescriptor>, StoreError> {
        self.inner.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listings
            .lock()
            .unwrap()
            .get(&(container.to_owned(), prefix.to_owned()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                container: container.to_owned(),
                object: prefix.to_owned(),
            })
    }
}

/// An object placeholder named `name` in `container`.
pub fn object(container: &str, name: &str) -> Node {
    Node::object(container, ObjectDescriptor::named(name))
}

/// A directory placeholder named `name` in `container`.
pub fn dir(container: &str, name: &str) -> Node {
    Node::directory(container, ObjectDescriptor::named(name))
}

/// `n` object children named `f0`, `f1`, ... in `container`.
pub fn children(container: &str, n: usize) -> Children {
    (0..n)
        .map(|i| {
            let name = format!("f{i}");
            let node = object(container, &name);
            (name, node)
        })
        .collect::<BTreeMap<_, _>>()
}
