#![allow(clippy::unwrap_used, missing_docs)]

mod common;

use std::sync::Arc;

use common::object;
use swift_fs::OverrideCache;
use tokio::task::JoinSet;

#[tokio::test]
async fn add_get_remove() {
    let cache = OverrideCache::new();
    assert!(!cache.exists("c1", "/a"));
    assert!(cache.get("c1", "/a").is_none());

    cache.add("c1", "/a", object("c1", "a"));
    assert!(cache.exists("c1", "/a"));
    assert_eq!(cache.get("c1", "/a"), Some(object("c1", "a")));
    assert!(!cache.exists("c2", "/a"), "keys are scoped by container");

    assert_eq!(cache.remove("c1", "/a"), Some(object("c1", "a")));
    assert!(!cache.exists("c1", "/a"));
    assert!(cache.remove("c1", "/a").is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn add_replaces_previous_override() {
    let cache = OverrideCache::new();
    cache.add("c1", "/a", object("c1", "v1"));
    cache.add("c1", "/a", object("c1", "v2"));
    assert_eq!(cache.get("c1", "/a"), Some(object("c1", "v2")));
    assert_eq!(cache.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_between_tasks() {
    let cache = Arc::new(OverrideCache::new());

    let mut set = JoinSet::new();
    for i in 0..100 {
        let cache = Arc::clone(&cache);
        set.spawn(async move {
            let path = format!("/f{i}");
            cache.add("c1", &path, object("c1", &path));
            if i % 2 == 0 {
                cache.remove("c1", &path);
            }
        });
    }
    while set.join_next().await.is_some() {}

    assert_eq!(cache.len(), 50);
    for i in (1..100).step_by(2) {
        assert!(cache.exists("c1", &format!("/f{i}")), "odd path {i} missing");
    }
}
