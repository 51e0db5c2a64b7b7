//! swift-fs caching core.
//!
//! The pieces a FUSE adapter over an OpenStack Swift style object store needs to keep
//! directory listings fast: a TTL and budget governed listing cache, an override cache for
//! locally-pending mutations, and a worker pool that enriches listing entries with per-object
//! metadata.

/// Listing and override caches.
pub mod cache;
pub mod config;
pub mod lister;
/// Filesystem node model.
pub mod node;
pub mod session;
pub mod store;
mod sync;

pub use cache::{EntryCache, Listing, OverrideCache};
pub use config::Config;
pub use lister::{Lister, ListerError};
pub use node::{Node, ObjectDescriptor};
pub use session::{Session, SessionError};
pub use store::{ObjectStore, StoreError};
