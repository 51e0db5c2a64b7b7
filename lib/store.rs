//! The remote object store seam.
//!
//! The core never talks to the network itself. The filesystem layer hands it an
//! [`ObjectStore`] implementation (an authenticated Swift client in production, an in-memory
//! map in tests) and the lister and session call through it.

use thiserror::Error;

use crate::node::{Headers, ObjectDescriptor};

/// Errors surfaced by an [`ObjectStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The container or object does not exist.
    #[error("object not found: {container}/{object}")]
    NotFound {
        /// Container that was queried.
        container: String,
        /// Object that was queried. Empty for container-level requests.
        object: String,
    },

    /// The store answered with an unexpected HTTP status.
    #[error("object store returned status {status} for {container}/{object}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Container that was queried.
        container: String,
        /// Object that was queried. Empty for container-level requests.
        object: String,
    },

    /// The request could not be completed.
    #[error("object store transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// A client for the remote object store.
///
/// Implementations must be cheap to clone and safe to call from many lister workers at once.
pub trait ObjectStore: Clone + Send + Sync + 'static {
    /// Fetch the descriptor and response headers of one object (a `HEAD` request).
    fn fetch_metadata(
        &self,
        container: &str,
        object: &str,
    ) -> impl Future<Output = Result<(ObjectDescriptor, Headers), StoreError>> + Send;

    /// List the objects of `container` directly under `prefix`, using `/` as the delimiter.
    ///
    /// Pseudo-directories are reported as descriptors whose name ends in `/`.
    fn list(
        &self,
        container: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<ObjectDescriptor>, StoreError>> + Send;
}
