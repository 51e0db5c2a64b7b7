//! Synchronization primitives.
//!
//! Shims between loom and std synchronization primitives, so the cache's locking can be model
//! checked under `cfg(loom)`.
pub mod atomic;

#[cfg(loom)]
pub use loom::sync::{Mutex, MutexGuard};

#[cfg(not(loom))]
pub use std::sync::{Mutex, MutexGuard};

/// Lock `mutex`, recovering the guard if a previous holder panicked.
///
/// Cache state stays structurally valid across a panic (every mutation is a single map or
/// counter update), so poisoning carries no information worth propagating.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
