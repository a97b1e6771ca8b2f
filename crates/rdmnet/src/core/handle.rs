// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide handle manager (spec.md §5, §9 "Global singletons").
//!
//! One [`HandleTable`] per entity kind (clients, connections, LLRP
//! managers, LLRP targets) backs every opaque handle the public API
//! surface hands out. Lock order is always handle-map lock, then
//! instance lock (never the reverse), and nested acquisition of two
//! instance locks is forbidden — cross-instance interactions either drop
//! one lock before taking another or go through a lock-free message
//! drop (see [`crate::core::rt::scheduler`]).

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Sentinel returned by nothing — no live handle is ever equal to this.
pub const INVALID_HANDLE: u32 = 0;

/// Resolves integer handles to live, lock-guarded instances of `T`.
///
/// Public API functions take the table's read lock to resolve a handle;
/// `create`/`destroy` take the write lock. Handles are never reused while
/// any live entry could still reference the old value, and the counter
/// skips the `0` sentinel (spec.md §8, "Handle uniqueness").
pub struct HandleTable<T> {
    next: AtomicU32,
    entries: RwLock<HashMap<u32, Arc<Mutex<T>>>>,
}

impl<T> HandleTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a fresh handle and take ownership of `value`. Always
    /// distinct from every currently-live handle and from
    /// [`INVALID_HANDLE`].
    pub fn create(&self, value: T) -> u32 {
        let mut entries = self.entries.write();
        loop {
            let candidate = self.next.fetch_add(1, Ordering::Relaxed);
            if candidate == INVALID_HANDLE {
                continue;
            }
            if let std::collections::hash_map::Entry::Vacant(slot) = entries.entry(candidate) {
                slot.insert(Arc::new(Mutex::new(value)));
                return candidate;
            }
            // Extremely unlikely collision after a u32 wraparound; the
            // atomic counter already advanced, so just retry.
        }
    }

    /// Resolve a handle to its instance lock, without removing it.
    #[must_use]
    pub fn get(&self, handle: u32) -> Option<Arc<Mutex<T>>> {
        if handle == INVALID_HANDLE {
            return None;
        }
        self.entries.read().get(&handle).cloned()
    }

    /// `true` if `handle` currently resolves to a live instance.
    #[must_use]
    pub fn contains(&self, handle: u32) -> bool {
        handle != INVALID_HANDLE && self.entries.read().contains_key(&handle)
    }

    /// Remove and return a handle's instance. Callers must ensure no
    /// in-flight callback still references the handle before dropping
    /// the returned `Arc` (spec.md §5, "Cancellation & timeouts").
    pub fn remove(&self, handle: u32) -> Option<Arc<Mutex<T>>> {
        self.entries.write().remove(&handle)
    }

    /// Number of live handles. Used by tests and admin introspection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_nonzero() {
        let table: HandleTable<u32> = HandleTable::new();
        let mut seen = std::collections::HashSet::new();
        for i in 0..100 {
            let h = table.create(i);
            assert_ne!(h, INVALID_HANDLE);
            assert!(seen.insert(h), "handle {h} reused");
        }
    }

    #[test]
    fn get_after_remove_is_none() {
        let table: HandleTable<&'static str> = HandleTable::new();
        let h = table.create("alive");
        assert!(table.get(h).is_some());
        table.remove(h);
        assert!(table.get(h).is_none());
        assert!(!table.contains(h));
    }

    #[test]
    fn invalid_handle_never_resolves() {
        let table: HandleTable<u8> = HandleTable::new();
        assert!(table.get(INVALID_HANDLE).is_none());
    }
}
