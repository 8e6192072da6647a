//! Process-local document cache
//!
//! The cache is an explicit, injectable service rather than a side effect
//! of document construction. Its contract:
//!
//! - `insert_new` populates an entry after a successful INSERT; it refuses
//!   to overwrite an existing entry unless forced, so a stale full-row
//!   insert cannot clobber concurrent cached edits in the same process.
//! - `put` is the write-through after a successful UPDATE.
//! - Queued atomic operations are mirrored into an existing entry before
//!   the physical write completes (optimistic; wrong if the write fails).
//! - `invalidate` is the explicit hook for collaborators that know an
//!   entry went stale.
//!
//! The cache is best-effort and process-local: it is never a source of
//! truth, and there is no cross-process invalidation protocol.

use parking_lot::RwLock;
use std::collections::HashMap;
use veneer_core::FieldMap;

/// Injectable cache contract keyed by document identifier
pub trait DocumentCache: Send + Sync {
    /// Get a copy of the cached field map, if present
    fn get(&self, id: &str) -> Option<FieldMap>;

    /// Check for an entry without copying it
    fn contains(&self, id: &str) -> bool;

    /// Write-through after a successful update
    fn put(&self, id: &str, fields: FieldMap);

    /// Populate after an insert
    ///
    /// Returns false (and leaves the entry alone) when one already exists
    /// and `force` is not set.
    fn insert_new(&self, id: &str, fields: FieldMap, force: bool) -> bool;

    /// Drop an entry
    fn invalidate(&self, id: &str);

    /// Drop every entry
    fn clear(&self);
}

/// Default in-process cache backed by an RwLock'd map
#[derive(Debug, Default)]
pub struct ProcessCache {
    entries: RwLock<HashMap<String, FieldMap>>,
}

impl ProcessCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when no entries are cached
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl DocumentCache for ProcessCache {
    fn get(&self, id: &str) -> Option<FieldMap> {
        self.entries.read().get(id).cloned()
    }

    fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    fn put(&self, id: &str, fields: FieldMap) {
        self.entries.write().insert(id.to_string(), fields);
    }

    fn insert_new(&self, id: &str, fields: FieldMap, force: bool) -> bool {
        let mut entries = self.entries.write();
        if !force && entries.contains_key(id) {
            return false;
        }
        entries.insert(id.to_string(), fields);
        true
    }

    fn invalidate(&self, id: &str) {
        self.entries.write().remove(id);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// A cache that stores nothing, for callers that opt out of caching
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl DocumentCache for NullCache {
    fn get(&self, _id: &str) -> Option<FieldMap> {
        None
    }

    fn contains(&self, _id: &str) -> bool {
        false
    }

    fn put(&self, _id: &str, _fields: FieldMap) {}

    fn insert_new(&self, _id: &str, _fields: FieldMap, _force: bool) -> bool {
        true
    }

    fn invalidate(&self, _id: &str) {}

    fn clear(&self) {}
}
