use std::sync::Arc;

use crate::error::StoreResult;
use crate::version::{VersionId, VersionLog, Versioned};

/// Versioned key-value store backing the tally-sheet ledger.
///
/// All implementations must satisfy these invariants:
/// - Every write appends a version; nothing already written is modified.
/// - A read issued after a write on the same handle observes that write.
/// - `put_if` commits only if the key's live version is still `expected`.
/// - Tombstoned keys read as absent and are skipped by range scans, but
///   their version log is kept.
/// - Timeouts and retries are the backend's concern; errors are returned,
///   never swallowed.
pub trait EntryStore: Send + Sync {
    /// Read the live value of `key` and the version that wrote it.
    ///
    /// Returns `Ok(None)` if the key was never written or is tombstoned.
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>>;

    /// Read the live value of `key`.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.get_versioned(key)?.map(|v| v.value))
    }

    /// Commit a new version of `key` unconditionally.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<VersionId>;

    /// Commit a new version of `key` if its live version is `expected`.
    ///
    /// `expected = None` requires the key to be absent or tombstoned.
    /// Fails with `StoreError::Conflict` otherwise.
    fn put_if(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<&VersionId>,
    ) -> StoreResult<VersionId>;

    /// Append a tombstone for `key`.
    ///
    /// Fails with `StoreError::KeyNotFound` if the key has no live value.
    fn delete(&self, key: &str) -> StoreResult<VersionId>;

    /// Live `(key, value)` pairs with `start <= key < end`, in key order.
    ///
    /// An empty bound is open, so `range_scan("", "")` is a full scan.
    fn range_scan(&self, start: &str, end: &str) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Version log of `key`, oldest first.
    ///
    /// Returns `Ok(None)` if the backend keeps no log for the key.
    fn history_of(&self, key: &str) -> StoreResult<Option<VersionLog>>;

    /// `true` if `key` currently holds a live value.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get_versioned(key)?.is_some())
    }
}

impl<T: EntryStore + ?Sized> EntryStore for &T {
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        (**self).get_versioned(key)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<VersionId> {
        (**self).put(key, value)
    }

    fn put_if(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<&VersionId>,
    ) -> StoreResult<VersionId> {
        (**self).put_if(key, value, expected)
    }

    fn delete(&self, key: &str) -> StoreResult<VersionId> {
        (**self).delete(key)
    }

    fn range_scan(&self, start: &str, end: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        (**self).range_scan(start, end)
    }

    fn history_of(&self, key: &str) -> StoreResult<Option<VersionLog>> {
        (**self).history_of(key)
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        (**self).contains(key)
    }
}

impl<T: EntryStore + ?Sized> EntryStore for Arc<T> {
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        (**self).get_versioned(key)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<VersionId> {
        (**self).put(key, value)
    }

    fn put_if(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<&VersionId>,
    ) -> StoreResult<VersionId> {
        (**self).put_if(key, value, expected)
    }

    fn delete(&self, key: &str) -> StoreResult<VersionId> {
        (**self).delete(key)
    }

    fn range_scan(&self, start: &str, end: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        (**self).range_scan(start, end)
    }

    fn history_of(&self, key: &str) -> StoreResult<Option<VersionLog>> {
        (**self).history_of(key)
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        (**self).contains(key)
    }
}
