use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use acta_types::TemporalAnchor;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::EntryStore;
use crate::version::{VersionId, VersionLog, VersionRecord, Versioned};

/// Version logs keyed by entry key, shared by every backend.
///
/// Backends compute the next record with [`VersionIndex::prepare`], make it
/// durable however they need to, and only then [`VersionIndex::apply`] it,
/// so a failed write never leaves the index ahead of the backing medium.
#[derive(Debug, Default)]
pub(crate) struct VersionIndex {
    logs: BTreeMap<String, Vec<VersionRecord>>,
    last_seq: u64,
    last_anchor: Option<TemporalAnchor>,
}

impl VersionIndex {
    /// Latest record of `key` unless it is a tombstone or empty.
    pub(crate) fn live(&self, key: &str) -> Option<&VersionRecord> {
        self.logs
            .get(key)
            .and_then(|log| log.last())
            .filter(|record| !record.is_tombstone())
    }

    pub(crate) fn versioned(&self, key: &str) -> Option<Versioned> {
        self.live(key).map(|record| Versioned {
            value: record.value.clone().unwrap_or_default(),
            version: record.version.clone(),
        })
    }

    pub(crate) fn prepare(&self, key: &str, value: Option<&[u8]>, node_id: u16) -> VersionRecord {
        let seq = self.last_seq + 1;
        VersionRecord {
            key: key.to_string(),
            value: value.map(<[u8]>::to_vec),
            version: VersionId::derive(key, seq, value),
            timestamp: TemporalAnchor::tick(self.last_anchor.as_ref(), node_id),
            is_delete: value.is_none(),
        }
    }

    pub(crate) fn apply(&mut self, record: VersionRecord) {
        self.last_seq = self.last_seq.max(record.version.seq());
        if self
            .last_anchor
            .map_or(true, |last| record.timestamp.is_after(&last))
        {
            self.last_anchor = Some(record.timestamp);
        }
        self.logs.entry(record.key.clone()).or_default().push(record);
    }

    pub(crate) fn check_expected(&self, key: &str, expected: Option<&VersionId>) -> StoreResult<()> {
        let current = self.live(key).map(|record| &record.version);
        if current == expected {
            return Ok(());
        }
        Err(StoreError::Conflict {
            key: key.to_string(),
            expected: expected.map_or_else(|| "absent".to_string(), VersionId::to_hex),
            found: current.map_or_else(|| "absent".to_string(), VersionId::to_hex),
        })
    }

    pub(crate) fn require_live(&self, key: &str) -> StoreResult<()> {
        match self.live(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::KeyNotFound(key.to_string())),
        }
    }

    pub(crate) fn scan(&self, start: &str, end: &str) -> Vec<(String, Vec<u8>)> {
        if !start.is_empty() && !end.is_empty() && start > end {
            return Vec::new();
        }
        let lower = if start.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start)
        };
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };

        self.logs
            .range::<str, _>((lower, upper))
            .filter_map(|(key, log)| {
                let last = log.last()?;
                if last.is_tombstone() {
                    return None;
                }
                Some((key.clone(), last.value.clone().unwrap_or_default()))
            })
            .collect()
    }

    pub(crate) fn log(&self, key: &str) -> Option<Vec<VersionRecord>> {
        self.logs.get(key).cloned()
    }

    pub(crate) fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub(crate) fn version_count(&self) -> usize {
        self.logs.values().map(Vec::len).sum()
    }
}

/// In-memory entry store for tests, local demos, and embedding.
///
/// All data lives behind a `RwLock` and is lost when the store is dropped.
#[derive(Debug)]
pub struct InMemoryEntryStore {
    node_id: u16,
    inner: RwLock<VersionIndex>,
}

impl InMemoryEntryStore {
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id,
            inner: RwLock::new(VersionIndex::default()),
        }
    }

    /// Total number of versions across all keys, tombstones included.
    pub fn version_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.version_count())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, VersionIndex>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("entry store read lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, VersionIndex>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("entry store write lock poisoned".into()))
    }

    fn commit(&self, index: &mut VersionIndex, key: &str, value: Option<&[u8]>) -> VersionId {
        let record = index.prepare(key, value, self.node_id);
        let version = record.version.clone();
        debug!(key, seq = version.seq(), tombstone = value.is_none(), "version committed");
        index.apply(record);
        version
    }
}

impl Default for InMemoryEntryStore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl EntryStore for InMemoryEntryStore {
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        Ok(self.read()?.versioned(key))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<VersionId> {
        let mut index = self.write()?;
        Ok(self.commit(&mut index, key, Some(value)))
    }

    fn put_if(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<&VersionId>,
    ) -> StoreResult<VersionId> {
        let mut index = self.write()?;
        index.check_expected(key, expected)?;
        Ok(self.commit(&mut index, key, Some(value)))
    }

    fn delete(&self, key: &str) -> StoreResult<VersionId> {
        let mut index = self.write()?;
        index.require_live(key)?;
        Ok(self.commit(&mut index, key, None))
    }

    fn range_scan(&self, start: &str, end: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        Ok(self.read()?.scan(start, end))
    }

    fn history_of(&self, key: &str) -> StoreResult<Option<VersionLog>> {
        Ok(self.read()?.log(key).map(VersionLog::from_records))
    }
}
