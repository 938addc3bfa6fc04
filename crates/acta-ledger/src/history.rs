use acta_store::{EntryStore, VersionId, VersionLog, VersionRecord};
use acta_types::{Acta, TemporalAnchor};

use crate::error::{ActaError, ActaResult};

/// One version of an acta as it was committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Snapshot at this version; a placeholder carrying only the id for
    /// deletions.
    pub acta: Acta,
    pub version: VersionId,
    pub timestamp: TemporalAnchor,
    pub is_delete: bool,
}

/// Lazy, single-pass walk over an acta's versions, oldest first.
///
/// Each item is decoded only when it is pulled. A version that fails to
/// decode yields an error for that item and the walk can continue.
#[derive(Debug)]
pub struct HistoryIter {
    id: String,
    log: VersionLog,
}

impl HistoryIter {
    fn new(id: &str, log: VersionLog) -> Self {
        Self {
            id: id.to_string(),
            log,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drain the walk, failing on the first bad version.
    pub fn into_records(self) -> ActaResult<Vec<HistoryRecord>> {
        self.collect()
    }
}

impl Iterator for HistoryIter {
    type Item = ActaResult<HistoryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.log.next()?;
        Some(
            item.map_err(ActaError::from)
                .and_then(|record| decode_record(&self.id, record)),
        )
    }
}

/// Open the history walk for `id`.
pub fn history_of<S: EntryStore + ?Sized>(store: &S, id: &str) -> ActaResult<HistoryIter> {
    Ok(HistoryIter::new(id, version_log(store, id)?))
}

/// Raw version log for `id`.
///
/// A store without a log for an id that currently exists cannot answer
/// the question, which is an error; an id that never existed simply has
/// an empty history.
pub(crate) fn version_log<S: EntryStore + ?Sized>(store: &S, id: &str) -> ActaResult<VersionLog> {
    match store.history_of(id)? {
        Some(log) => Ok(log),
        None if store.contains(id)? => Err(ActaError::HistoryUnavailable(id.to_string())),
        None => Ok(VersionLog::empty()),
    }
}

/// Turn a stored version into a history record.
pub(crate) fn decode_record(id: &str, record: VersionRecord) -> ActaResult<HistoryRecord> {
    let is_delete = record.is_tombstone();

    let acta = if is_delete {
        Acta::placeholder(id)
    } else {
        Acta::from_bytes(record.value.as_deref().unwrap_or_default()).map_err(|e| {
            ActaError::Decode(format!(
                "version {} of acta {id}: {e}",
                record.version.short_id()
            ))
        })?
    };

    Ok(HistoryRecord {
        acta,
        version: record.version,
        timestamp: record.timestamp,
        is_delete,
    })
}

#[cfg(test)]
mod tests {
    use acta_store::InMemoryEntryStore;
    use acta_types::{ActaStatus, ActaTemplate};

    use super::*;

    fn store_with(id: &str) -> InMemoryEntryStore {
        let store = InMemoryEntryStore::default();
        let acta = Acta::new(id, &ActaTemplate::default());
        store.put(id, &acta.to_canonical_bytes().unwrap()).unwrap();
        store
    }

    #[test]
    fn unknown_id_has_empty_history() {
        let store = InMemoryEntryStore::default();
        let history = history_of(&store, "nope").unwrap();
        assert_eq!(history.count(), 0);
    }

    #[test]
    fn tombstone_becomes_placeholder() {
        let store = store_with("E1");
        store.delete("E1").unwrap();

        let records = history_of(&store, "E1").unwrap().into_records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].is_delete);
        assert!(records[1].is_delete);
        assert_eq!(records[1].acta, Acta::placeholder("E1"));
    }

    #[test]
    fn empty_value_counts_as_delete() {
        let store = InMemoryEntryStore::default();
        store.put("E1", b"").unwrap();

        let records = history_of(&store, "E1").unwrap().into_records().unwrap();
        assert!(records[0].is_delete);
        assert_eq!(records[0].acta.id, "E1");
    }

    #[test]
    fn malformed_version_is_reported_not_skipped() {
        let store = store_with("E1");
        store.put("E1", b"{not json").unwrap();
        let mut acta = Acta::new("E1", &ActaTemplate::default());
        acta.status = ActaStatus::Registered;
        store.put("E1", &acta.to_canonical_bytes().unwrap()).unwrap();

        let items: Vec<_> = history_of(&store, "E1").unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(ActaError::Decode(_))));
        assert_eq!(items[2].as_ref().unwrap().acta.status, ActaStatus::Registered);
    }

    #[test]
    fn collecting_fails_on_first_bad_version() {
        let store = store_with("E1");
        store.put("E1", b"[]").unwrap();
        let err = history_of(&store, "E1").unwrap().into_records().unwrap_err();
        assert!(matches!(err, ActaError::Decode(_)));
    }
}
