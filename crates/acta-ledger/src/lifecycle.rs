use acta_store::{EntryStore, StoreError, VersionId};
use acta_types::{id as acta_id, Acta, ActaTemplate, Operation, VoteCounts};
use tracing::{debug, info, warn};

use crate::aggregate::{self, ResultTotals};
use crate::audit::{AuditReport, HistoryAuditor};
use crate::config::LedgerConfig;
use crate::error::{ActaError, ActaResult};
use crate::history::{self, HistoryIter, HistoryRecord};

/// Lifecycle engine for tally sheets.
///
/// Every mutation reads the current acta and its version right before
/// writing, then commits with a compare-and-set on that version. A
/// concurrent writer therefore surfaces as a store conflict instead of a
/// lost update. Nothing is cached between operations.
#[derive(Debug)]
pub struct TallyLedger<S> {
    store: S,
    config: LedgerConfig,
}

impl<S: EntryStore> TallyLedger<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Create acta `id` from `template` in status `Created`.
    pub fn create(&self, id: &str, template: &ActaTemplate) -> ActaResult<Acta> {
        acta_id::validate(id)?;
        if self.store.contains(id)? {
            warn!(id, "create rejected: acta already exists");
            return Err(ActaError::AlreadyExists(id.to_string()));
        }

        let acta = Acta::new(id, template);
        let bytes = acta.to_canonical_bytes()?;
        let version = self.store.put_if(id, &bytes, None).map_err(|e| match e {
            StoreError::Conflict { .. } => {
                warn!(id, "create rejected: acta created concurrently");
                ActaError::AlreadyExists(id.to_string())
            }
            other => ActaError::from(other),
        })?;
        info!(id, version = %version.short_id(), "acta created");
        Ok(acta)
    }

    /// Create an acta from a full entry, keeping only its identity.
    pub fn create_entry(&self, acta: &Acta) -> ActaResult<Acta> {
        self.create(&acta.id, &acta.template())
    }

    /// Attach the scanned image reference: `Created` -> `Registered`.
    pub fn register_image(&self, id: &str, image_ref: &str) -> ActaResult<Acta> {
        self.transition(id, Operation::RegisterImage, |acta| {
            acta.image_ref = image_ref.to_string();
            Ok(())
        })
    }

    /// Record vote counts: `Registered` -> `ResultsRecorded`.
    pub fn register_results(&self, id: &str, votes: VoteCounts) -> ActaResult<Acta> {
        let strict = self.config.strict_totals;
        self.transition(id, Operation::RegisterResults, |acta| {
            if strict {
                check_totals(acta, &votes)?;
            }
            acta.set_votes(votes);
            Ok(())
        })
    }

    /// Invalidate a registered acta, clearing its image and votes.
    pub fn void(&self, id: &str) -> ActaResult<Acta> {
        self.transition(id, Operation::Void, |acta| {
            acta.clear_results();
            Ok(())
        })
    }

    /// Current state of acta `id`.
    pub fn get_entry(&self, id: &str) -> ActaResult<Acta> {
        let (acta, version) = self.load(id)?;
        debug!(id, version = %version.short_id(), status = %acta.status, "acta read");
        Ok(acta)
    }

    /// Every live acta, in key order.
    pub fn list_all(&self) -> ActaResult<Vec<Acta>> {
        let actas = self
            .store
            .range_scan("", "")?
            .into_iter()
            .map(|(_, bytes)| Acta::from_bytes(&bytes).map_err(ActaError::from))
            .collect::<ActaResult<Vec<_>>>()?;
        debug!(count = actas.len(), "actas listed");
        Ok(actas)
    }

    /// `true` if `id` holds a live acta, whatever its status.
    pub fn exists(&self, id: &str) -> ActaResult<bool> {
        let exists = self.store.contains(id)?;
        debug!(id, exists, "existence checked");
        Ok(exists)
    }

    /// Lazy walk over every version of `id`, oldest first.
    pub fn history_of(&self, id: &str) -> ActaResult<HistoryIter> {
        history::history_of(&self.store, id)
    }

    /// Full history of `id`, failing on the first bad version.
    pub fn history(&self, id: &str) -> ActaResult<Vec<HistoryRecord>> {
        self.history_of(id)?.into_records()
    }

    /// Totals across every live acta.
    pub fn aggregate(&self) -> ActaResult<ResultTotals> {
        aggregate::aggregate(&self.store)
    }

    /// Check the version log of `id` against the lifecycle.
    pub fn audit(&self, id: &str) -> ActaResult<AuditReport> {
        HistoryAuditor::audit_acta(&self.store, id)
    }

    /// Audit every live acta.
    pub fn audit_all(&self) -> ActaResult<Vec<AuditReport>> {
        HistoryAuditor::audit_all(&self.store)
    }

    fn load(&self, id: &str) -> ActaResult<(Acta, VersionId)> {
        let current = self
            .store
            .get_versioned(id)?
            .ok_or_else(|| ActaError::NotFound(id.to_string()))?;
        let acta = Acta::from_bytes(&current.value)?;
        Ok((acta, current.version))
    }

    /// Apply `op` to the stored acta and commit it against the version read.
    fn transition<F>(&self, id: &str, op: Operation, apply: F) -> ActaResult<Acta>
    where
        F: FnOnce(&mut Acta) -> ActaResult<()>,
    {
        let (mut acta, version) = self.load(id).inspect_err(|e| {
            warn!(id, operation = %op, error = %e, "transition rejected");
        })?;

        let next = acta.status.next(op).map_err(|e| {
            warn!(id, operation = %op, status = %acta.status, reason = e.reason, "transition rejected");
            ActaError::from(e)
        })?;

        apply(&mut acta).inspect_err(|e| {
            warn!(id, operation = %op, error = %e, "transition rejected");
        })?;
        acta.status = next;

        let bytes = acta.to_canonical_bytes()?;
        let committed = self.store.put_if(id, &bytes, Some(&version))?;
        info!(
            id,
            operation = %op,
            status = %acta.status,
            version = %committed.short_id(),
            "acta updated"
        );
        Ok(acta)
    }
}

fn check_totals(acta: &Acta, votes: &VoteCounts) -> ActaResult<()> {
    let reject = |reason: String| ActaError::InvalidResults {
        id: acta.id.clone(),
        reason,
    };

    let cast = votes.ballots_cast();
    if u64::from(votes.total) != cast {
        return Err(reject(format!(
            "total {} differs from the {cast} ballots counted",
            votes.total
        )));
    }
    if acta.registered_voters > 0 && votes.total > acta.registered_voters {
        return Err(reject(format!(
            "total {} exceeds {} registered voters",
            votes.total, acta.registered_voters
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use acta_store::{InMemoryEntryStore, StoreResult, VersionLog, Versioned};
    use acta_types::ActaStatus;

    use super::*;

    fn template() -> ActaTemplate {
        ActaTemplate {
            cda: 1,
            cargo: 1,
            provincia: 9,
            canton: 2,
            parroquia: 14,
            junta: 3,
            registered_voters: 300,
        }
    }

    fn ledger() -> TallyLedger<InMemoryEntryStore> {
        TallyLedger::new(InMemoryEntryStore::default())
    }

    fn registered(ledger: &TallyLedger<InMemoryEntryStore>, id: &str) {
        ledger.create(id, &template()).unwrap();
        ledger.register_image(id, "cidABC").unwrap();
    }

    #[test]
    fn create_then_get_round_trips_identity() {
        let ledger = ledger();
        ledger.create("E1", &template()).unwrap();

        let acta = ledger.get_entry("E1").unwrap();
        assert_eq!(acta.template(), template());
        assert_eq!(acta.status, ActaStatus::Created);
        assert!(acta.image_ref.is_empty());
        assert!(acta.votes().is_zero());
        assert!(ledger.exists("E1").unwrap());
    }

    #[test]
    fn create_rejects_duplicates() {
        let ledger = ledger();
        ledger.create("E1", &template()).unwrap();
        let err = ledger.create("E1", &ActaTemplate::default()).unwrap_err();
        assert!(matches!(err, ActaError::AlreadyExists(id) if id == "E1"));
        assert_eq!(ledger.get_entry("E1").unwrap().template(), template());
    }

    #[test]
    fn create_rejects_unusable_ids() {
        let ledger = ledger();
        assert!(matches!(
            ledger.create("", &template()),
            Err(ActaError::InvalidId(_))
        ));
        assert!(matches!(
            ledger.create("E\n1", &template()),
            Err(ActaError::InvalidId(_))
        ));
    }

    #[test]
    fn create_entry_discards_non_identity_fields() {
        let ledger = ledger();
        let mut acta = Acta::new("E1", &template());
        acta.status = ActaStatus::ResultsRecorded;
        acta.image_ref = "cidX".into();
        acta.set_votes(VoteCounts::new(1, 1, 1, 1, 4));

        let created = ledger.create_entry(&acta).unwrap();
        assert_eq!(created, Acta::new("E1", &template()));
    }

    #[test]
    fn full_lifecycle() {
        let ledger = ledger();
        registered(&ledger, "E1");
        assert_eq!(ledger.get_entry("E1").unwrap().image_ref, "cidABC");

        let votes = VoteCounts::new(5, 2, 10, 12, 27);
        let acta = ledger.register_results("E1", votes).unwrap();
        assert_eq!(acta.status, ActaStatus::ResultsRecorded);
        assert_eq!(ledger.get_entry("E1").unwrap().votes(), votes);

        let voided = ledger.void("E1").unwrap();
        assert_eq!(voided.status, ActaStatus::Voided);
        assert!(voided.image_ref.is_empty());
        assert!(voided.votes().is_zero());
        assert_eq!(voided.registered_voters, 300);
    }

    #[test]
    fn results_require_registered_status() {
        let ledger = ledger();
        ledger.create("E1", &template()).unwrap();
        let err = ledger
            .register_results("E1", VoteCounts::new(1, 0, 0, 0, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            ActaError::InvalidTransition {
                current: ActaStatus::Created,
                attempted: Operation::RegisterResults,
                ..
            }
        ));
    }

    #[test]
    fn void_on_created_leaves_acta_unchanged() {
        let ledger = ledger();
        ledger.create("E1", &template()).unwrap();
        let before = ledger.get_entry("E1").unwrap();

        let err = ledger.void("E1").unwrap_err();
        assert!(matches!(
            err,
            ActaError::InvalidTransition { reason: "not yet registered", .. }
        ));
        assert_eq!(ledger.get_entry("E1").unwrap(), before);
        assert_eq!(ledger.history("E1").unwrap().len(), 1);
    }

    #[test]
    fn register_image_twice_is_rejected() {
        let ledger = ledger();
        registered(&ledger, "E1");
        let err = ledger.register_image("E1", "cidOther").unwrap_err();
        assert!(matches!(
            err,
            ActaError::InvalidTransition { reason: "already registered", .. }
        ));
        assert_eq!(ledger.get_entry("E1").unwrap().image_ref, "cidABC");
    }

    #[test]
    fn mutations_on_missing_acta_are_not_found() {
        let ledger = ledger();
        assert!(matches!(ledger.get_entry("E9"), Err(ActaError::NotFound(_))));
        assert!(matches!(
            ledger.register_image("E9", "cid"),
            Err(ActaError::NotFound(_))
        ));
        assert!(matches!(ledger.void("E9"), Err(ActaError::NotFound(_))));
    }

    #[test]
    fn tombstoned_acta_reads_as_missing() {
        let ledger = ledger();
        ledger.create("E1", &template()).unwrap();
        ledger.store().delete("E1").unwrap();
        assert!(!ledger.exists("E1").unwrap());
        assert!(matches!(ledger.get_entry("E1"), Err(ActaError::NotFound(_))));
        ledger.create("E1", &template()).unwrap();
        assert_eq!(ledger.history("E1").unwrap().len(), 3);
    }

    #[test]
    fn zero_results_are_valid() {
        let ledger = ledger();
        registered(&ledger, "E1");
        let acta = ledger.register_results("E1", VoteCounts::ZERO).unwrap();
        assert_eq!(acta.status, ActaStatus::ResultsRecorded);
    }

    #[test]
    fn strict_totals_checks_sum_and_roll() {
        let config = LedgerConfig {
            strict_totals: true,
            ..LedgerConfig::default()
        };
        let ledger = TallyLedger::with_config(InMemoryEntryStore::default(), config);
        registered(&ledger, "E1");

        let err = ledger
            .register_results("E1", VoteCounts::new(5, 2, 10, 12, 30))
            .unwrap_err();
        assert!(matches!(err, ActaError::InvalidResults { .. }));

        let err = ledger
            .register_results("E1", VoteCounts::new(100, 100, 100, 100, 400))
            .unwrap_err();
        assert!(matches!(err, ActaError::InvalidResults { .. }));
        assert_eq!(ledger.get_entry("E1").unwrap().status, ActaStatus::Registered);

        ledger
            .register_results("E1", VoteCounts::new(5, 2, 10, 12, 29))
            .unwrap();
    }

    #[test]
    fn lenient_totals_accept_inconsistent_sum() {
        let ledger = ledger();
        registered(&ledger, "E1");
        ledger
            .register_results("E1", VoteCounts::new(5, 2, 10, 12, 27))
            .unwrap();
    }

    #[test]
    fn list_all_is_key_ordered() {
        let ledger = ledger();
        for id in ["c", "a", "b"] {
            ledger.create(id, &template()).unwrap();
        }
        let ids: Vec<_> = ledger.list_all().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn empty_current_value_reads_as_missing() {
        let ledger = ledger();
        ledger.create("E1", &template()).unwrap();
        ledger.create("E2", &template()).unwrap();
        ledger.store().put("E1", b"").unwrap();

        assert!(!ledger.exists("E1").unwrap());
        assert!(matches!(ledger.get_entry("E1"), Err(ActaError::NotFound(_))));
        assert!(matches!(ledger.void("E1"), Err(ActaError::NotFound(_))));
        assert_eq!(ledger.list_all().unwrap().len(), 1);
        assert_eq!(ledger.aggregate().unwrap().actas, 1);

        let history = ledger.history("E1").unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[1].is_delete);
    }

    /// Lets a rival create the key between the existence check and the
    /// conditional write.
    struct LateRival(InMemoryEntryStore);

    impl EntryStore for LateRival {
        fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
            self.0.get_versioned(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> StoreResult<VersionId> {
            self.0.put(key, value)
        }

        fn put_if(
            &self,
            key: &str,
            value: &[u8],
            expected: Option<&VersionId>,
        ) -> StoreResult<VersionId> {
            if expected.is_none() {
                let rival = Acta::new(key, &ActaTemplate::default());
                self.0.put(key, &rival.to_canonical_bytes().unwrap())?;
            }
            self.0.put_if(key, value, expected)
        }

        fn delete(&self, key: &str) -> StoreResult<VersionId> {
            self.0.delete(key)
        }

        fn range_scan(&self, start: &str, end: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
            self.0.range_scan(start, end)
        }

        fn history_of(&self, key: &str) -> StoreResult<Option<VersionLog>> {
            self.0.history_of(key)
        }
    }

    #[test]
    fn create_losing_a_race_is_already_exists() {
        let ledger = TallyLedger::new(LateRival(InMemoryEntryStore::default()));
        let err = ledger.create("E1", &template()).unwrap_err();
        assert!(matches!(err, ActaError::AlreadyExists(id) if id == "E1"));
        assert_eq!(ledger.get_entry("E1").unwrap().template(), ActaTemplate::default());
        assert_eq!(ledger.history("E1").unwrap().len(), 1);
    }

    #[test]
    fn undecodable_current_value_is_a_decode_error() {
        let ledger = ledger();
        ledger.store().put("E1", b"garbage").unwrap();
        assert!(matches!(ledger.get_entry("E1"), Err(ActaError::Decode(_))));
        assert!(matches!(ledger.list_all(), Err(ActaError::Decode(_))));
    }
}
