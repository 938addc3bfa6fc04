use std::fmt;

use acta_store::{EntryStore, VersionId};
use acta_types::{Acta, ActaStatus, Operation};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ActaResult;
use crate::history::{decode_record, version_log};

/// Result of auditing one acta's version log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub id: String,
    pub versions: u64,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    /// Returns `true` if every check passed.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A version that breaks the lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub seq: u64,
    /// Short form of the offending version id.
    pub version: String,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// A live trajectory starts in a status other than `Created`.
    NotCreatedFirst,
    IllegalTransition,
    /// Id, location codes or registered voters changed.
    IdentityChanged,
    VotesOutsideResults,
    VersionOrder,
    Undecodable,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotCreatedFirst => "not-created-first",
            Self::IllegalTransition => "illegal-transition",
            Self::IdentityChanged => "identity-changed",
            Self::VotesOutsideResults => "votes-outside-results",
            Self::VersionOrder => "version-order",
            Self::Undecodable => "undecodable",
        };
        f.write_str(name)
    }
}

/// Replays version logs against the lifecycle rules.
pub struct HistoryAuditor;

impl HistoryAuditor {
    /// Audit every version ever written for `id`.
    ///
    /// All violations are collected; only store failures abort the audit.
    /// A deletion ends the live trajectory, and a later re-creation must
    /// start again at `Created`.
    pub fn audit_acta<S: EntryStore + ?Sized>(store: &S, id: &str) -> ActaResult<AuditReport> {
        let mut report = AuditReport {
            id: id.to_string(),
            versions: 0,
            violations: Vec::new(),
        };
        let mut previous: Option<Acta> = None;
        let mut last_version: Option<VersionId> = None;

        for item in version_log(store, id)? {
            let record = item?;
            report.versions += 1;
            let version = record.version.clone();
            let mut flag = |kind: ViolationKind, description: String| {
                report.violations.push(Violation {
                    seq: version.seq(),
                    version: version.short_id(),
                    kind,
                    description,
                });
            };

            if let Some(last) = &last_version {
                if version <= *last {
                    flag(
                        ViolationKind::VersionOrder,
                        format!("seq {} does not follow seq {}", version.seq(), last.seq()),
                    );
                }
            }

            let decoded = match decode_record(id, record) {
                Ok(decoded) => decoded,
                Err(e) => {
                    flag(ViolationKind::Undecodable, e.to_string());
                    last_version = Some(version);
                    continue;
                }
            };
            if decoded.is_delete {
                previous = None;
                last_version = Some(version);
                continue;
            }
            let acta = decoded.acta;

            if acta.id != id {
                flag(
                    ViolationKind::IdentityChanged,
                    format!("stored id {:?} differs from key", acta.id),
                );
            }
            if !acta.votes_consistent_with_status() {
                flag(
                    ViolationKind::VotesOutsideResults,
                    format!("non-zero votes in status {}", acta.status),
                );
            }

            match &previous {
                None if acta.status != ActaStatus::Created => flag(
                    ViolationKind::NotCreatedFirst,
                    format!("trajectory starts in status {}", acta.status),
                ),
                None => {}
                Some(prev) => {
                    if prev.template() != acta.template() {
                        flag(
                            ViolationKind::IdentityChanged,
                            "location codes or registered voters changed".into(),
                        );
                    }
                    if !is_successor(prev.status, acta.status) {
                        flag(
                            ViolationKind::IllegalTransition,
                            format!("{} -> {}", prev.status, acta.status),
                        );
                    }
                }
            }

            previous = Some(acta);
            last_version = Some(version);
        }

        if report.is_clean() {
            debug!(id, versions = report.versions, "acta audit clean");
        } else {
            warn!(
                id,
                versions = report.versions,
                violations = report.violations.len(),
                "acta audit found violations"
            );
        }
        Ok(report)
    }

    /// Audit every live acta in key order.
    pub fn audit_all<S: EntryStore + ?Sized>(store: &S) -> ActaResult<Vec<AuditReport>> {
        store
            .range_scan("", "")?
            .into_iter()
            .map(|(id, _)| Self::audit_acta(store, &id))
            .collect()
    }
}

/// `true` if a single lifecycle operation leads from `from` to `to`.
fn is_successor(from: ActaStatus, to: ActaStatus) -> bool {
    [
        Operation::RegisterImage,
        Operation::RegisterResults,
        Operation::Void,
    ]
    .into_iter()
    .any(|op| from.next(op) == Ok(to))
}

#[cfg(test)]
mod tests {
    use acta_store::InMemoryEntryStore;
    use acta_types::{ActaTemplate, VoteCounts};

    use super::*;
    use crate::lifecycle::TallyLedger;

    fn template() -> ActaTemplate {
        ActaTemplate {
            junta: 4,
            registered_voters: 120,
            ..ActaTemplate::default()
        }
    }

    fn forge(store: &InMemoryEntryStore, acta: &Acta) {
        store.put(&acta.id, &acta.to_canonical_bytes().unwrap()).unwrap();
    }

    fn kinds(report: &AuditReport) -> Vec<ViolationKind> {
        report.violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn ledger_written_history_is_clean() {
        let ledger = TallyLedger::new(InMemoryEntryStore::default());
        ledger.create("E1", &template()).unwrap();
        ledger.register_image("E1", "cidABC").unwrap();
        ledger
            .register_results("E1", VoteCounts::new(1, 2, 3, 4, 10))
            .unwrap();
        ledger.void("E1").unwrap();

        let report = HistoryAuditor::audit_acta(ledger.store(), "E1").unwrap();
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.versions, 4);
    }

    #[test]
    fn unknown_id_audits_empty() {
        let store = InMemoryEntryStore::default();
        let report = HistoryAuditor::audit_acta(&store, "nope").unwrap();
        assert!(report.is_clean());
        assert_eq!(report.versions, 0);
    }

    #[test]
    fn skipped_registration_is_flagged() {
        let store = InMemoryEntryStore::default();
        let mut acta = Acta::new("E1", &template());
        forge(&store, &acta);
        acta.status = ActaStatus::ResultsRecorded;
        acta.set_votes(VoteCounts::new(0, 0, 5, 5, 10));
        forge(&store, &acta);

        let report = HistoryAuditor::audit_acta(&store, "E1").unwrap();
        assert_eq!(kinds(&report), [ViolationKind::IllegalTransition]);
        assert_eq!(report.violations[0].seq, 2);
        assert_eq!(report.violations[0].description, "created -> results-recorded");
    }

    #[test]
    fn collects_every_violation() {
        let store = InMemoryEntryStore::default();
        let mut acta = Acta::new("E1", &template());
        acta.status = ActaStatus::Registered;
        acta.set_votes(VoteCounts::new(1, 0, 0, 0, 1));
        forge(&store, &acta);
        acta.junta = 99;
        forge(&store, &acta);

        let report = HistoryAuditor::audit_acta(&store, "E1").unwrap();
        assert_eq!(
            kinds(&report),
            [
                ViolationKind::VotesOutsideResults,
                ViolationKind::NotCreatedFirst,
                ViolationKind::VotesOutsideResults,
                ViolationKind::IdentityChanged,
                ViolationKind::IllegalTransition,
            ]
        );
    }

    #[test]
    fn recreation_after_delete_restarts_trajectory() {
        let ledger = TallyLedger::new(InMemoryEntryStore::default());
        ledger.create("E1", &template()).unwrap();
        ledger.register_image("E1", "cidABC").unwrap();
        ledger.store().delete("E1").unwrap();
        ledger.create("E1", &ActaTemplate::default()).unwrap();

        let report = HistoryAuditor::audit_acta(ledger.store(), "E1").unwrap();
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.versions, 4);
    }

    #[test]
    fn undecodable_version_is_flagged_and_audit_continues() {
        let store = InMemoryEntryStore::default();
        forge(&store, &Acta::new("E1", &template()));
        store.put("E1", b"not json").unwrap();

        let report = HistoryAuditor::audit_acta(&store, "E1").unwrap();
        assert_eq!(kinds(&report), [ViolationKind::Undecodable]);
        assert_eq!(report.versions, 2);
    }

    #[test]
    fn audit_all_covers_live_actas() {
        let ledger = TallyLedger::new(InMemoryEntryStore::default());
        ledger.create("a", &template()).unwrap();
        ledger.create("b", &template()).unwrap();
        let mut forged = ledger.get_entry("b").unwrap();
        forged.status = ActaStatus::Voided;
        forge(ledger.store(), &forged);

        let reports = HistoryAuditor::audit_all(ledger.store()).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].is_clean());
        assert_eq!(kinds(&reports[1]), [ViolationKind::IllegalTransition]);
    }
}
