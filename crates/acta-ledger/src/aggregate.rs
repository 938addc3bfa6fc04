use acta_store::EntryStore;
use acta_types::{Acta, ActaStatus};
use serde::Serialize;
use tracing::debug;

use crate::error::{ActaError, ActaResult};

/// Number of actas in each status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub created: u64,
    pub registered: u64,
    pub results_recorded: u64,
    pub voided: u64,
}

impl StatusCounts {
    pub fn get(&self, status: ActaStatus) -> u64 {
        match status {
            ActaStatus::Created => self.created,
            ActaStatus::Registered => self.registered,
            ActaStatus::ResultsRecorded => self.results_recorded,
            ActaStatus::Voided => self.voided,
        }
    }

    fn slot(&mut self, status: ActaStatus) -> &mut u64 {
        match status {
            ActaStatus::Created => &mut self.created,
            ActaStatus::Registered => &mut self.registered,
            ActaStatus::ResultsRecorded => &mut self.results_recorded,
            ActaStatus::Voided => &mut self.voided,
        }
    }
}

/// Vote totals summed over a set of actas.
///
/// Every acta contributes regardless of status. Actas that never recorded
/// results, or were voided, carry zero votes and add nothing but their
/// registered voters. Sums are 64-bit and checked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResultTotals {
    pub registered_voters: u64,
    pub blank: u64,
    pub spoiled: u64,
    pub candidate1: u64,
    pub candidate2: u64,
    pub total: u64,
    /// Actas folded into these totals.
    pub actas: u64,
    pub by_status: StatusCounts,
}

impl ResultTotals {
    /// Sum `actas` in order.
    pub fn from_actas<'a, I>(actas: I) -> ActaResult<Self>
    where
        I: IntoIterator<Item = &'a Acta>,
    {
        let mut totals = Self::default();
        for acta in actas {
            totals.add(acta)?;
        }
        Ok(totals)
    }

    /// Fold one acta into the totals.
    ///
    /// On overflow the totals are left as they were.
    pub fn add(&mut self, acta: &Acta) -> ActaResult<()> {
        let mut next = self.clone();
        next.registered_voters = checked(
            next.registered_voters,
            acta.registered_voters.into(),
            "registered voters",
        )?;
        next.blank = checked(next.blank, acta.blank_votes.into(), "blank votes")?;
        next.spoiled = checked(next.spoiled, acta.spoiled_votes.into(), "spoiled votes")?;
        next.candidate1 = checked(
            next.candidate1,
            acta.candidate1_votes.into(),
            "candidate 1 votes",
        )?;
        next.candidate2 = checked(
            next.candidate2,
            acta.candidate2_votes.into(),
            "candidate 2 votes",
        )?;
        next.total = checked(next.total, acta.total_votes.into(), "total votes")?;
        next.actas = checked(next.actas, 1, "acta count")?;
        let slot = next.by_status.slot(acta.status);
        *slot = checked(*slot, 1, "status count")?;
        *self = next;
        Ok(())
    }

    /// Combine partial totals, e.g. from separate key ranges.
    pub fn merge(&mut self, other: &ResultTotals) -> ActaResult<()> {
        let mut next = self.clone();
        next.registered_voters = checked(
            next.registered_voters,
            other.registered_voters,
            "registered voters",
        )?;
        next.blank = checked(next.blank, other.blank, "blank votes")?;
        next.spoiled = checked(next.spoiled, other.spoiled, "spoiled votes")?;
        next.candidate1 = checked(next.candidate1, other.candidate1, "candidate 1 votes")?;
        next.candidate2 = checked(next.candidate2, other.candidate2, "candidate 2 votes")?;
        next.total = checked(next.total, other.total, "total votes")?;
        next.actas = checked(next.actas, other.actas, "acta count")?;
        for status in ActaStatus::ALL {
            let slot = next.by_status.slot(status);
            *slot = checked(*slot, other.by_status.get(status), "status count")?;
        }
        *self = next;
        Ok(())
    }
}

fn checked(acc: u64, value: u64, field: &'static str) -> ActaResult<u64> {
    acc.checked_add(value)
        .ok_or(ActaError::AggregateOverflow { field })
}

/// Totals over every live acta in `store`.
pub fn aggregate<S: EntryStore + ?Sized>(store: &S) -> ActaResult<ResultTotals> {
    let mut totals = ResultTotals::default();
    for (_, bytes) in store.range_scan("", "")? {
        totals.add(&Acta::from_bytes(&bytes)?)?;
    }
    debug!(actas = totals.actas, total = totals.total, "results aggregated");
    Ok(totals)
}
