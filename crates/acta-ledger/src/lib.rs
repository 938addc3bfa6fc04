//! Tally-sheet ledger engine.
//!
//! This crate is the heart of the workspace. It provides:
//! - [`TallyLedger`], the lifecycle engine and sole writer of acta state
//! - History reconstruction as a lazy, single-pass iterator
//! - Deterministic aggregation of results across every acta
//! - Batch seeding with collision-checked random ids
//! - A history auditor that replays version logs against the lifecycle
//!
//! The engine is storage-agnostic: every operation goes through the
//! [`acta_store::EntryStore`] handle the ledger was built with.

pub mod aggregate;
pub mod audit;
pub mod batch;
pub mod config;
pub mod error;
pub mod history;
pub mod lifecycle;

pub use aggregate::{ResultTotals, StatusCounts};
pub use audit::{AuditReport, HistoryAuditor, Violation, ViolationKind};
pub use config::LedgerConfig;
pub use error::{ActaError, ActaResult};
pub use history::{HistoryIter, HistoryRecord};
pub use lifecycle::TallyLedger;
