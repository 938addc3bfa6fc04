//! Foundation types for the tally-sheet ledger.
//!
//! Every other crate in the workspace depends on `acta-types`. It owns the
//! shape of a tally sheet ("acta"), the closed status lifecycle, and the
//! canonical byte encoding written to the ledger.
//!
//! # Key Types
//!
//! - [`Acta`]: one physical tally sheet as stored in the ledger
//! - [`ActaTemplate`]: identity fields used to seed a new acta
//! - [`ActaStatus`]: closed lifecycle enum with exhaustive transitions
//! - [`Operation`]: the mutating operations the lifecycle accepts
//! - [`VoteCounts`]: the five cast-vote fields recorded with results
//! - [`TemporalAnchor`]: Hybrid Logical Clock timestamp for versions

pub mod acta;
pub mod error;
pub mod id;
pub mod status;
pub mod temporal;

pub use acta::{Acta, ActaTemplate, VoteCounts};
pub use error::TypeError;
pub use status::{ActaStatus, Operation, TransitionError};
pub use temporal::TemporalAnchor;
