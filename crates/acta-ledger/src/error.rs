use acta_store::StoreError;
use acta_types::{ActaStatus, Operation, TransitionError, TypeError};

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum ActaError {
    #[error("acta {0} does not exist")]
    NotFound(String),

    #[error("acta {0} already exists")]
    AlreadyExists(String),

    #[error("cannot {attempted} an acta in status {current}: {reason}")]
    InvalidTransition {
        current: ActaStatus,
        attempted: Operation,
        reason: &'static str,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("store keeps no history for existing acta {0}")]
    HistoryUnavailable(String),

    /// Store failures, propagated unchanged.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid results for acta {id}: {reason}")]
    InvalidResults { id: String, reason: String },

    #[error("store already holds {existing} actas; refusing to seed")]
    AlreadySeeded { existing: usize },

    /// A batch stopped part-way; the first `committed` actas stay written.
    #[error("batch stopped after {committed} committed actas: {source}")]
    BatchIncomplete {
        committed: usize,
        ids: Vec<String>,
        source: Box<ActaError>,
    },

    #[error("no free acta id after {attempts} attempts")]
    IdExhausted { attempts: u32 },

    #[error("aggregate overflow summing {field}")]
    AggregateOverflow { field: &'static str },

    #[error("invalid acta id: {0:?}")]
    InvalidId(String),
}

impl From<TransitionError> for ActaError {
    fn from(err: TransitionError) -> Self {
        Self::InvalidTransition {
            current: err.current,
            attempted: err.attempted,
            reason: err.reason,
        }
    }
}

impl From<TypeError> for ActaError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::Decode(msg) => Self::Decode(msg),
            TypeError::UnknownStatus(code) => Self::Decode(format!("unknown status code {code}")),
            TypeError::Encode(msg) => Self::Encode(msg),
            TypeError::InvalidId(id) => Self::InvalidId(id),
        }
    }
}

/// Result alias for ledger operations.
pub type ActaResult<T> = Result<T, ActaError>;
