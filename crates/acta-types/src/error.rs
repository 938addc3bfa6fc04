use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("malformed acta bytes: {0}")]
    Decode(String),

    #[error("failed to encode acta: {0}")]
    Encode(String),

    #[error("unknown status code: {0}")]
    UnknownStatus(u8),

    #[error("invalid acta id: {0:?}")]
    InvalidId(String),
}
