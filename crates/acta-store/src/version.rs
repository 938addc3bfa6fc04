use std::fmt;

use acta_types::TemporalAnchor;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Identifier of one committed version.
///
/// `seq` is issued from a store-wide counter and orders versions in commit
/// order. `digest` is a BLAKE3 hash over key, sequence and value, so the id
/// also commits to the bytes it names, much like a transaction id.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId {
    seq: u64,
    digest: [u8; 32],
}

impl VersionId {
    /// Derive the id of version `seq` of `key` holding `value`.
    pub fn derive(key: &str, seq: u64, value: Option<&[u8]>) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"acta-version-v1:");
        hasher.update(&(key.len() as u64).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update(&seq.to_le_bytes());
        match value {
            Some(bytes) => {
                hasher.update(b"value:");
                hasher.update(bytes);
            }
            None => {
                hasher.update(b"tombstone");
            }
        }
        Self {
            seq,
            digest: *hasher.finalize().as_bytes(),
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Full hex-encoded digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Short identifier (first 12 hex characters).
    pub fn short_id(&self) -> String {
        hex::encode(&self.digest[..6])
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.seq
            .cmp(&other.seq)
            .then_with(|| self.digest.cmp(&other.digest))
    }
}

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId(#{} {})", self.seq, self.short_id())
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One entry of a key's version log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub key: String,
    /// Stored bytes; `None` for a tombstone.
    pub value: Option<Vec<u8>>,
    pub version: VersionId,
    pub timestamp: TemporalAnchor,
    pub is_delete: bool,
}

impl VersionRecord {
    /// `true` if the digest matches key, sequence and value.
    pub fn verify(&self) -> bool {
        VersionId::derive(&self.key, self.version.seq(), self.value.as_deref()) == self.version
    }

    /// `true` for a deletion marker or a version holding no bytes.
    pub fn is_tombstone(&self) -> bool {
        self.is_delete || self.value.as_deref().map_or(true, <[u8]>::is_empty)
    }
}

/// Current live value of a key together with the version that wrote it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned {
    pub value: Vec<u8>,
    pub version: VersionId,
}

/// Single-pass iterator over a key's version log, oldest first.
///
/// Backends decide how lazily records are produced; consumers must not
/// assume the log can be restarted.
pub struct VersionLog {
    inner: Box<dyn Iterator<Item = StoreResult<VersionRecord>> + Send>,
}

impl VersionLog {
    pub fn new<I>(records: I) -> Self
    where
        I: Iterator<Item = StoreResult<VersionRecord>> + Send + 'static,
    {
        Self {
            inner: Box::new(records),
        }
    }

    /// A log over records already held in memory.
    pub fn from_records(records: Vec<VersionRecord>) -> Self {
        Self::new(records.into_iter().map(Ok))
    }

    pub fn empty() -> Self {
        Self::from_records(Vec::new())
    }
}

impl Iterator for VersionLog {
    type Item = StoreResult<VersionRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl fmt::Debug for VersionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionLog").finish_non_exhaustive()
    }
}
