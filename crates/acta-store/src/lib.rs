//! Versioned key-value storage for the tally-sheet ledger.
//!
//! The ledger engine never talks to a concrete database. It consumes the
//! [`EntryStore`] trait: a key-value store where every write appends a new
//! version to the key's log instead of overwriting it.
//!
//! # Storage Backends
//!
//! - [`InMemoryEntryStore`]: `BTreeMap`-based store for tests and embedding
//! - [`FileEntryStore`]: CRC-framed write-ahead log, rebuilt into memory on open
//!
//! # Design Rules
//!
//! 1. Version logs are append-only; deletes append a tombstone.
//! 2. Version ids are issued from a store-wide monotonically increasing sequence.
//! 3. `put_if` is the only conditional write; it detects concurrent writers.
//! 4. The store never interprets values; it is a pure byte store.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;
pub mod version;

pub use error::{StoreError, StoreResult};
pub use file::{FileEntryStore, FileStoreConfig, SyncMode};
pub use memory::InMemoryEntryStore;
pub use traits::EntryStore;
pub use version::{VersionId, VersionLog, VersionRecord, Versioned};
