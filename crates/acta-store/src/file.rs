use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::VersionIndex;
use crate::traits::EntryStore;
use crate::version::{VersionId, VersionLog, VersionRecord, Versioned};

/// Flush/sync strategy for the version log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering.
    #[default]
    OsDefault,
}

/// Configuration for [`FileEntryStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Writer id stamped into every version timestamp.
    pub node_id: u16,
    pub sync_mode: SyncMode,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

#[derive(Debug)]
struct LogWriter {
    file: File,
    offset: u64,
}

/// Entry store persisted as a single append-only log file.
///
/// On-disk format, one frame per committed version:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized VersionRecord)]
/// ```
///
/// The whole log is replayed into memory on open. A torn frame at the tail
/// (crash mid-write) is truncated so later appends stay recoverable; any
/// other damaged frame makes [`FileEntryStore::open`] fail with
/// [`StoreError::Corrupt`] and the file is left untouched.
#[derive(Debug)]
pub struct FileEntryStore {
    path: PathBuf,
    config: FileStoreConfig,
    index: RwLock<VersionIndex>,
    writer: Mutex<LogWriter>,
}

impl FileEntryStore {
    /// Open (or create) the log at `path` and rebuild the version index.
    pub fn open(path: &Path, config: FileStoreConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (index, valid_len) = recover(path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "truncating torn tail of entry log"
            );
            file.set_len(valid_len)?;
        }

        info!(
            path = %path.display(),
            versions = index.version_count(),
            last_seq = index.last_seq(),
            "entry log opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            config,
            index: RwLock::new(index),
            writer: Mutex::new(LogWriter {
                file,
                offset: valid_len,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the valid log in bytes.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock_writer()?.offset)
    }

    /// Total number of versions across all keys, tombstones included.
    pub fn version_count(&self) -> StoreResult<usize> {
        Ok(self.read_index()?.version_count())
    }

    fn read_index(&self) -> StoreResult<RwLockReadGuard<'_, VersionIndex>> {
        self.index
            .read()
            .map_err(|_| StoreError::Unavailable("entry log index lock poisoned".into()))
    }

    fn write_index(&self) -> StoreResult<RwLockWriteGuard<'_, VersionIndex>> {
        self.index
            .write()
            .map_err(|_| StoreError::Unavailable("entry log index lock poisoned".into()))
    }

    fn lock_writer(&self) -> StoreResult<MutexGuard<'_, LogWriter>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Unavailable("entry log writer lock poisoned".into()))
    }

    /// Make `value` durable as the next version of `key`, then index it.
    ///
    /// Callers hold the index write lock, which serializes all writers.
    fn commit(
        &self,
        index: &mut VersionIndex,
        key: &str,
        value: Option<&[u8]>,
    ) -> StoreResult<VersionId> {
        let record = index.prepare(key, value, self.config.node_id);
        let frame = encode_frame(&record)?;

        let mut w = self.lock_writer()?;
        let frame_offset = w.offset;
        if let Err(e) = self.write_frame(&mut w.file, &frame) {
            // Drop whatever part of the frame reached the file.
            if let Err(rollback) = w.file.set_len(frame_offset) {
                warn!(error = %rollback, offset = frame_offset, "failed to roll back partial frame");
            }
            return Err(e.into());
        }
        w.offset += frame.len() as u64;
        drop(w);

        debug!(
            key,
            seq = record.version.seq(),
            offset = frame_offset,
            tombstone = value.is_none(),
            "entry log append"
        );
        let version = record.version.clone();
        index.apply(record);
        Ok(version)
    }

    fn write_frame(&self, file: &mut File, frame: &[u8]) -> io::Result<()> {
        file.write_all(frame)?;
        file.flush()?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            file.sync_all()?;
        }
        Ok(())
    }
}

impl EntryStore for FileEntryStore {
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        Ok(self.read_index()?.versioned(key))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<VersionId> {
        let mut index = self.write_index()?;
        self.commit(&mut index, key, Some(value))
    }

    fn put_if(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<&VersionId>,
    ) -> StoreResult<VersionId> {
        let mut index = self.write_index()?;
        index.check_expected(key, expected)?;
        self.commit(&mut index, key, Some(value))
    }

    fn delete(&self, key: &str) -> StoreResult<VersionId> {
        let mut index = self.write_index()?;
        index.require_live(key)?;
        self.commit(&mut index, key, None)
    }

    fn range_scan(&self, start: &str, end: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        Ok(self.read_index()?.scan(start, end))
    }

    fn history_of(&self, key: &str) -> StoreResult<Option<VersionLog>> {
        Ok(self.read_index()?.log(key).map(VersionLog::from_records))
    }
}

fn encode_frame(record: &VersionRecord) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization("version record exceeds 4 GiB".into()))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Replay every frame of the log at `path`.
///
/// Returns the rebuilt index and the length of the log up to the end of
/// the last complete frame. Anything past that length is a torn tail left
/// by an interrupted append. A damaged frame that is followed by further
/// committed frames fails recovery instead, leaving the file as it is.
fn recover(path: &Path) -> StoreResult<(VersionIndex, u64)> {
    let mut file = BufReader::new(File::open(path)?);
    let file_len = file.get_ref().metadata()?.len();
    let mut index = VersionIndex::default();
    let mut offset: u64 = 0;

    while offset < file_len {
        if offset + HEADER_SIZE as u64 > file_len {
            warn!(offset, file_len, "partial frame header at end of log");
            break;
        }
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + u64::from(length) > file_len {
            file.seek(SeekFrom::Start(offset))?;
            let mut tail = Vec::new();
            file.read_to_end(&mut tail)?;
            if let Some(at) = next_committed_frame(&tail) {
                return Err(StoreError::Corrupt {
                    offset,
                    reason: format!(
                        "invalid frame length {length} with committed frames at offset {}",
                        offset + at as u64
                    ),
                });
            }
            warn!(offset, length, file_len, "incomplete frame at end of log");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        file.read_exact(&mut payload)?;

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            return Err(StoreError::Corrupt {
                offset,
                reason: format!(
                    "CRC mismatch: expected {expected_crc:#010x}, found {actual_crc:#010x}"
                ),
            });
        }

        let record = bincode::deserialize::<VersionRecord>(&payload).map_err(|e| {
            StoreError::Corrupt {
                offset,
                reason: format!("undecodable version record: {e}"),
            }
        })?;
        if !record.verify() {
            return Err(StoreError::Corrupt {
                offset,
                reason: format!("version digest mismatch for key {}", record.key),
            });
        }
        if record.version.seq() <= index.last_seq() {
            return Err(StoreError::Corrupt {
                offset,
                reason: format!(
                    "version seq {} does not follow {}",
                    record.version.seq(),
                    index.last_seq()
                ),
            });
        }
        index.apply(record);

        offset += HEADER_SIZE as u64 + u64::from(length);
    }

    debug!(recovered = index.version_count(), valid_len = offset, "entry log recovery complete");
    Ok((index, offset))
}

/// Position in `tail` of the first intact frame after its start, if any.
///
/// A frame counts only if its CRC, its encoding and its digest all check
/// out, so stray bytes of an interrupted append never qualify.
fn next_committed_frame(tail: &[u8]) -> Option<usize> {
    (1..tail.len()).find(|&at| {
        let Some(header) = tail.get(at..at + HEADER_SIZE) else {
            return false;
        };
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let start = at + HEADER_SIZE;
        match tail.get(start..start.saturating_add(length)) {
            Some(payload) if length > 0 && crc32fast::hash(payload) == crc => {
                bincode::deserialize::<VersionRecord>(payload).is_ok_and(|r| r.verify())
            }
            _ => false,
        }
    })
}
