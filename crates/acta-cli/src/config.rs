//! `actas.toml` configuration.
//!
//! ```toml
//! store_path = "data/actas.log"
//! node_id = 3
//! sync_every_write = true
//!
//! [ledger]
//! strict_totals = true
//! max_id_attempts = 8
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use acta_ledger::LedgerConfig;
use acta_store::{FileStoreConfig, SyncMode};
use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "actas.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActasConfig {
    /// Ledger log file.
    pub store_path: PathBuf,
    /// Writer id stamped into version timestamps.
    pub node_id: u16,
    /// `fsync` every committed version.
    pub sync_every_write: bool,
    pub ledger: LedgerConfig,
}

impl Default for ActasConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("actas.log"),
            node_id: 0,
            sync_every_write: true,
            ledger: LedgerConfig::default(),
        }
    }
}

impl ActasConfig {
    /// Load `explicit` if given, else `actas.toml` when it exists, else
    /// defaults.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn store_config(&self) -> FileStoreConfig {
        FileStoreConfig {
            node_id: self.node_id,
            sync_mode: if self.sync_every_write {
                SyncMode::EveryWrite
            } else {
                SyncMode::OsDefault
            },
        }
    }
}
