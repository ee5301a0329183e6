//! Hook State Store - persisted run state
//!
//! # Storage Format
//!
//! ```text
//! ~/.kube/switch-state/
//! └── hooks-state.json      { "<hook name>": HookRecord, ... }
//! ```
//!
//! Writes go to a temp file in the same directory followed by a rename, so a
//! reader (or a crash) never observes a half-written file.

use super::HookRecord;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const STATE_FILE_NAME: &str = "hooks-state.json";

pub type HookRecords = BTreeMap<String, HookRecord>;

#[derive(Error, Debug)]
pub enum HookStateError {
    #[error("failed to {action} hook state {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("hook state {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub struct HookStateStore {
    dir: PathBuf,
}

impl HookStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE_NAME)
    }

    /// Load every record. A missing file is an empty mapping.
    pub fn load(&self) -> Result<HookRecords, HookStateError> {
        let path = self.path();
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HookRecords::new()),
            Err(source) => {
                return Err(HookStateError::Io {
                    action: "read",
                    path,
                    source,
                })
            }
        };

        if json.trim().is_empty() {
            return Ok(HookRecords::new());
        }

        let records: HookRecords =
            serde_json::from_str(&json).map_err(|source| HookStateError::Corrupt {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("Loaded {} hook records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Replace the state file atomically.
    pub fn save(&self, records: &HookRecords) -> Result<(), HookStateError> {
        let path = self.path();
        let io_err = |action: &'static str| {
            let path = path.clone();
            move |source: io::Error| HookStateError::Io {
                action,
                path,
                source,
            }
        };

        fs::create_dir_all(&self.dir).map_err(io_err("create directory for"))?;
        let json = serde_json::to_vec_pretty(records).map_err(|source| HookStateError::Corrupt {
            path: path.clone(),
            source,
        })?;

        atomic_write(&self.dir, &path, &json).map_err(io_err("write"))?;
        tracing::debug!("Saved {} hook records to {}", records.len(), path.display());
        Ok(())
    }

    /// Merge one record into the persisted state, leaving other hooks untouched.
    ///
    /// Re-reads the file first so records written by a concurrent invocation
    /// for other hooks survive.
    pub fn update(&self, record: HookRecord) -> Result<(), HookStateError> {
        let mut records = self.load()?;
        records.insert(record.name.clone(), record);
        self.save(&records)
    }
}

/// Atomic write via temp file + rename
fn atomic_write(dir: &Path, path: &Path, content: &[u8]) -> io::Result<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
