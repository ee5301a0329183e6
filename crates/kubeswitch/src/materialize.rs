//! Switch materialization
//!
//! The selected kubeconfig is written to a fresh file under `switch_tmp`.
//! The shell points `KUBECONFIG` at the printed path; this process never
//! touches the caller's environment.

use crate::store::Candidate;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MaterializeError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| MaterializeError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of one successful switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSwitch {
    pub temp_file_path: PathBuf,
    pub source_candidate_id: String,
    pub created_at: DateTime<Utc>,
}

pub struct Materializer {
    dir: PathBuf,
}

impl Materializer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `content` to a new owner-only file and return its absolute path.
    ///
    /// Names are `config.<timestamp>.<random>`; the random part comes from
    /// an exclusive create, so concurrent processes never share a file.
    pub fn materialize(&self, content: &[u8]) -> Result<PathBuf, MaterializeError> {
        fs::create_dir_all(&self.dir).map_err(MaterializeError::io("create", &self.dir))?;

        let prefix = format!("config.{}.", Utc::now().format("%Y%m%dT%H%M%S"));
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .rand_bytes(8)
            .tempfile_in(&self.dir)
            .map_err(MaterializeError::io("create a file in", &self.dir))?;

        // tempfile creates with 0600 on unix; set it explicitly regardless of umask.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(MaterializeError::io("restrict permissions of", file.path()))?;
        }

        file.write_all(content)
            .map_err(MaterializeError::io("write", file.path()))?;
        file.as_file()
            .sync_all()
            .map_err(MaterializeError::io("sync", file.path()))?;

        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| MaterializeError::Io {
                action: "keep",
                path: self.dir.clone(),
                source: e.error,
            })?;

        let absolute = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()
                .map_err(MaterializeError::io("resolve", &path))?
                .join(path)
        };

        tracing::debug!("Materialized kubeconfig at {}", absolute.display());
        Ok(absolute)
    }

    pub fn materialize_candidate(
        &self,
        candidate: &Candidate,
        content: &[u8],
    ) -> Result<ActiveSwitch, MaterializeError> {
        let created_at = Utc::now();
        let temp_file_path = self.materialize(content)?;
        tracing::info!(id = %candidate.id, store = %candidate.kind, "Switched to {}", candidate.display_name);
        Ok(ActiveSwitch {
            temp_file_path,
            source_candidate_id: candidate.id.clone(),
            created_at,
        })
    }

    /// Remove every file in the directory. Absent directory is zero.
    pub fn clean(&self) -> Result<usize, MaterializeError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(MaterializeError::Io {
                    action: "read",
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(MaterializeError::io("read", &self.dir))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(MaterializeError::io("inspect", &path))?;
            if file_type.is_dir() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                // Removed by a concurrent clean.
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(MaterializeError::Io {
                        action: "remove",
                        path,
                        source,
                    })
                }
            }
        }

        tracing::info!("Removed {} file(s) from {}", removed, self.dir.display());
        Ok(removed)
    }
}
