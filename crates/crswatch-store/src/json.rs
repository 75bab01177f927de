//! The persisted rounds document, one JSON file read and replaced whole.

use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crswatch_core::StoredFeed;
use tempfile::NamedTempFile;
use tracing::info;

use crate::StoreError;

/// Where the dashboard reads its data from, relative to the repository root.
pub const DEFAULT_DATA_FILE: &str = "frontend/data.json";

/// JSON file store for `{ updatedAt, payload: { classes, rounds } }`.
///
/// The file is seeded out-of-band. [`load`](Self::load) never invents an
/// empty baseline: a missing or malformed file is an error. [`save`](Self::save)
/// writes a sibling temporary file and renames it over the target, so readers
/// see either the old document or the new one.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the persisted document.
    pub fn load(&self) -> Result<StoredFeed, StoreError> {
        let bytes = std::fs::read(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::NotFound(self.display_path())
            } else {
                StoreError::Read {
                    path: self.display_path(),
                    source,
                }
            }
        })?;

        let stored: StoredFeed =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
                path: self.display_path(),
                source,
            })?;
        if stored.payload.rounds.is_empty() {
            return Err(StoreError::Empty(self.display_path()));
        }

        info!(
            path = %self.path.display(),
            rounds = stored.payload.rounds.len(),
            "loaded store"
        );
        Ok(stored)
    }

    /// Replace the persisted document in one rename.
    pub fn save(&self, stored: &StoredFeed) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let write_err = |source| StoreError::Write {
            path: self.display_path(),
            source,
        };

        let tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, stored).map_err(StoreError::Encode)?;
            writer.flush().map_err(write_err)?;
        }
        tmp.as_file().sync_all().map_err(write_err)?;
        // The temp file starts out owner-only; keep the replaced file's mode.
        if let Ok(existing) = std::fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(existing.permissions())
                .map_err(write_err)?;
        }
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        info!(
            path = %self.path.display(),
            rounds = stored.payload.rounds.len(),
            "wrote store"
        );
        Ok(())
    }

    /// Absolute form of the store path for error reports.
    fn display_path(&self) -> PathBuf {
        std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone())
    }
}
