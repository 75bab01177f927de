//! Local-file feed source, for deployments that download the feed elsewhere.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::{FeedSource, FetchError};

/// Reads the feed from a JSON file. No retries: a missing file is terminal.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The input path made absolute against the working directory.
    pub fn resolved_path(&self) -> Result<PathBuf, FetchError> {
        std::path::absolute(&self.path).map_err(|source| FetchError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl FeedSource for FileSource {
    async fn fetch(&self) -> Result<Value, FetchError> {
        let path = self.resolved_path()?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FetchError::FileNotFound(path));
            }
            Err(source) => return Err(FetchError::Io { path, source }),
        };
        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(source) => return Err(FetchError::Malformed { path, source }),
        };
        info!(path = %path.display(), bytes = bytes.len(), "read feed from file");
        Ok(value)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
