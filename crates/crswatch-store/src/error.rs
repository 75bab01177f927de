use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read store {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store {} is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store {} holds no rounds", .0.display())]
    Empty(PathBuf),

    #[error("failed to write store {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode store: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("incoming feed has no rounds")]
    NoIncomingRounds,

    #[error("draw number {0:?} is not a non-negative integer")]
    InvalidDrawNumber(String),
}
