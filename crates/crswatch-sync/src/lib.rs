//! Feed sourcing: the public rounds endpoint over HTTP, or a local JSON file.

mod error;
pub mod file;
pub mod retry;

#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use serde_json::Value;

pub use error::FetchError;
pub use file::FileSource;
pub use retry::RetryPolicy;

#[cfg(feature = "http")]
pub use http::{DEFAULT_USER_AGENT, FEED_URL, HttpSource};

/// Somewhere a raw feed payload can be read from.
///
/// Network and file sourcing are interchangeable: both yield the untyped JSON
/// document that the schema validator consumes.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, FetchError>;

    /// Human-readable origin for log lines.
    fn describe(&self) -> String;
}
