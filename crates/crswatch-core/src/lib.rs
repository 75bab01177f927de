pub mod grouped;
pub mod round;
pub mod validate;
pub mod views;

pub use grouped::{GroupedInteger, GroupedIntegerError, MAX_SAFE_INTEGER};
pub use round::{BUCKET_KEYS, Feed, POOL_BUCKETS, PoolCounts, Round, StoredFeed, format_timestamp};
pub use validate::{ValidationErrors, ValidationIssue, validate_feed};
pub use views::{Dashboard, DashboardRound, Period, PoolView};
