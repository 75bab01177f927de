//! Decide whether a freshly validated feed replaces the persisted one.
//!
//! Feeds are full snapshots, newest round first, so only index 0 of each is
//! compared. The incoming snapshot wins only when its draw number is strictly
//! greater, compared as an integer (draw numbers are not zero-padded, so
//! `"10"` follows `"9"`). Anything else leaves the store untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use crswatch_core::{Feed, StoredFeed};
use tracing::info;

use crate::{JsonStore, StoreError};

/// Numeric ordering key parsed from a round's `drawNumber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawNumber(u64);

impl DrawNumber {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for DrawNumber {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StoreError::InvalidDrawNumber(s.to_string()));
        }
        trimmed
            .parse()
            .map(DrawNumber)
            .map_err(|_| StoreError::InvalidDrawNumber(s.to_string()))
    }
}

impl fmt::Display for DrawNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a reconciliation run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The store now holds the incoming feed.
    Updated {
        previous: DrawNumber,
        current: DrawNumber,
    },
    /// The incoming feed was not newer; nothing was written.
    Unchanged {
        persisted: DrawNumber,
        incoming: DrawNumber,
    },
}

impl Reconciliation {
    pub fn is_updated(&self) -> bool {
        matches!(self, Reconciliation::Updated { .. })
    }
}

/// Draw number of the newest round in `feed`.
pub fn latest_draw(feed: &Feed) -> Result<Option<DrawNumber>, StoreError> {
    feed.latest()
        .map(|round| round.draw_number.parse())
        .transpose()
}

/// Compare `incoming` with the store and replace the store if it is newer.
///
/// The store must already exist and hold at least one round.
pub fn reconcile(
    store: &JsonStore,
    incoming: Feed,
    now: DateTime<Utc>,
) -> Result<Reconciliation, StoreError> {
    let persisted = store.load()?;
    let previous = latest_draw(&persisted.payload)?
        .ok_or_else(|| StoreError::Empty(store.path().to_path_buf()))?;
    let current = latest_draw(&incoming)?.ok_or(StoreError::NoIncomingRounds)?;

    info!(%previous, "current draw number");
    info!(%current, "feed draw number");

    if current <= previous {
        info!("no new draw, skipping update");
        return Ok(Reconciliation::Unchanged {
            persisted: previous,
            incoming: current,
        });
    }

    store.save(&StoredFeed {
        updated_at: now,
        payload: incoming,
    })?;
    info!(%current, "new draw detected, store updated");
    Ok(Reconciliation::Updated { previous, current })
}
