//! Typed round records and the persisted store document.
//!
//! Field names on the wire follow the upstream feed (`drawNumber`,
//! `drawCRS`, `DrawText1`, `dd1`..`dd18`) so that the persisted file keeps
//! the same shape the feed publishes, with numerals as JSON integers and
//! draw dates as UTC timestamps.

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::GroupedInteger;

/// Number of `ddN` pool fields carried by every round.
pub const POOL_BUCKETS: usize = 18;

/// Wire names of the pool fields, in order.
pub const BUCKET_KEYS: [&str; POOL_BUCKETS] = [
    "dd1", "dd2", "dd3", "dd4", "dd5", "dd6", "dd7", "dd8", "dd9", "dd10", "dd11", "dd12", "dd13",
    "dd14", "dd15", "dd16", "dd17", "dd18",
];

/// One published invitation round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Opaque identifier; ordered numerically during reconciliation.
    pub draw_number: String,
    #[serde(rename = "drawNumberURL")]
    pub draw_number_url: String,
    #[serde(with = "timestamp")]
    pub draw_date: DateTime<Utc>,
    pub draw_date_full: String,
    /// Program stream the round targeted.
    pub draw_name: String,
    pub draw_size: GroupedInteger,
    #[serde(rename = "drawCRS")]
    pub draw_crs: GroupedInteger,
    pub mitext: String,
    #[serde(rename = "DrawText1")]
    pub draw_text1: String,
    pub draw_text2: String,
    pub draw_date_time: String,
    pub draw_cut_off: String,
    /// As-of date of the pool snapshot.
    pub draw_distribution_as_on: String,
    #[serde(flatten)]
    pub pool: PoolCounts,
}

/// A feed snapshot: every round published so far, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub classes: String,
    pub rounds: Vec<Round>,
}

impl Feed {
    /// The newest round (index 0 by convention).
    pub fn latest(&self) -> Option<&Round> {
        self.rounds.first()
    }
}

/// The persisted document: the last adopted feed and when it was adopted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFeed {
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    pub payload: Feed,
}

/// Candidate counts for `dd1`..`dd18`.
///
/// `dd1`..`dd17` are CRS score buckets; `dd18` is the pool total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounts(pub [GroupedInteger; POOL_BUCKETS]);

impl PoolCounts {
    /// Count for `ddN` (1-based, as on the wire).
    pub fn bucket(&self, n: usize) -> Option<u64> {
        n.checked_sub(1)
            .and_then(|i| self.0.get(i))
            .map(|count| count.get())
    }

    /// Total number of candidates in the pool (`dd18`).
    pub fn total(&self) -> u64 {
        self.0[POOL_BUCKETS - 1].get()
    }
}

impl Serialize for PoolCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(POOL_BUCKETS))?;
        for (key, count) in BUCKET_KEYS.iter().zip(self.0.iter()) {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PoolCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PoolVisitor;

        impl<'de> Visitor<'de> for PoolVisitor {
            type Value = PoolCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("pool counts dd1..dd18")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PoolCounts, A::Error> {
                let mut slots: [Option<GroupedInteger>; POOL_BUCKETS] = [None; POOL_BUCKETS];
                while let Some(key) = map.next_key::<String>()? {
                    match BUCKET_KEYS.iter().position(|k| *k == key) {
                        Some(i) => slots[i] = Some(map.next_value()?),
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }

                let mut counts = [GroupedInteger::default(); POOL_BUCKETS];
                for (i, slot) in slots.into_iter().enumerate() {
                    counts[i] = slot.ok_or_else(|| de::Error::missing_field(BUCKET_KEYS[i]))?;
                }
                Ok(PoolCounts(counts))
            }
        }

        deserializer.deserialize_map(PoolVisitor)
    }
}

/// Parse a strict `YYYY-MM-DD` calendar date as UTC midnight.
pub fn parse_iso_date(raw: &str) -> Option<DateTime<Utc>> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { *b == b'-' } else { b.is_ascii_digit() });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Canonical timestamp form: `2025-06-10T00:00:00.000Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}
