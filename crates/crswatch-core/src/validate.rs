//! Schema validation for the raw rounds feed.
//!
//! The feed arrives as untyped JSON with every count encoded as a grouped
//! numeral string and every draw date as `YYYY-MM-DD`. [`validate_feed`]
//! walks the whole document and either returns a typed [`Feed`] or every
//! issue it found, keyed by dotted path (`rounds.3.drawSize`). A single bad
//! field rejects the whole batch.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::round::{BUCKET_KEYS, POOL_BUCKETS, parse_iso_date};
use crate::{Feed, GroupedInteger, PoolCounts, Round};

/// One failed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path: {} | {}", self.path, self.message)
    }
}

/// Every issue found in a rejected feed, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema validation failed with {} issue(s)", .issues.len())]
pub struct ValidationErrors {
    issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any issue was reported at exactly `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }
}

/// Validate and transform a raw feed payload.
pub fn validate_feed(value: &Value) -> Result<Feed, ValidationErrors> {
    let mut issues = Issues::default();
    let feed = feed(value, &mut issues);
    match feed {
        Some(feed) if issues.0.is_empty() => Ok(feed),
        _ => Err(ValidationErrors { issues: issues.0 }),
    }
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn feed(value: &Value, issues: &mut Issues) -> Option<Feed> {
    let Some(obj) = value.as_object() else {
        issues.push("", format!("Expected object, received {}", json_type(value)));
        return None;
    };

    let classes = text(obj, "", "classes", issues);
    let rounds = match obj.get("rounds") {
        None => {
            issues.push("rounds", "Required");
            None
        }
        Some(Value::Array(items)) => {
            if items.is_empty() {
                issues.push("rounds", "API must contain at least one round");
            }
            let parsed: Vec<Option<Round>> = items
                .iter()
                .enumerate()
                .map(|(i, item)| round(item, &format!("rounds.{i}"), issues))
                .collect();
            parsed.into_iter().collect::<Option<Vec<_>>>()
        }
        Some(other) => {
            issues.push(
                "rounds",
                format!("Expected array, received {}", json_type(other)),
            );
            None
        }
    };

    Some(Feed {
        classes: classes?,
        rounds: rounds?,
    })
}

fn round(value: &Value, path: &str, issues: &mut Issues) -> Option<Round> {
    let Some(obj) = value.as_object() else {
        issues.push(path, format!("Expected object, received {}", json_type(value)));
        return None;
    };

    let draw_number = text(obj, path, "drawNumber", issues);
    let draw_number_url = text(obj, path, "drawNumberURL", issues);
    let draw_date = date(obj, path, "drawDate", issues);
    let draw_date_full = text(obj, path, "drawDateFull", issues);
    let draw_name = text(obj, path, "drawName", issues);
    let draw_size = numeral(obj, path, "drawSize", issues);
    let draw_crs = numeral(obj, path, "drawCRS", issues);
    let mitext = text(obj, path, "mitext", issues);
    let draw_text1 = text(obj, path, "DrawText1", issues);
    let draw_text2 = text(obj, path, "drawText2", issues);
    let draw_date_time = text(obj, path, "drawDateTime", issues);
    let draw_cut_off = text(obj, path, "drawCutOff", issues);
    let draw_distribution_as_on = text(obj, path, "drawDistributionAsOn", issues);

    let mut counts = [GroupedInteger::default(); POOL_BUCKETS];
    let mut pool_ok = true;
    for (slot, key) in counts.iter_mut().zip(BUCKET_KEYS) {
        match numeral(obj, path, key, issues) {
            Some(count) => *slot = count,
            None => pool_ok = false,
        }
    }

    Some(Round {
        draw_number: draw_number?,
        draw_number_url: draw_number_url?,
        draw_date: draw_date?,
        draw_date_full: draw_date_full?,
        draw_name: draw_name?,
        draw_size: draw_size?,
        draw_crs: draw_crs?,
        mitext: mitext?,
        draw_text1: draw_text1?,
        draw_text2: draw_text2?,
        draw_date_time: draw_date_time?,
        draw_cut_off: draw_cut_off?,
        draw_distribution_as_on: draw_distribution_as_on?,
        pool: pool_ok.then_some(PoolCounts(counts))?,
    })
}

fn text(
    obj: &Map<String, Value>,
    parent: &str,
    key: &str,
    issues: &mut Issues,
) -> Option<String> {
    raw_str(obj, parent, key, issues).map(str::to_string)
}

fn raw_str<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    key: &str,
    issues: &mut Issues,
) -> Option<&'a str> {
    match obj.get(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            issues.push(
                &join(parent, key),
                format!("Expected string, received {}", json_type(other)),
            );
            None
        }
        None => {
            issues.push(&join(parent, key), "Required");
            None
        }
    }
}

fn numeral(
    obj: &Map<String, Value>,
    parent: &str,
    key: &str,
    issues: &mut Issues,
) -> Option<GroupedInteger> {
    let raw = raw_str(obj, parent, key, issues)?;
    match GroupedInteger::parse(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            issues.push(&join(parent, key), err.to_string());
            None
        }
    }
}

fn date(
    obj: &Map<String, Value>,
    parent: &str,
    key: &str,
    issues: &mut Issues,
) -> Option<DateTime<Utc>> {
    let raw = raw_str(obj, parent, key, issues)?;
    let parsed = parse_iso_date(raw);
    if parsed.is_none() {
        issues.push(&join(parent, key), "Invalid ISO date");
    }
    parsed
}
