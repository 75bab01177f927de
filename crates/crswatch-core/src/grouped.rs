//! Comma-grouped numerals as published in the rounds feed.
//!
//! The feed encodes every count as a string such as `"3,500"`. A
//! [`GroupedInteger`] is the parsed form: the digits with separators removed,
//! guaranteed to fit in the exactly-representable range of an IEEE-754
//! double so that the persisted JSON reads back identically in any consumer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest integer a double represents without loss (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupedIntegerError {
    #[error("Must contain only digits and commas")]
    InvalidCharacters,
    #[error("\"{0}\" is not a safe integer")]
    NotSafeInteger(String),
}

/// A non-negative count parsed from a digits-and-commas numeral.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub struct GroupedInteger(u64);

impl GroupedInteger {
    /// Parse a numeral matching `^[\d,]+$`.
    ///
    /// Separators are stripped wherever they appear; a value of only commas
    /// reads as zero.
    pub fn parse(raw: &str) -> Result<Self, GroupedIntegerError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit() || b == b',') {
            return Err(GroupedIntegerError::InvalidCharacters);
        }

        let mut value: u64 = 0;
        for digit in raw.bytes().filter(u8::is_ascii_digit) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(digit - b'0')))
                .filter(|v| *v <= MAX_SAFE_INTEGER)
                .ok_or_else(|| GroupedIntegerError::NotSafeInteger(raw.to_string()))?;
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for GroupedInteger {
    type Err = GroupedIntegerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<u64> for GroupedInteger {
    type Error = GroupedIntegerError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > MAX_SAFE_INTEGER {
            return Err(GroupedIntegerError::NotSafeInteger(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl From<GroupedInteger> for u64 {
    fn from(value: GroupedInteger) -> Self {
        value.0
    }
}

/// Renders with thousands separators, the way the feed publishes counts.
impl fmt::Display for GroupedInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        f.pad(&out)
    }
}
