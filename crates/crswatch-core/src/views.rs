//! Derived dashboard views over a validated feed.
//!
//! [`Dashboard::new`] is the single initialization step: it extracts the
//! rounds the dashboard shows, then precomputes per-category draw series and
//! monthly invitation totals. Everything here is a pure transform.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, Utc};
use thiserror::Error;
use tracing::debug;

use crate::Feed;

/// Rounds drawn before this year are not shown.
pub const HISTORY_START_YEAR: i32 = 2020;

pub const SHORT_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A labelled CRS score bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBucket {
    /// 1-based `ddN` number.
    pub dd: usize,
    pub range: &'static str,
}

/// Score ranges for `dd1`..`dd17`. Some ranges nest inside others
/// (dd4..dd8 subdivide dd3), which is why the views pick subsets.
pub const POOL_RANGES: [PoolBucket; 17] = [
    PoolBucket { dd: 1, range: "601-1200" },
    PoolBucket { dd: 2, range: "501-600" },
    PoolBucket { dd: 3, range: "451-500" },
    PoolBucket { dd: 4, range: "491-500" },
    PoolBucket { dd: 5, range: "481-490" },
    PoolBucket { dd: 6, range: "471-480" },
    PoolBucket { dd: 7, range: "461-470" },
    PoolBucket { dd: 8, range: "451-460" },
    PoolBucket { dd: 9, range: "401-450" },
    PoolBucket { dd: 10, range: "441-450" },
    PoolBucket { dd: 11, range: "431-440" },
    PoolBucket { dd: 12, range: "421-430" },
    PoolBucket { dd: 13, range: "411-420" },
    PoolBucket { dd: 14, range: "409-410" },
    PoolBucket { dd: 15, range: "351-400" },
    PoolBucket { dd: 16, range: "301-350" },
    PoolBucket { dd: 17, range: "0-300" },
];

/// Which pool buckets to chart, lowest scores first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PoolView {
    #[default]
    Compact,
    Detailed,
}

impl PoolView {
    /// `ddN` numbers shown by this view, in display order.
    pub fn buckets(self) -> &'static [usize] {
        match self {
            PoolView::Compact => &[17, 16, 15, 9, 3, 2, 1],
            PoolView::Detailed => &[17, 16, 15, 14, 13, 12, 11, 10, 8, 7, 6, 5, 4, 2, 1],
        }
    }
}

impl fmt::Display for PoolView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolView::Compact => f.write_str("Compact"),
            PoolView::Detailed => f.write_str("Detailed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseViewError {
    #[error("unknown pool view {0:?} (expected compact or detailed)")]
    UnknownPoolView(String),
    #[error("unknown period {0:?} (expected ALL, 1Y, 2Y, or a year)")]
    UnknownPeriod(String),
}

impl FromStr for PoolView {
    type Err = ParseViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(PoolView::Compact),
            "detailed" => Ok(PoolView::Detailed),
            _ => Err(ParseViewError::UnknownPoolView(s.to_string())),
        }
    }
}

/// Time window for a draw series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    All,
    /// Draws on or after `now` minus this many years.
    LastYears(u32),
    /// Draws in one calendar year.
    Year(i32),
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::All => f.write_str("ALL"),
            Period::LastYears(n) => write!(f, "{n}Y"),
            Period::Year(y) => write!(f, "{y}"),
        }
    }
}

impl FromStr for Period {
    type Err = ParseViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ParseViewError::UnknownPeriod(s.to_string());
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(Period::All),
            "1Y" => Ok(Period::LastYears(1)),
            "2Y" => Ok(Period::LastYears(2)),
            year if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) => {
                year.parse().map(Period::Year).map_err(|_| unknown())
            }
            _ => Err(unknown()),
        }
    }
}

/// A round as the dashboard sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRound {
    pub draw_number: String,
    pub draw_date: DateTime<Utc>,
    pub draw_date_full: String,
    pub score: u64,
    pub invitations: u64,
    pub category: String,
    pub distribution_date: String,
    /// Counts for `dd1`..`dd17`, indexed from zero.
    pub pool: [u64; 17],
    pub total_candidates: u64,
}

/// One point of a per-category draw series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawPoint {
    /// 1-based position within the series.
    pub index: usize,
    pub date: DateTime<Utc>,
    pub date_full: String,
    pub score: u64,
    pub invitations: u64,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvitationPoint {
    pub year: i32,
    /// Zero-based month.
    pub month: u32,
    pub invitations: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolPoint {
    pub range: &'static str,
    pub count: u64,
}

/// Inclusive axis bounds for a score chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartDomain {
    pub min: i64,
    pub max: i64,
}

/// Immutable derived data for one feed snapshot.
#[derive(Debug, Clone)]
pub struct Dashboard {
    rounds: Vec<DashboardRound>,
    years: Vec<i32>,
    categories: Vec<String>,
    draws: BTreeMap<String, Vec<DrawPoint>>,
    invitations: Vec<InvitationPoint>,
}

impl Dashboard {
    pub fn new(feed: &Feed) -> Self {
        let rounds = extract_rounds(feed);
        let years = distinct_years(&rounds);
        let draws = group_by_category(&rounds);
        let mut categories: Vec<String> = draws.keys().cloned().collect();
        categories.sort_by(|a, b| compare_categories(a, b));
        let invitations = monthly_invitations(&rounds, &years);
        debug!(
            rounds = rounds.len(),
            categories = draws.len(),
            years = years.len(),
            "built dashboard views"
        );
        Self {
            rounds,
            years,
            categories,
            draws,
            invitations,
        }
    }

    pub fn rounds(&self) -> &[DashboardRound] {
        &self.rounds
    }

    pub fn latest(&self) -> Option<&DashboardRound> {
        self.rounds.first()
    }

    /// Years with at least one round, newest first.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Category names in display order (see [`compare_categories`]).
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    /// The category shown first: the second in sort order when there is one.
    pub fn default_category(&self) -> Option<&str> {
        self.categories().nth(1).or_else(|| self.categories().next())
    }

    /// The draw series for `category` within `period`, re-indexed from 1.
    pub fn draws(&self, category: &str, period: Period, now: DateTime<Utc>) -> Vec<DrawPoint> {
        self.draws
            .get(category)
            .map(|points| filter_by_time(points, period, now))
            .unwrap_or_default()
    }

    /// Twelve monthly totals for `year` (all zero for a year with no rounds).
    pub fn invitations_for(&self, year: i32) -> Vec<InvitationPoint> {
        let points: Vec<InvitationPoint> = self
            .invitations
            .iter()
            .filter(|p| p.year == year)
            .copied()
            .collect();
        if points.is_empty() {
            return monthly_invitations(&self.rounds, &[year]);
        }
        points
    }

    /// Pool distribution of the newest round.
    pub fn latest_pool(&self, view: PoolView) -> Vec<PoolPoint> {
        self.latest()
            .map(|round| pool_distribution(round, view))
            .unwrap_or_default()
    }

    /// One round per pool snapshot, newest first.
    pub fn pool_history(&self) -> Vec<DashboardRound> {
        dedupe_by_distribution_date(&self.rounds)
    }
}

/// Map feed rounds to dashboard rounds, dropping those before
/// [`HISTORY_START_YEAR`]. Order is preserved (newest first).
pub fn extract_rounds(feed: &Feed) -> Vec<DashboardRound> {
    feed.rounds
        .iter()
        .filter(|r| r.draw_date.year() >= HISTORY_START_YEAR)
        .map(|r| {
            let mut pool = [0u64; 17];
            for (i, slot) in pool.iter_mut().enumerate() {
                *slot = r.pool.0[i].get();
            }
            DashboardRound {
                draw_number: r.draw_number.clone(),
                draw_date: r.draw_date,
                draw_date_full: r.draw_date_full.clone(),
                score: r.draw_crs.get(),
                invitations: r.draw_size.get(),
                category: normalize_category(&r.draw_name),
                distribution_date: r.draw_distribution_as_on.clone(),
                pool,
                total_candidates: r.pool.total(),
            }
        })
        .collect()
}

/// Shorten a program name for display: `Version ` becomes `V` and
/// ` occupations` is dropped, ignoring case.
pub fn normalize_category(name: &str) -> String {
    let shortened = replace_ignore_ascii_case(name, "version ", "V");
    replace_ignore_ascii_case(&shortened, " occupations", "")
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> String {
    // ASCII lowercasing keeps byte offsets, so match positions map back.
    let lowered = haystack.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for (start, _) in lowered.match_indices(needle) {
        out.push_str(&haystack[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
    }
    out.push_str(&haystack[last..]);
    out
}

/// Keep the first round seen for each distribution date.
///
/// Input is newest first, so the newest round per snapshot survives.
pub fn dedupe_by_distribution_date(rounds: &[DashboardRound]) -> Vec<DashboardRound> {
    let mut seen = HashSet::new();
    rounds
        .iter()
        .filter(|r| seen.insert(r.distribution_date.as_str()))
        .cloned()
        .collect()
}

/// Display order for category names: case-insensitive, with lowercase
/// ahead of uppercase when names differ only in case.
pub fn compare_categories(a: &str, b: &str) -> Ordering {
    let folded = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<String>();
    folded(a).cmp(&folded(b)).then_with(|| b.cmp(a))
}

/// Group rounds by category, each series oldest first.
pub fn group_by_category(rounds: &[DashboardRound]) -> BTreeMap<String, Vec<DrawPoint>> {
    let mut groups: BTreeMap<String, Vec<&DashboardRound>> = BTreeMap::new();
    for round in rounds {
        groups.entry(round.category.clone()).or_default().push(round);
    }

    groups
        .into_iter()
        .map(|(category, members)| {
            let points = members
                .into_iter()
                .rev()
                .enumerate()
                .map(|(i, r)| DrawPoint {
                    index: i + 1,
                    date: r.draw_date,
                    date_full: r.draw_date_full.clone(),
                    score: r.score,
                    invitations: r.invitations,
                    category: r.category.clone(),
                })
                .collect();
            (category, points)
        })
        .collect()
}

/// Restrict a series to `period` and renumber it from 1.
pub fn filter_by_time(points: &[DrawPoint], period: Period, now: DateTime<Utc>) -> Vec<DrawPoint> {
    let keep = |p: &DrawPoint| match period {
        Period::All => true,
        Period::LastYears(years) => {
            let cutoff = now
                .checked_sub_months(Months::new(years.saturating_mul(12)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            p.date >= cutoff
        }
        Period::Year(year) => p.date.year() == year,
    };

    points
        .iter()
        .filter(|p| keep(*p))
        .enumerate()
        .map(|(i, p)| DrawPoint {
            index: i + 1,
            ..p.clone()
        })
        .collect()
}

/// Axis bounds for a set of scores.
///
/// Pads by 1% of the range (at least 1), then rounds outward to the power of
/// ten at or below the range. Empty input gives `0..=100`.
pub fn chart_domain<I>(scores: I) -> ChartDomain
where
    I: IntoIterator<Item = u64>,
{
    let mut iter = scores.into_iter();
    let Some(first) = iter.next() else {
        return ChartDomain { min: 0, max: 100 };
    };
    let (min, max) = iter.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s)));
    let (min, max) = (min as i64, max as i64);

    let range = (max - min).max(1);
    let mut magnitude: i64 = 1;
    while magnitude <= range / 10 {
        magnitude *= 10;
    }
    let padding = ((range + 99) / 100).max(1);

    let lower = (min - padding).div_euclid(magnitude) * magnitude;
    let upper = -((-(max + padding)).div_euclid(magnitude)) * magnitude;
    ChartDomain {
        min: lower,
        max: upper,
    }
}

/// For each year, twelve monthly invitation totals.
pub fn monthly_invitations(rounds: &[DashboardRound], years: &[i32]) -> Vec<InvitationPoint> {
    let mut out = Vec::with_capacity(years.len() * 12);
    for &year in years {
        let mut totals = [0u64; 12];
        for round in rounds.iter().filter(|r| r.draw_date.year() == year) {
            totals[round.draw_date.month0() as usize] += round.invitations;
        }
        out.extend(totals.iter().enumerate().map(|(month, &invitations)| {
            InvitationPoint {
                year,
                month: month as u32,
                invitations,
            }
        }));
    }
    out
}

/// Pool counts for the buckets in `view`, in view order.
pub fn pool_distribution(round: &DashboardRound, view: PoolView) -> Vec<PoolPoint> {
    view.buckets()
        .iter()
        .filter_map(|&dd| POOL_RANGES.iter().find(|b| b.dd == dd))
        .map(|bucket| PoolPoint {
            range: bucket.range,
            count: round.pool[bucket.dd - 1],
        })
        .collect()
}

fn distinct_years(rounds: &[DashboardRound]) -> Vec<i32> {
    let mut years: Vec<i32> = rounds.iter().map(|r| r.draw_date.year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}
