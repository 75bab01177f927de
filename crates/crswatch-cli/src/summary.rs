//! Terminal rendering of the dashboard views.
//!
//! Prints the same four panels the web dashboard charts: latest round, the
//! cutoff-score series for one category, monthly invitations for one year,
//! and the candidate pool of the latest round.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Datelike, Utc};
use clap::Args;
use crswatch_core::views::{SHORT_MONTHS, chart_domain};
use crswatch_core::{Dashboard, Period, PoolView};
use crswatch_store::{DEFAULT_DATA_FILE, JsonStore};

const POOL_HISTORY_ROWS: usize = 5;

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Persisted rounds document.
    #[arg(long, env = "CRSWATCH_DATA_FILE", default_value = DEFAULT_DATA_FILE)]
    data: PathBuf,

    /// Category to chart (defaults to the dashboard's default category).
    #[arg(long)]
    category: Option<String>,

    /// Time window: ALL, 1Y, 2Y, or a year.
    #[arg(long, default_value = "1Y")]
    period: Period,

    /// Year for monthly invitation totals (defaults to the newest year).
    #[arg(long)]
    year: Option<i32>,

    /// Pool buckets to show: compact or detailed.
    #[arg(long, default_value = "compact")]
    pool_view: PoolView,
}

pub fn run(args: &SummaryArgs) -> anyhow::Result<()> {
    let store = JsonStore::new(&args.data);
    let stored = store
        .load()
        .with_context(|| format!("loading {}", args.data.display()))?;
    let dashboard = Dashboard::new(&stored.payload);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Data updated {}", stored.updated_at.format("%Y-%m-%d %H:%M UTC"))?;
    writeln!(out)?;
    render(&mut out, &dashboard, args, Utc::now())
}

fn render(
    out: &mut impl Write,
    dashboard: &Dashboard,
    args: &SummaryArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let Some(latest) = dashboard.latest() else {
        writeln!(out, "No rounds since 2020.")?;
        return Ok(());
    };

    writeln!(out, "=== Round {} ===", latest.draw_number)?;
    writeln!(out, "  {:<14} {}", "date", latest.draw_date_full)?;
    writeln!(out, "  {:<14} {}", "category", latest.category)?;
    writeln!(out, "  {:<14} {}", "cutoff", latest.score)?;
    writeln!(out, "  {:<14} {}", "invitations", latest.invitations)?;
    writeln!(out)?;

    let categories: Vec<&str> = dashboard.categories().collect();
    writeln!(out, "Categories: {}", categories.join(", "))?;
    writeln!(out)?;

    let category = match args.category.as_deref().or(dashboard.default_category()) {
        Some(c) => c,
        None => return Ok(()),
    };
    let points = dashboard.draws(category, args.period, now);
    writeln!(out, "Cutoff scores: {category} ({})", args.period)?;
    if points.is_empty() {
        writeln!(out, "  no draws in this window")?;
    } else {
        let domain = chart_domain(points.iter().map(|p| p.score));
        writeln!(out, "  axis {}..{}", domain.min, domain.max)?;
        for p in &points {
            writeln!(
                out,
                "  {:>3}  {}  {:>4}  {:>6}",
                p.index,
                p.date.format("%Y-%m-%d"),
                p.score,
                p.invitations
            )?;
        }
    }
    writeln!(out)?;

    let year = args
        .year
        .or_else(|| dashboard.years().first().copied())
        .unwrap_or_else(|| latest.draw_date.year());
    let months = dashboard.invitations_for(year);
    let total: u64 = months.iter().map(|m| m.invitations).sum();
    writeln!(out, "Invitations {year}: {total}")?;
    for m in &months {
        writeln!(out, "  {}  {:>6}", SHORT_MONTHS[m.month as usize], m.invitations)?;
    }
    writeln!(out)?;

    writeln!(out, "Candidate pool ({}): {} total", args.pool_view, latest.total_candidates)?;
    for bucket in dashboard.latest_pool(args.pool_view) {
        writeln!(out, "  {:<10} {:>7}", bucket.range, bucket.count)?;
    }
    writeln!(out)?;

    writeln!(out, "Pool snapshots")?;
    for round in dashboard.pool_history().iter().take(POOL_HISTORY_ROWS) {
        writeln!(out, "  {:<20} {:>7}", round.distribution_date, round.total_candidates)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::Parser;
    use crswatch_core::{BUCKET_KEYS, validate_feed};
    use serde_json::{Value, json};

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SummaryArgs,
    }

    fn raw_round(n: &str, date: &str, name: &str, crs: &str, size: &str, dist: &str) -> Value {
        let mut round = json!({
            "drawNumber": n,
            "drawNumberURL": "",
            "drawDate": date,
            "drawDateFull": date,
            "drawName": name,
            "drawSize": size,
            "drawCRS": crs,
            "mitext": "",
            "DrawText1": "",
            "drawText2": "",
            "drawDateTime": "",
            "drawCutOff": "",
            "drawDistributionAsOn": dist,
        });
        for (i, key) in BUCKET_KEYS.iter().enumerate() {
            round[*key] = json!(format!("{}", (i + 1) * 10));
        }
        round
    }

    fn dashboard() -> Dashboard {
        let raw = json!({
            "classes": "",
            "rounds": [
                raw_round(
                    "305",
                    "2024-06-19",
                    "Healthcare occupations (Version 2)",
                    "739",
                    "500",
                    "June 16, 2024",
                ),
                raw_round(
                    "304",
                    "2024-06-11",
                    "Canadian Experience Class",
                    "549",
                    "3,000",
                    "June 9, 2024",
                ),
                raw_round(
                    "303",
                    "2024-05-30",
                    "Canadian Experience Class",
                    "522",
                    "2,985",
                    "June 9, 2024",
                ),
            ],
        });
        Dashboard::new(&validate_feed(&raw).unwrap())
    }

    fn rendered(argv: &[&str]) -> String {
        let harness = Harness::parse_from(argv);
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        let mut buf = Vec::new();
        render(&mut buf, &dashboard(), &harness.args, now).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn renders_all_panels() {
        let text = rendered(&["crswatch", "--category", "Canadian Experience Class"]);
        assert!(text.contains("=== Round 305 ==="));
        assert!(text.contains("Categories: Canadian Experience Class, Healthcare (V2)"));
        assert!(text.contains("Cutoff scores: Canadian Experience Class (1Y)"));
        assert!(text.contains("axis 520..550"));
        assert!(text.contains("Invitations 2024: 6485"));
        assert!(text.contains("Candidate pool (Compact): 180 total"));
        assert!(text.contains("0-300"));
    }

    #[test]
    fn pool_history_dedupes_snapshots() {
        let text = rendered(&["crswatch"]);
        let snapshots = text.split("Pool snapshots").nth(1).unwrap();
        assert_eq!(snapshots.matches("June 9, 2024").count(), 1);
        assert_eq!(snapshots.matches("June 16, 2024").count(), 1);
    }

    #[test]
    fn default_category_and_detailed_pool() {
        let text = rendered(&["crswatch", "--pool-view", "detailed", "--period", "ALL"]);
        assert!(text.contains("Cutoff scores: Healthcare (V2) (ALL)"));
        assert!(text.contains("Candidate pool (Detailed)"));
        assert!(text.contains("409-410"));
    }

    #[test]
    fn empty_window_is_reported() {
        let text = rendered(&["crswatch", "--period", "2021"]);
        assert!(text.contains("no draws in this window"));
    }

    #[test]
    fn rejects_unknown_period() {
        assert!(Harness::try_parse_from(["crswatch", "--period", "5Y"]).is_err());
    }
}
