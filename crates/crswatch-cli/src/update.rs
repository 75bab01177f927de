//! Refresh pipeline: fetch the feed, validate it, reconcile with the store.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use crswatch_core::validate_feed;
use crswatch_store::{DEFAULT_DATA_FILE, JsonStore, Reconciliation, reconcile};
use crswatch_sync::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT};
use crswatch_sync::{FEED_URL, FeedSource, FileSource, HttpSource, RetryPolicy};
use tracing::{error, info};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Read the feed from this JSON file instead of the network.
    #[arg(long, value_name = "PATH")]
    from_file: Option<PathBuf>,

    /// Persisted rounds document.
    #[arg(long, env = "CRSWATCH_DATA_FILE", default_value = DEFAULT_DATA_FILE)]
    data: PathBuf,

    /// Feed endpoint.
    #[arg(long, env = "CRSWATCH_FEED_URL", default_value = FEED_URL)]
    url: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Maximum number of fetch attempts.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    retries: u32,

    /// Base backoff; attempt n waits n times this long.
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_millis() as u64)]
    retry_delay_ms: u64,
}

impl UpdateArgs {
    fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retries,
            timeout: Duration::from_secs(self.timeout_secs),
            base_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    fn source(&self) -> Box<dyn FeedSource> {
        match &self.from_file {
            Some(path) => Box::new(FileSource::new(path)),
            None => Box::new(HttpSource::new(&self.url, self.policy())),
        }
    }
}

pub async fn run(args: UpdateArgs) -> anyhow::Result<()> {
    let source = args.source();
    let store = JsonStore::new(&args.data);
    match refresh(source.as_ref(), &store, Utc::now()).await? {
        Reconciliation::Updated { previous, current } => {
            eprintln!("  Updated {}: draw {previous} -> {current}", args.data.display());
        }
        Reconciliation::Unchanged { persisted, .. } => {
            eprintln!("  No new draw (latest is {persisted}); nothing written.");
        }
    }
    Ok(())
}

/// Run one fetch, validate, reconcile pass against `store`.
pub async fn refresh(
    source: &dyn FeedSource,
    store: &JsonStore,
    now: DateTime<Utc>,
) -> anyhow::Result<Reconciliation> {
    info!(source = %source.describe(), "fetching feed");
    let raw = source.fetch().await.context("fetching rounds feed")?;

    info!("validating and transforming feed");
    let feed = match validate_feed(&raw) {
        Ok(feed) => feed,
        Err(errors) => {
            error!(issues = errors.len(), "schema validation failed");
            for issue in errors.issues() {
                error!("  - {issue}");
            }
            return Err(errors.into());
        }
    };
    info!(rounds = feed.rounds.len(), "schema validation passed");

    reconcile(store, feed, now)
        .with_context(|| format!("reconciling with {}", store.path().display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::Parser;
    use crswatch_core::{BUCKET_KEYS, StoredFeed, ValidationErrors};
    use serde_json::{Value, json};

    fn raw_round(draw_number: &str, crs: &str) -> Value {
        let mut round = json!({
            "drawNumber": draw_number,
            "drawNumberURL": "",
            "drawDate": "2025-06-10",
            "drawDateFull": "June 10, 2025",
            "drawName": "Canadian Experience Class",
            "drawSize": "3,000",
            "drawCRS": crs,
            "mitext": "",
            "DrawText1": "",
            "drawText2": "",
            "drawDateTime": "",
            "drawCutOff": "",
            "drawDistributionAsOn": "June 8, 2025",
        });
        for key in BUCKET_KEYS {
            round[key] = json!("2,048");
        }
        round
    }

    fn write_json(path: &std::path::Path, value: &Value) {
        std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    }

    /// Seed a store whose newest draw is `draw_number`, via the validator.
    fn seed_store(dir: &std::path::Path, draw_number: &str) -> JsonStore {
        let raw = json!({ "classes": "", "rounds": [raw_round(draw_number, "529")] });
        let feed = validate_feed(&raw).unwrap();
        let store = JsonStore::new(dir.join("data.json"));
        store
            .save(&StoredFeed {
                updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                payload: feed,
            })
            .unwrap();
        store
    }

    #[tokio::test]
    async fn newer_feed_from_file_is_adopted() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seed_store(tmp.path(), "350");
        let feed_path = tmp.path().join("feed.json");
        write_json(
            &feed_path,
            &json!({
                "classes": "",
                "rounds": [raw_round("351", "1,234"), raw_round("350", "529")],
            }),
        );

        let now = Utc.with_ymd_and_hms(2025, 6, 11, 8, 30, 0).unwrap();
        let outcome = refresh(&FileSource::new(&feed_path), &store, now)
            .await
            .unwrap();
        assert!(outcome.is_updated());

        let stored = store.load().unwrap();
        assert_eq!(stored.payload.rounds.len(), 2);
        assert_eq!(stored.payload.rounds[0].draw_crs.get(), 1234);
        assert_eq!(stored.updated_at, now);
    }

    #[tokio::test]
    async fn same_draw_is_a_no_op() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seed_store(tmp.path(), "350");
        let before = std::fs::read(store.path()).unwrap();
        let feed_path = tmp.path().join("feed.json");
        write_json(&feed_path, &json!({ "classes": "", "rounds": [raw_round("350", "529")] }));

        let outcome = refresh(&FileSource::new(&feed_path), &store, Utc::now())
            .await
            .unwrap();
        assert!(!outcome.is_updated());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn invalid_feed_fails_without_writing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seed_store(tmp.path(), "350");
        let before = std::fs::read(store.path()).unwrap();
        let feed_path = tmp.path().join("feed.json");
        write_json(&feed_path, &json!({ "classes": "", "rounds": [raw_round("351", "5O0")] }));

        let err = refresh(&FileSource::new(&feed_path), &store, Utc::now())
            .await
            .unwrap_err();
        let validation = err.downcast_ref::<ValidationErrors>().unwrap();
        assert!(validation.has_path("rounds.0.drawCRS"));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn missing_input_file_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seed_store(tmp.path(), "350");

        let err = refresh(&FileSource::new(tmp.path().join("absent.json")), &store, Utc::now())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("absent.json"));
    }

    #[tokio::test]
    async fn missing_store_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let feed_path = tmp.path().join("feed.json");
        write_json(&feed_path, &json!({ "classes": "", "rounds": [raw_round("1", "500")] }));
        let store = JsonStore::new(tmp.path().join("data.json"));

        let err = refresh(&FileSource::new(&feed_path), &store, Utc::now())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("store file not found"));
        assert!(!store.path().exists());
    }

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: UpdateArgs,
    }

    #[test]
    fn flag_defaults() {
        let harness = Harness::parse_from(["crswatch"]);
        let policy = harness.args.policy();
        assert_eq!(policy, RetryPolicy::default());
        assert!(harness.args.from_file.is_none());
    }

    #[test]
    fn flags_override_policy() {
        let harness = Harness::parse_from([
            "crswatch",
            "--from-file",
            "feed.json",
            "--retries",
            "5",
            "--retry-delay-ms",
            "250",
            "--timeout-secs",
            "3",
        ]);
        let policy = harness.args.policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.timeout, Duration::from_secs(3));
        assert_eq!(harness.args.source().describe(), "file feed.json");
    }
}
