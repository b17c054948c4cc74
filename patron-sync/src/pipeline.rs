//! Fetch → classify → write
//!
//! Outputs are all-or-nothing: the writer is not constructed until the
//! fetch has fully succeeded, so a failed run leaves the previous files
//! exactly as they were.

use crate::classifier::{classify_all, Tier, TierCounts};
use crate::error::SyncResult;
use crate::fetcher::PatreonClient;
use crate::writer::{tier_csv_file_name, OutputWriter};
use chrono::{DateTime, Utc};
use patron_common::config::SyncConfig;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub fetched: usize,
    pub counts: TierCounts,
    pub files: Vec<PathBuf>,
}

/// Run one sync against the configured API
pub async fn run(config: &SyncConfig, now: DateTime<Utc>) -> SyncResult<SyncSummary> {
    let client = PatreonClient::new(config)?;
    run_with_client(&client, &OutputWriter::new(&config.data_dir), now).await
}

/// Run one sync with an explicit client and writer
pub async fn run_with_client(
    client: &PatreonClient,
    writer: &OutputWriter,
    now: DateTime<Utc>,
) -> SyncResult<SyncSummary> {
    info!("Fetching patron data from membership API");
    let supporters = match client.fetch_active_supporters().await {
        Ok(supporters) => supporters,
        Err(e) => {
            error!(error = %e, "Fetch failed; leaving existing outputs untouched");
            return Err(e.into());
        }
    };
    let fetched = supporters.len();

    info!(supporters = fetched, now = %now, "Classifying supporters by tenure");
    let classified = classify_all(supporters, now);
    let counts = TierCounts::from_classified(&classified);

    let report = writer.write_all(&classified)?;
    for tier in Tier::ALL {
        debug!(
            tier = %tier,
            file = tier_csv_file_name(tier),
            names = counts.get(tier),
            "Tier file written"
        );
    }

    info!(
        data_dir = %writer.data_dir().display(),
        boreas = counts.boreas,
        zephyrus = counts.zephyrus,
        notus = counts.notus,
        "Patron data updated"
    );

    Ok(SyncSummary {
        fetched,
        counts,
        files: report.files,
    })
}
