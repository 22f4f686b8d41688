// src/pipeline/harvest.rs

//! Harvest pipeline: directory → fetch → expand → merge → persist.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::error::{CommunityFetchError, Result};
use crate::models::{CommunityRecord, Config, Directory, Summary};
use crate::services::{DirectoryLoader, Harvester, locations};
use crate::storage::{self, SummaryStore};
use crate::utils::time;

/// Counts from one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub communities: usize,
    pub fetched: usize,
    pub failed: usize,
    pub synthetic: usize,
    pub removed: usize,
    pub snapshot: Option<PathBuf>,
}

/// Run one complete harvest and persist the merged summary.
pub async fn run_harvest(config: &Config, client: &Client) -> Result<HarvestReport> {
    let started_at = time::now();

    let directory = DirectoryLoader::new(client.clone())
        .load(&config.directory.url, config.directory.timeout())
        .await?;

    let store = SummaryStore::from_config(&config.paths);
    let mut summary = store.load().await?;

    let snapshot = match store.snapshot(&started_at).await {
        Ok(Some(path)) => {
            log::info!("Previous summary saved to {}", path.display());
            Some(path)
        }
        Ok(None) => None,
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    };

    let removed = storage::collect_garbage(&mut summary, &directory);
    for id in &removed {
        log::info!("{} is not in the directory anymore and was removed from the summary", id);
    }

    let harvester = Harvester::new(client.clone(), &config.harvest, started_at)?;
    let harvested = harvest_all(
        &harvester,
        &directory,
        &summary,
        config.harvest.max_concurrent,
        config.harvest.deadline(),
    )
    .await;

    let mut report = HarvestReport {
        communities: directory.len(),
        removed: removed.len(),
        snapshot,
        ..HarvestReport::default()
    };

    let mut records = Vec::with_capacity(harvested.len());
    for (id, record) in harvested {
        if record.is_fresh() {
            report.fetched += 1;
        } else {
            report.failed += 1;
        }

        for (synthetic_id, synthetic) in locations::expand(&id, &record) {
            if directory.contains(&synthetic_id) {
                log::warn!(
                    "Additional location {} of {} collides with a directory id, skipped",
                    synthetic_id,
                    id
                );
                continue;
            }
            report.synthetic += 1;
            records.push((synthetic_id, synthetic));
        }
        records.push((id, record));
    }

    storage::merge(&mut summary, records);

    store.persist(&summary).await?;

    Ok(report)
}

/// Fetch every directory entry on a bounded pool.
///
/// When `deadline` expires, in-flight fetches are dropped and every
/// unfinished community is recorded as a failed fetch.
async fn harvest_all(
    harvester: &Harvester,
    directory: &Directory,
    previous: &Summary,
    concurrency: usize,
    deadline: Option<Duration>,
) -> BTreeMap<String, CommunityRecord> {
    let mut results = BTreeMap::new();

    let mut fetches = stream::iter(directory.iter())
        .map(|(id, url)| {
            let prior = previous.get(id).cloned();
            async move { (id, harvester.fetch(id, url, prior).await) }
        })
        .buffer_unordered(concurrency.max(1));

    let expiry = async {
        match deadline {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(expiry);

    loop {
        tokio::select! {
            next = fetches.next() => match next {
                Some((id, record)) => {
                    results.insert(id.to_string(), record);
                }
                None => break,
            },
            () = &mut expiry => {
                log::warn!(
                    "Harvest deadline reached with {} of {} communities done",
                    results.len(),
                    directory.len()
                );
                break;
            }
        }
    }
    drop(fetches);

    for (id, url) in directory.iter() {
        if results.contains_key(id) {
            continue;
        }
        let error = CommunityFetchError::Cancelled {
            url: url.to_string(),
        };
        log::warn!("Error reading community api file {} ({}): {}", url, id, error);
        let record = CommunityRecord::stale(
            id,
            previous.get(id).cloned(),
            harvester.fetched_at(),
            &error,
        );
        results.insert(id.to_string(), record);
    }

    results
}
