//! Fan-out over every configured feed.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{feed::FeedFetcher, model::Station};

/// One configured retailer feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { name: name.into(), url: url.into() }
    }
}

/// Merges all feeds into one station list.
///
/// Sources are fetched concurrently but merged in configured order, each
/// keeping its own feed order. A failing source is logged and contributes
/// nothing. Stations listed by more than one feed appear once per feed.
#[derive(Debug, Clone)]
pub struct Aggregator {
    fetcher: FeedFetcher,
    sources: Vec<FeedSource>,
}

impl Aggregator {
    pub fn new(fetcher: FeedFetcher, sources: Vec<FeedSource>) -> Self {
        Self { fetcher, sources }
    }

    pub async fn aggregate_all(&self) -> Vec<Station> {
        let results = join_all(self.sources.iter().map(|s| self.fetcher.fetch(&s.url))).await;

        let mut merged = Vec::new();
        let mut failed = 0usize;
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(stations) => {
                    info!(source = %source.name, stations = stations.len(), "feed loaded");
                    merged.extend(stations);
                }
                Err(err) => {
                    failed += 1;
                    warn!(source = %source.name, url = %source.url, error = %err, "skipping feed");
                }
            }
        }

        info!(
            sources = self.sources.len(),
            failed,
            stations = merged.len(),
            "aggregation complete"
        );
        merged
    }
}
