//! Per-feed retrieval: cache first, network second, decode always.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheKey, FeedCache},
    decode::decode_feed,
    error::{FeedError, FetchError},
    model::Station,
};

/// Upper bound on a single feed request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can GET a feed body.
#[async_trait]
pub trait FeedTransport: Send + Sync + Debug {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// `reqwest`-backed transport with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fueltracker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let body = res.bytes().await.map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok(body.to_vec())
    }
}

/// Fetches and decodes one feed at a time, consulting the cache first.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    transport: Arc<dyn FeedTransport>,
    cache: Arc<dyn FeedCache>,
}

impl FeedFetcher {
    pub fn new(transport: Arc<dyn FeedTransport>, cache: Arc<dyn FeedCache>) -> Self {
        Self { transport, cache }
    }

    /// Stations published at `url`.
    ///
    /// A cached body that no longer decodes is ignored in favour of a live
    /// fetch. A failed cache write is logged and otherwise ignored.
    pub async fn fetch(&self, url: &str) -> Result<Vec<Station>, FeedError> {
        let key = CacheKey::for_source(url);

        if let Some(entry) = self.cache.get(&key) {
            match decode_feed(&entry.body) {
                Ok(stations) => {
                    debug!(url, expires_at = %entry.expires_at(), "using cached feed");
                    return Ok(stations);
                }
                Err(err) => {
                    warn!(url, error = %err, "cached feed failed to decode, refetching");
                }
            }
        }

        info!(url, "fetching feed");
        let body = self.transport.get(url).await?;

        if let Err(err) = self.cache.put(&key, &body) {
            warn!(url, error = %err, "failed to write feed cache");
        }

        Ok(decode_feed(&body)?)
    }
}
