//! Best-effort "I ran" ping to an external monitor.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

const CHECKIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pings a monitoring URL after a successful query. Failures are logged and
/// never reach the caller.
#[derive(Debug, Clone)]
pub struct CheckIn {
    http: Client,
    url: Option<String>,
}

impl CheckIn {
    pub fn new(url: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(CHECKIN_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "falling back to default HTTP client for check-ins");
                Client::new()
            });
        Self { http, url: url.filter(|u| !u.trim().is_empty()) }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Returns whether the monitor acknowledged the ping.
    pub async fn ping(&self) -> bool {
        let Some(url) = &self.url else {
            return false;
        };

        match self.http.get(url).send().await {
            Ok(res) if res.status().is_success() => {
                debug!(url, "check-in sent");
                true
            }
            Ok(res) => {
                warn!(url, status = res.status().as_u16(), "check-in rejected");
                false
            }
            Err(err) => {
                warn!(url, error = %err, "check-in failed");
                false
            }
        }
    }
}
