//! Recovery of the latest incident message from Ayd's status feed.
//!
//! Used when the supervisor handed over a record without a message. The
//! lookup is best effort: every failure degrades to an empty message.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::LookupError;

/// Status feed location, relative to the Ayd base URL.
pub const STATUS_FEED_PATH: &str = "status.json";

/// Timeout for the status feed request.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Deserialize)]
struct StatusFeed {
    #[serde(default, alias = "incidents")]
    current_incidents: Vec<Incident>,
    #[serde(default)]
    incident_history: Vec<Incident>,
}

/// One incident entry of the status feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Incident {
    pub target: String,
    #[serde(default)]
    pub message: String,
}

/// Result of a lookup: always a message, plus the reason if it is empty
/// because something went wrong.
#[derive(Debug, Default)]
pub struct LookupOutcome {
    pub message: String,
    pub error: Option<LookupError>,
}

/// Client for the status feed.
#[derive(Debug, Clone)]
pub struct IncidentLookup {
    client: reqwest::Client,
}

impl IncidentLookup {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a lookup with its own HTTP client.
    pub fn with_default_client() -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .map_err(|e| LookupError::Request(e.to_string()))?;
        Ok(Self::new(client))
    }

    /// Message of the latest incident for `target`, or an empty string.
    ///
    /// Never fails. A fetch or decode problem is returned alongside the
    /// empty message so the caller can mention it.
    pub async fn find_message(&self, base_url: &str, target: &str) -> LookupOutcome {
        match self.fetch_message(base_url, target).await {
            Ok(Some(message)) => LookupOutcome {
                message,
                error: None,
            },
            Ok(None) => {
                tracing::debug!(target_url = %target, "no incident found in status feed");
                LookupOutcome::default()
            }
            Err(error) => {
                tracing::warn!(error = %error, base_url = %base_url, "incident lookup failed");
                LookupOutcome {
                    message: String::new(),
                    error: Some(error),
                }
            }
        }
    }

    async fn fetch_message(
        &self,
        base_url: &str,
        target: &str,
    ) -> Result<Option<String>, LookupError> {
        let feed_url = Url::parse(base_url)
            .and_then(|base| base.join(STATUS_FEED_PATH))
            .map_err(|e| LookupError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let response = self
            .client
            .get(feed_url)
            .send()
            .await
            .map_err(|e| LookupError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let feed: StatusFeed = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        Ok(find_in_feed(&feed, target))
    }
}

// Current incidents take priority over history.
fn find_in_feed(feed: &StatusFeed, target: &str) -> Option<String> {
    feed.current_incidents
        .iter()
        .chain(feed.incident_history.iter())
        .find(|incident| incident.target == target)
        .map(|incident| incident.message.clone())
}
