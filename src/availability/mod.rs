//! Exam-slot availability retrieval
//!
//! One authenticated GET per cycle against the portal's events endpoint,
//! bounded to the configured look-ahead window. Any non-success status or
//! undecodable payload is fatal for the cycle; there is no retry here, the
//! outer schedule is the retry.

pub mod report;

use reqwest::header::COOKIE;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::models::{ExamSlot, ExamWindow};
use crate::session::SessionCookies;

pub use report::{Analysis, AvailabilityAnalyzer, Report};

/// Path of the availability endpoint, relative to the portal base URL.
const EVENTS_PATH: &str = "/api/getEventsBetweenDates";

/// Errors that can occur while fetching availability data
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response status
    #[error("portal answered with status {0}")]
    Status(u16),

    /// Payload did not decode as a slot list
    #[error("undecodable availability payload: {0}")]
    Decode(String),

    /// Endpoint URL could not be built
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

/// Fetches the exam-slot list for a window using the session cookies.
pub struct AvailabilityFetcher {
    client: Client,
    base_url: String,
}

impl AvailabilityFetcher {
    /// Create a fetcher for the given portal base URL.
    ///
    /// Certificate verification is disabled on this client: the portal
    /// presents a chain the system trust store rejects. This applies to
    /// portal traffic only; mail transport stays fully verified.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Retrieve all slots within `window`, authenticated by `cookies`.
    pub async fn fetch(
        &self,
        cookies: &SessionCookies,
        window: &ExamWindow,
    ) -> Result<Vec<ExamSlot>, FetchError> {
        let mut url = Url::parse(&format!("{}{EVENTS_PATH}", self.base_url))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("startDate", &window.start_param())
            .append_pair("endDate", &window.end_param());

        tracing::debug!(url = %url, "fetching exam availability");

        let response = self
            .client
            .get(url)
            .header(COOKIE, cookie_header(cookies))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let slots: Vec<ExamSlot> =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::debug!(slots = slots.len(), "availability payload decoded");
        Ok(slots)
    }
}

fn cookie_header(cookies: &SessionCookies) -> String {
    let mut pairs: Vec<String> = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    // HashMap iteration order is arbitrary; keep the header deterministic.
    pairs.sort();
    pairs.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_is_sorted_and_joined() {
        let mut cookies = SessionCookies::new();
        cookies.insert("b".to_string(), "2".to_string());
        cookies.insert("a".to_string(), "1".to_string());

        assert_eq!(cookie_header(&cookies), "a=1; b=2");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let fetcher =
            AvailabilityFetcher::new("https://portal.example.com/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(fetcher.base_url, "https://portal.example.com");
    }
}
