//! ComicVine API client
//!
//! Remote metadata source for the enrichment layer. Treated as unreliable:
//! network failures, timeouts, and rate-limit responses surface as
//! [`LookupError`] and the pipeline degrades to "no enrichment."
//!
//! Rate limiting is enforced client-side at 1 request/second with a token
//! bucket, per ComicVine usage guidelines.

use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::types::{IssueDetails, LookupError, MetadataSource, SeriesCandidate};

const DEFAULT_BASE_URL: &str = "https://comicvine.gamespot.com/api";

/// Total request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Connection establishment timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// ComicVine volume search response envelope
#[derive(Debug, Deserialize)]
struct CvEnvelope<T> {
    status_code: i32,
    #[serde(default)]
    error: String,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CvVolume {
    id: i64,
    name: String,
    #[serde(default)]
    start_year: Option<String>,
    #[serde(default)]
    publisher: Option<CvPublisher>,
    #[serde(default)]
    count_of_issues: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CvPublisher {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CvIssue {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cover_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// ComicVine API client
pub struct ComicVineClient {
    client: Client,
    base_url: String,
    api_key: String,
    user_agent: String,
    /// 1 request/second token bucket
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl ComicVineClient {
    /// Create a client with the configured API key
    ///
    /// # Errors
    /// `NotAvailable` when the HTTP client cannot be built.
    pub fn new(api_key: String) -> Result<Self, LookupError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against an alternate base URL (used by tests)
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LookupError::NotAvailable(format!("HTTP client build failed: {}", e)))?;

        let quota = Quota::per_second(NonZeroU32::new(1).expect("1 is non-zero"));

        Ok(Self {
            client,
            base_url,
            api_key,
            user_agent: longbox_common::config::user_agent(),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    /// Build the volume-search URL for a series name
    fn search_url(&self, name: &str) -> String {
        format!(
            "{}/search/?api_key={}&format=json&resources=volume&limit=10&query={}",
            self.base_url,
            self.api_key,
            urlencode(name)
        )
    }

    /// Build the issue-filter URL for a volume and issue number
    fn issues_url(&self, volume_id: i64, issue_number: &str) -> String {
        format!(
            "{}/issues/?api_key={}&format=json&filter=volume:{},issue_number:{}",
            self.base_url,
            self.api_key,
            volume_id,
            urlencode(issue_number)
        )
    }

    async fn get_envelope<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<CvEnvelope<T>, LookupError> {
        // Token bucket: waits until a permit is available
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 420 || status.as_u16() == 429 {
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            return Err(LookupError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let envelope: CvEnvelope<T> = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;

        // ComicVine signals application errors in the body (1 = OK)
        if envelope.status_code != 1 {
            return Err(LookupError::Api {
                status: u16::try_from(envelope.status_code).unwrap_or(0),
                message: envelope.error.clone(),
            });
        }

        Ok(envelope)
    }
}

#[async_trait::async_trait]
impl MetadataSource for ComicVineClient {
    fn name(&self) -> &'static str {
        "comicvine"
    }

    async fn search_series(&self, name: &str) -> Result<Vec<SeriesCandidate>, LookupError> {
        let url = self.search_url(name);
        tracing::debug!(series = name, "Querying ComicVine volume search");

        let envelope: CvEnvelope<CvVolume> = self.get_envelope(&url).await?;

        Ok(envelope
            .results
            .into_iter()
            .map(|v| SeriesCandidate {
                id: v.id,
                name: v.name,
                publisher: v.publisher.map(|p| p.name),
                year_began: v.start_year.as_deref().and_then(|y| y.parse().ok()),
                issue_count: v.count_of_issues,
            })
            .collect())
    }

    async fn issue_details(
        &self,
        series_id: i64,
        issue_number: &str,
    ) -> Result<Option<IssueDetails>, LookupError> {
        let url = self.issues_url(series_id, issue_number);
        tracing::debug!(volume = series_id, issue = issue_number, "Querying ComicVine issues");

        let envelope: CvEnvelope<CvIssue> = self.get_envelope(&url).await?;

        Ok(envelope.results.into_iter().next().map(|issue| IssueDetails {
            title: issue.name,
            publication_date: issue.cover_date,
            synopsis: issue.description.map(strip_html),
            genre: None,
            characters: None,
        }))
    }
}

/// Minimal percent-encoding for query values
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Drop HTML tags from a ComicVine description
fn strip_html(text: String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_query() {
        let client = ComicVineClient::new("KEY".to_string()).unwrap();
        let url = client.search_url("Amazing Spider-Man");
        assert!(url.contains("query=Amazing%20Spider-Man"));
        assert!(url.contains("resources=volume"));
        assert!(url.contains("api_key=KEY"));
    }

    #[test]
    fn test_issues_url_filters_volume_and_number() {
        let client = ComicVineClient::new("KEY".to_string()).unwrap();
        let url = client.issues_url(42, "7.1");
        assert!(url.contains("filter=volume:42,issue_number:7.1"));
    }

    #[test]
    fn test_volume_response_deserializes() {
        let json = r#"{
            "status_code": 1,
            "error": "OK",
            "results": [{
                "id": 43613,
                "name": "Saga",
                "start_year": "2012",
                "publisher": {"name": "Image Comics"},
                "count_of_issues": 66
            }]
        }"#;
        let envelope: CvEnvelope<CvVolume> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status_code, 1);
        let volume = &envelope.results[0];
        assert_eq!(volume.id, 43613);
        assert_eq!(volume.start_year.as_deref(), Some("2012"));
        assert_eq!(volume.publisher.as_ref().unwrap().name, "Image Comics");
    }

    #[test]
    fn test_error_envelope_deserializes() {
        let json = r#"{"status_code": 100, "error": "Invalid API Key", "results": []}"#;
        let envelope: CvEnvelope<CvVolume> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status_code, 100);
        assert_eq!(envelope.error, "Invalid API Key");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Two soldiers   fall in <em>love</em>.</p>".to_string()),
            "Two soldiers fall in love."
        );
    }

    #[tokio::test]
    async fn test_rate_limiter_paces_requests() {
        let client = ComicVineClient::new("KEY".to_string()).unwrap();

        let start = std::time::Instant::now();
        client.rate_limiter.until_ready().await;
        client.rate_limiter.until_ready().await;
        // Second permit must wait for the 1/s bucket to refill
        assert!(start.elapsed() >= Duration::from_millis(900));
    }
}
