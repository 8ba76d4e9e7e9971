//! Core types and trait definitions for the identification engine
//!
//! The enrichment layer talks to every lookup backend through one seam,
//! [`MetadataSource`], so the local reference database and the remote catalog
//! are interchangeable and tests can substitute deterministic stubs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A series hit returned by a metadata source
///
/// `id` is source-local (a reference-database row id or a remote volume id)
/// and is only meaningful for follow-up calls to the same source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesCandidate {
    /// Source-local series/volume identifier
    pub id: i64,
    /// Series name as the source spells it
    pub name: String,
    /// Publisher name, when the source knows it
    pub publisher: Option<String>,
    /// First publication year
    pub year_began: Option<u16>,
    /// Number of issues the source has for this series
    pub issue_count: Option<u32>,
}

/// Issue-level details from a metadata source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueDetails {
    /// Issue title (often empty for untitled issues)
    pub title: Option<String>,
    /// Publication date string as stored by the source (e.g. "2012-03")
    pub publication_date: Option<String>,
    /// Plot synopsis
    pub synopsis: Option<String>,
    /// Genre text
    pub genre: Option<String>,
    /// Character appearances, source-formatted
    pub characters: Option<String>,
}

/// A creator credit on an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
    /// Role text, e.g. "script", "pencils", "cover"
    pub role: String,
}

/// Error from a metadata source call
///
/// Every variant is survivable: the enrichment layer logs it and continues
/// with whatever metadata was already known. Timeouts surface as `Network`.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Network communication failed or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// The source answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The source is throttling requests
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Response could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The source is not configured or not connected
    #[error("Source not available: {0}")]
    NotAvailable(String),

    /// Backing database query failed
    #[error("Database error: {0}")]
    Database(String),
}

/// A queryable metadata backend (local reference database, remote catalog)
///
/// Sources are consulted in priority order by the enrichment layer; each
/// call is independent and a failure from one source never prevents the next
/// from being tried.
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    /// Source name for logging and provenance
    fn name(&self) -> &'static str;

    /// Search for series matching `name`
    ///
    /// # Returns
    /// Candidates in source-preferred order; empty when nothing matched.
    ///
    /// # Errors
    /// Returns `LookupError` when the source cannot be queried; the caller
    /// degrades to "no enrichment" for this source.
    async fn search_series(&self, name: &str) -> Result<Vec<SeriesCandidate>, LookupError>;

    /// Fetch issue-level details for a series previously returned by
    /// `search_series` on the same source
    ///
    /// # Returns
    /// `None` when the source knows the series but not this issue.
    async fn issue_details(
        &self,
        series_id: i64,
        issue_number: &str,
    ) -> Result<Option<IssueDetails>, LookupError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_display() {
        let err = LookupError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "API error (status 503): unavailable");

        let err = LookupError::NotAvailable("reference db not connected".to_string());
        assert!(err.to_string().contains("not available"));
    }

    #[test]
    fn test_series_candidate_serde_roundtrip() {
        let candidate = SeriesCandidate {
            id: 42,
            name: "Saga".to_string(),
            publisher: Some("Image Comics".to_string()),
            year_began: Some(2012),
            issue_count: Some(66),
        };
        let json = serde_json::to_string(&candidate).unwrap();
        let back: SeriesCandidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 42);
        assert_eq!(back.publisher.as_deref(), Some("Image Comics"));
    }
}
