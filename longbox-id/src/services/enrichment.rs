//! Reference enrichment
//!
//! Fills metadata gaps left by the knowledge-base matcher by consulting
//! lookup sources in priority order (local reference database first, then
//! the remote catalog). Merge policy: a source only fills fields that are
//! still null; fields the matcher set confidently are never overwritten.
//! Every source call may fail or time out; that degrades to "no enrichment"
//! for the source, never an engine-level error.

use std::sync::Arc;
use std::time::Duration;

use crate::models::comic::ComicMetadata;
use crate::models::knowledge::normalize_series_name;
use crate::services::confidence::SeriesOrigin;
use crate::services::filename_parser::{plausible_year, ParsedName};
use crate::services::knowledge_matcher::MatchOutcome;
use crate::types::{MetadataSource, SeriesCandidate};

/// Result of the enrichment stage for one file
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub metadata: ComicMetadata,
    /// How the series field ended up resolved
    pub origin: SeriesOrigin,
    /// Fields a source filled that were previously null
    pub filled: Vec<&'static str>,
    /// Fields where a source agreed with an already-set value
    pub agreed: Vec<&'static str>,
}

/// Enrich a matched (or unresolved) record
///
/// Seeds metadata from the matcher outcome and the parsed name, then walks
/// `sources` in order while any of series/publisher/year/summary is still
/// null. Each call is bounded by `timeout`; a timed-out or failed call is
/// logged at `warn` and skipped.
pub async fn enrich(
    parsed: &ParsedName,
    outcome: &MatchOutcome,
    sources: &[Arc<dyn MetadataSource>],
    timeout: Duration,
) -> Enrichment {
    let mut origin = match outcome {
        MatchOutcome::Exact(_) => SeriesOrigin::KnowledgeExact,
        MatchOutcome::Fuzzy { .. } => SeriesOrigin::KnowledgeFuzzy,
        MatchOutcome::Unresolved => SeriesOrigin::Unresolved,
    };

    let mut metadata = ComicMetadata {
        series: outcome.record().map(|r| r.series_name.clone()),
        issue: parsed.issue.clone(),
        year: parsed.year,
        publisher: outcome
            .record()
            .and_then(|r| r.publisher.clone())
            .or_else(|| parsed.publisher_hint.clone()),
        volume: parsed.volume,
        summary: None,
    };

    let mut filled = Vec::new();
    let mut agreed = Vec::new();

    // Search text: the canonical name when matched, the raw parse otherwise
    let query = metadata.series.clone().or_else(|| parsed.series.clone());
    let query = match query {
        Some(q) => q,
        None => {
            // No series candidate at all; nothing to look up
            return Enrichment {
                metadata,
                origin,
                filled,
                agreed,
            };
        }
    };

    for source in sources {
        if !needs_enrichment(&metadata) {
            break;
        }

        let candidates = match tokio::time::timeout(timeout, source.search_series(&query)).await {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(e)) => {
                tracing::warn!(source = source.name(), error = %e, "Enrichment lookup failed");
                continue;
            }
            Err(_) => {
                tracing::warn!(source = source.name(), "Enrichment lookup timed out");
                continue;
            }
        };

        let candidate = match pick_candidate(&candidates, metadata.publisher.as_deref()) {
            Some(candidate) => candidate,
            None => continue,
        };

        if metadata.series.is_none() {
            metadata.series = Some(candidate.name.clone());
            origin = SeriesOrigin::Enrichment;
            filled.push("series");
        }

        match (&metadata.publisher, &candidate.publisher) {
            (None, Some(publisher)) => {
                metadata.publisher = Some(publisher.clone());
                filled.push("publisher");
            }
            (Some(have), Some(got)) if publishers_agree(have, got) => agreed.push("publisher"),
            _ => {}
        }

        // Issue-level enrichment: skipped when the parsed issue number is
        // outside the source's issue count (renumbered runs are common, so
        // this is not treated as disagreement).
        let issue_in_range = match (&metadata.issue, candidate.issue_count) {
            (Some(issue), Some(count)) => issue
                .parse::<f64>()
                .map(|n| n <= count as f64)
                .unwrap_or(true),
            _ => true,
        };

        if let (Some(issue), true) = (metadata.issue.clone(), issue_in_range) {
            match tokio::time::timeout(timeout, source.issue_details(candidate.id, &issue)).await {
                Ok(Ok(Some(details))) => {
                    if metadata.summary.is_none() {
                        if let Some(synopsis) = details.synopsis {
                            metadata.summary = Some(synopsis);
                            filled.push("summary");
                        }
                    }
                    if let Some(year) = details
                        .publication_date
                        .as_deref()
                        .and_then(parse_leading_year)
                    {
                        match metadata.year {
                            None => {
                                metadata.year = Some(year);
                                filled.push("year");
                            }
                            Some(have) if have == year => agreed.push("year"),
                            Some(_) => {}
                        }
                    }
                }
                Ok(Ok(None)) => {
                    tracing::debug!(source = source.name(), issue, "Source has no such issue");
                }
                Ok(Err(e)) => {
                    tracing::warn!(source = source.name(), error = %e, "Issue lookup failed");
                }
                Err(_) => {
                    tracing::warn!(source = source.name(), "Issue lookup timed out");
                }
            }
        }

        if metadata.year.is_none() {
            if let Some(year) = candidate.year_began.filter(|y| plausible_year(*y)) {
                metadata.year = Some(year);
                filled.push("year");
            }
        }
    }

    Enrichment {
        metadata,
        origin,
        filled,
        agreed,
    }
}

/// True while a field enrichment could supply is still null
fn needs_enrichment(metadata: &ComicMetadata) -> bool {
    metadata.series.is_none()
        || metadata.publisher.is_none()
        || metadata.year.is_none()
        || metadata.summary.is_none()
}

/// Choose the candidate to merge from
///
/// With a known publisher the first candidate agreeing on publisher wins;
/// otherwise the source's first (preferred) candidate.
fn pick_candidate<'a>(
    candidates: &'a [SeriesCandidate],
    publisher: Option<&str>,
) -> Option<&'a SeriesCandidate> {
    if let Some(publisher) = publisher {
        if let Some(candidate) = candidates.iter().find(|c| {
            c.publisher
                .as_deref()
                .is_some_and(|p| publishers_agree(publisher, p))
        }) {
            return Some(candidate);
        }
    }
    candidates.first()
}

/// Publisher equality up to case, punctuation, and suffixes
/// ("Image" vs "Image Comics")
fn publishers_agree(a: &str, b: &str) -> bool {
    let a = normalize_series_name(a);
    let b = normalize_series_name(b);
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

/// Extract a plausible 4-digit year from the front of a date string
/// ("2012-03" → 2012)
fn parse_leading_year(date: &str) -> Option<u16> {
    let digits: String = date.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let year = digits.parse::<u16>().ok()?;
    plausible_year(year).then_some(year)
}
