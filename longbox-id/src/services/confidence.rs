//! Confidence scorer
//!
//! Collapses parser certainty, matcher quality, and enrichment provenance
//! into one discrete confidence level plus a file status. The mapping is
//! total: every input combination yields exactly one confidence (possibly
//! none) and exactly one status.

use crate::models::queued_file::{ConfidenceLevel, FileStatus};
use crate::services::filename_parser::plausible_year;

/// How the series field was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOrigin {
    /// Knowledge base canonical-name or alias match
    KnowledgeExact,
    /// Knowledge base fuzzy match at or above threshold
    KnowledgeFuzzy,
    /// No knowledge base match; enrichment alone supplied the series
    Enrichment,
    /// Nothing resolved the series
    Unresolved,
}

/// Scoring dimensions for one file
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub origin: SeriesOrigin,
    /// Issue came from an explicit `#NN` marker
    pub explicit_issue: bool,
    pub issue: Option<&'a str>,
    pub year: Option<u16>,
    pub publisher: Option<&'a str>,
}

/// Scorer verdict: confidence is `None` exactly when status is `Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub confidence: Option<ConfidenceLevel>,
    pub status: FileStatus,
}

/// Score one resolved (or unresolved) metadata record.
///
/// Policy, in priority order:
/// - `High`: exact/alias match, explicit issue number, plausible year
/// - `Medium`: fuzzy match, or exact match with gaps
/// - `Low`: series supplied by enrichment alone
/// - unresolved series: no confidence, status `Error`
///
/// Status is `Warning` when confidence is `Low` or any of
/// issue/year/publisher is still null, `Success` otherwise.
pub fn score(input: ScoreInput) -> Assessment {
    let year_plausible = input.year.is_some_and(plausible_year);

    let confidence = match input.origin {
        SeriesOrigin::Unresolved => {
            return Assessment {
                confidence: None,
                status: FileStatus::Error,
            };
        }
        SeriesOrigin::KnowledgeExact
            if input.explicit_issue && input.issue.is_some() && year_plausible =>
        {
            ConfidenceLevel::High
        }
        SeriesOrigin::KnowledgeExact | SeriesOrigin::KnowledgeFuzzy => ConfidenceLevel::Medium,
        SeriesOrigin::Enrichment => ConfidenceLevel::Low,
    };

    let missing_field =
        input.issue.is_none() || input.year.is_none() || input.publisher.is_none();
    let status = if confidence == ConfidenceLevel::Low || missing_field {
        FileStatus::Warning
    } else {
        FileStatus::Success
    };

    Assessment {
        confidence: Some(confidence),
        status,
    }
}
