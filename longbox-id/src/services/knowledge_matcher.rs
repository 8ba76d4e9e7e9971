//! Knowledge base series matcher
//!
//! Resolves a parsed series candidate against the user's knowledge base.
//! Exact (canonical or alias) matches are tried first, then fuzzy matching
//! over every entry. A fuzzy score below the configured threshold yields
//! `Unresolved` rather than a low-quality guess.
//!
//! Matching is a pure function of its inputs: the same parsed name and the
//! same knowledge base snapshot always produce the same outcome.

use strsim::jaro_winkler;

use crate::models::knowledge::{normalize_series_name, ComicKnowledge, KnowledgeBase, KnowledgeEntry};
use crate::services::filename_parser::ParsedName;

/// Minimum Jaro-Winkler similarity for a fuzzy match to be accepted
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Matcher tuning knobs
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Fuzzy matches scoring below this are reported as `Unresolved`
    pub similarity_threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Result of matching one parsed name against the knowledge base
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Canonical name or alias matched after normalization
    Exact(ComicKnowledge),
    /// Best fuzzy match at or above the similarity threshold
    Fuzzy {
        record: ComicKnowledge,
        similarity: f64,
    },
    /// No acceptable match; the caller must not guess
    Unresolved,
}

impl MatchOutcome {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, MatchOutcome::Unresolved)
    }

    /// The matched record, if any
    pub fn record(&self) -> Option<&ComicKnowledge> {
        match self {
            MatchOutcome::Exact(record) => Some(record),
            MatchOutcome::Fuzzy { record, .. } => Some(record),
            MatchOutcome::Unresolved => None,
        }
    }
}

/// Match a parsed file name against the knowledge base.
///
/// Ties at equal match quality are broken by preferring the entry whose
/// publisher matches the parser's publisher hint, then the shortest
/// canonical name, then lexicographic order.
pub fn match_series(
    parsed: &ParsedName,
    knowledge_base: &KnowledgeBase,
    config: &MatcherConfig,
) -> MatchOutcome {
    let candidate = match parsed.series.as_deref() {
        Some(series) => normalize_series_name(series),
        None => return MatchOutcome::Unresolved,
    };
    if candidate.is_empty() {
        return MatchOutcome::Unresolved;
    }

    let hint = parsed.publisher_hint.as_deref();

    // Exact pass: canonical name or any alias, after normalization
    let mut exact_best: Option<&KnowledgeEntry> = None;
    for entry in knowledge_base.entries() {
        let is_exact = entry.normalized_name == candidate
            || entry.normalized_aliases.iter().any(|a| a == &candidate);
        if is_exact && prefer(entry, exact_best, hint) {
            exact_best = Some(entry);
        }
    }
    if let Some(entry) = exact_best {
        return MatchOutcome::Exact(entry.record.clone());
    }

    // Fuzzy pass: best Jaro-Winkler score over canonical names and aliases
    let mut fuzzy_best: Option<(f64, &KnowledgeEntry)> = None;
    for entry in knowledge_base.entries() {
        let score = entry_similarity(&candidate, entry);
        if score < config.similarity_threshold {
            continue;
        }
        let replace = match fuzzy_best {
            None => true,
            Some((best_score, best_entry)) => {
                score > best_score
                    || (score == best_score && prefer(entry, Some(best_entry), hint))
            }
        };
        if replace {
            fuzzy_best = Some((score, entry));
        }
    }

    match fuzzy_best {
        Some((similarity, entry)) => MatchOutcome::Fuzzy {
            record: entry.record.clone(),
            similarity,
        },
        None => MatchOutcome::Unresolved,
    }
}

/// Highest similarity between the candidate and the entry's canonical
/// name or any alias
fn entry_similarity(candidate: &str, entry: &KnowledgeEntry) -> f64 {
    let mut best = jaro_winkler(candidate, &entry.normalized_name);
    for alias in &entry.normalized_aliases {
        let score = jaro_winkler(candidate, alias);
        if score > best {
            best = score;
        }
    }
    best
}

/// True if `entry` should win the tie against `current`
fn prefer(entry: &KnowledgeEntry, current: Option<&KnowledgeEntry>, hint: Option<&str>) -> bool {
    let current = match current {
        Some(current) => current,
        None => return true,
    };

    let entry_hint = hint_matches(hint, entry.record.publisher.as_deref());
    let current_hint = hint_matches(hint, current.record.publisher.as_deref());
    if entry_hint != current_hint {
        return entry_hint;
    }

    let entry_len = entry.record.series_name.len();
    let current_len = current.record.series_name.len();
    if entry_len != current_len {
        return entry_len < current_len;
    }

    entry.record.series_name < current.record.series_name
}

/// Case- and punctuation-insensitive publisher comparison; a hint matches
/// if either normalized form contains the other ("Image" vs "Image Comics")
fn hint_matches(hint: Option<&str>, publisher: Option<&str>) -> bool {
    match (hint, publisher) {
        (Some(hint), Some(publisher)) => {
            let hint = normalize_series_name(hint);
            let publisher = normalize_series_name(publisher);
            !hint.is_empty()
                && !publisher.is_empty()
                && (publisher.contains(&hint) || hint.contains(&publisher))
        }
        _ => false,
    }
}
