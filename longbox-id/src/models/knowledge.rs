//! Knowledge-base records and the per-run snapshot
//!
//! The knowledge base is user-curated: one record per series, carrying the
//! canonical name, publisher, known aliases, and volume/year hints. During a
//! processing run the engine works against an immutable [`KnowledgeBase`]
//! snapshot whose normalized keys are computed once, so matching N files does
//! not re-normalize the base N times.

use serde::{Deserialize, Serialize};

/// One curated series record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComicKnowledge {
    /// Canonical series name
    pub series_name: String,
    /// Publisher, when known
    pub publisher: Option<String>,
    /// Alternate names the series appears under in file names
    pub aliases: Vec<String>,
    /// First publication year hint
    pub start_year: Option<u16>,
    /// Number of volumes hint
    pub volume_count: Option<u16>,
}

impl ComicKnowledge {
    /// Minimal record with just a canonical name
    pub fn new(series_name: impl Into<String>) -> Self {
        Self {
            series_name: series_name.into(),
            publisher: None,
            aliases: Vec::new(),
            start_year: None,
            volume_count: None,
        }
    }
}

/// A knowledge record with its precomputed normalized keys
#[derive(Debug, Clone)]
pub struct KnowledgeEntry {
    pub record: ComicKnowledge,
    pub normalized_name: String,
    pub normalized_aliases: Vec<String>,
}

/// Immutable per-run snapshot of the knowledge base
///
/// Mutations (add/update/delete) happen through the store between runs; a
/// snapshot taken before the first file begins matching is used for the whole
/// run.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    /// Build a snapshot, normalizing every name and alias once
    pub fn from_records(records: Vec<ComicKnowledge>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| KnowledgeEntry {
                normalized_name: normalize_series_name(&record.series_name),
                normalized_aliases: record
                    .aliases
                    .iter()
                    .map(|a| normalize_series_name(a))
                    .collect(),
                record,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalize a series name for matching
///
/// Case-folds, treats every non-alphanumeric character as a separator, and
/// collapses separator runs to single spaces: `"Spider-Man: Homecoming"` →
/// `"spider man homecoming"`.
pub fn normalize_series_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_folds_and_strips_punctuation() {
        assert_eq!(normalize_series_name("Saga"), "saga");
        assert_eq!(
            normalize_series_name("Spider-Man: Homecoming"),
            "spider man homecoming"
        );
        assert_eq!(normalize_series_name("Y: The Last Man"), "y the last man");
        assert_eq!(normalize_series_name("  B.P.R.D.  "), "b p r d");
    }

    #[test]
    fn test_normalize_is_deterministic_and_idempotent() {
        let once = normalize_series_name("The Walking Dead!");
        let twice = normalize_series_name(&once);
        assert_eq!(once, "the walking dead");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_snapshot_precomputes_keys() {
        let mut record = ComicKnowledge::new("Amazing Spider-Man");
        record.aliases = vec!["ASM".to_string(), "Amazing Spiderman".to_string()];
        record.publisher = Some("Marvel".to_string());

        let kb = KnowledgeBase::from_records(vec![record]);
        assert_eq!(kb.len(), 1);
        let entry = &kb.entries()[0];
        assert_eq!(entry.normalized_name, "amazing spider man");
        assert_eq!(
            entry.normalized_aliases,
            vec!["asm".to_string(), "amazing spiderman".to_string()]
        );
    }
}
