//! Queued file record and its status/confidence enums

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Processing status of a queued file
///
/// Every file ends a run in exactly one of these; there is no silent drop.
/// `Error` and untouched `Pending` files stay queued for manual resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    /// Queued, not yet processed (or left queued after cancellation)
    Pending,
    /// Identified with nothing missing
    Success,
    /// Identified, but low confidence or fields still null
    Warning,
    /// No resolvable series; nothing to organize
    Error,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "Pending",
            FileStatus::Success => "Success",
            FileStatus::Warning => "Warning",
            FileStatus::Error => "Error",
        }
    }
}

/// Engine-assigned certainty in a resolved metadata record
///
/// Total order `Low < Medium < High` (derived from variant order) is used for
/// policy thresholds and severity mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        }
    }
}

/// One file pending identification/organization
///
/// Created with status `Pending` and all metadata null; the engine mutates
/// the resolved fields in place as stages complete and returns the record to
/// the queue owner. Callers correlate results by `id`, never by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedFile {
    /// Unique file identifier (locally generated, not process-global)
    pub id: Uuid,
    /// Name shown to the user (file name without directories)
    pub display_name: String,
    /// Where the file currently lives
    pub source_path: PathBuf,
    /// Resolved series name
    pub series: Option<String>,
    /// Resolved issue number (kept as text: "1", "0", "7.1" all occur)
    pub issue: Option<String>,
    /// Resolved publication year
    pub year: Option<u16>,
    /// Resolved publisher
    pub publisher: Option<String>,
    /// Engine-assigned confidence, None until scored or when series unresolved
    pub confidence: Option<ConfidenceLevel>,
    /// Processing status
    pub status: FileStatus,
    /// Page count, when a caller that read the archive supplies it
    pub page_count: Option<u32>,
    /// Human-readable failure attached by the pipeline, if any
    pub error: Option<String>,
    /// When the file entered the queue
    pub queued_at: DateTime<Utc>,
}

impl QueuedFile {
    /// Create a pending entry for a path
    ///
    /// The display name is the final path component; a path with no file name
    /// (e.g. `/`) falls back to the full path string.
    pub fn new(source_path: PathBuf) -> Self {
        let display_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_path.to_string_lossy().into_owned());

        Self {
            id: Uuid::new_v4(),
            display_name,
            source_path,
            series: None,
            issue: None,
            year: None,
            publisher: None,
            confidence: None,
            status: FileStatus::Pending,
            page_count: None,
            error: None,
            queued_at: Utc::now(),
        }
    }

    /// True when identification reached a terminal status
    pub fn is_identified(&self) -> bool {
        !matches!(self.status, FileStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_file_is_pending_with_null_metadata() {
        let file = QueuedFile::new(PathBuf::from("/incoming/Saga #1 (2012).cbz"));
        assert_eq!(file.status, FileStatus::Pending);
        assert_eq!(file.display_name, "Saga #1 (2012).cbz");
        assert!(file.series.is_none());
        assert!(file.issue.is_none());
        assert!(file.year.is_none());
        assert!(file.publisher.is_none());
        assert!(file.confidence.is_none());
        assert!(!file.is_identified());
    }

    #[test]
    fn test_unique_ids_per_file() {
        let a = QueuedFile::new(PathBuf::from("/a.cbz"));
        let b = QueuedFile::new(PathBuf::from("/a.cbz"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_confidence_total_order() {
        assert!(ConfidenceLevel::Low < ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Medium < ConfidenceLevel::High);
        assert_eq!(
            ConfidenceLevel::High.max(ConfidenceLevel::Low),
            ConfidenceLevel::High
        );
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&FileStatus::Warning).unwrap();
        assert_eq!(json, r#""WARNING""#);
    }
}
