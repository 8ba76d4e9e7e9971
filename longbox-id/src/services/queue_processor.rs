//! Queue processing pipeline
//!
//! Drives each queued file through parse → match → enrich → score and,
//! when the run mode allows, format → organize. Files are processed with
//! unordered parallelism up to the configured concurrency limit; results
//! come back in completion order and callers correlate them by file id.
//!
//! One file's failure never halts the batch: every failure attaches to that
//! file's result and the stream continues. The action log is the only
//! shared mutable state, serialized behind a single mutex.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use longbox_common::events::{EventBus, LongboxEvent};

use crate::config::EngineSettings;
use crate::models::comic::{Comic, ComicMetadata};
use crate::models::knowledge::KnowledgeBase;
use crate::models::queued_file::{FileStatus, QueuedFile};
use crate::models::session::{OrganizeSession, SessionState};
use crate::services::action_log::ActionLog;
use crate::services::confidence::{score, ScoreInput};
use crate::services::enrichment::enrich;
use crate::services::filename_parser::parse;
use crate::services::knowledge_matcher::{match_series, MatcherConfig};
use crate::services::organizer::{OrganizeError, Organizer};
use crate::services::path_formatter::{format_path, has_unresolved_placeholders};
use crate::types::MetadataSource;

/// What a run does after identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Identify only; no filesystem mutation
    DryRun,
    /// Identify, then organize accepted files. `Success` files are always
    /// accepted; `Warning` files only with `include_warnings`.
    Organize { include_warnings: bool },
}

/// Per-file disposition after a run
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Identified; no filesystem action (dry run, policy declined, or a
    /// template gap in the destination)
    Identified,
    /// File written into the library at `final_path`
    Organized { final_path: PathBuf },
    /// Organize was attempted and failed; the source file is untouched
    OrganizeFailed { message: String },
    /// Skipped because the run was cancelled; the file stays queued
    Cancelled,
}

/// One file's result, reported in completion order
#[derive(Debug)]
pub struct FileResult {
    pub file: QueuedFile,
    pub metadata: ComicMetadata,
    /// Formatted relative destination; None when there is nothing to
    /// organize. May contain literal placeholders (template gaps).
    pub destination: Option<String>,
    pub disposition: Disposition,
    /// Catalog entry for the downstream store, present after a successful
    /// organize
    pub comic: Option<Comic>,
}

/// Outcome of a whole queue run
#[derive(Debug)]
pub struct RunSummary {
    pub session: OrganizeSession,
    /// Results in completion order, not submission order
    pub results: Vec<FileResult>,
}

/// Queue processor: one immutable knowledge-base snapshot, a prioritized
/// list of enrichment sources, and the organizer
pub struct QueueProcessor {
    knowledge_base: KnowledgeBase,
    sources: Vec<Arc<dyn MetadataSource>>,
    organizer: Organizer,
    settings: EngineSettings,
    event_bus: EventBus,
    action_log: Arc<Mutex<ActionLog>>,
}

impl QueueProcessor {
    pub fn new(
        knowledge_base: KnowledgeBase,
        sources: Vec<Arc<dyn MetadataSource>>,
        organizer: Organizer,
        settings: EngineSettings,
        event_bus: EventBus,
    ) -> Self {
        Self {
            knowledge_base,
            sources,
            organizer,
            settings,
            event_bus,
            action_log: Arc::new(Mutex::new(ActionLog::new())),
        }
    }

    /// Session-scoped action history
    pub fn action_log(&self) -> Arc<Mutex<ActionLog>> {
        Arc::clone(&self.action_log)
    }

    /// Build pending queue entries for scanned paths
    pub fn queue_files(paths: Vec<PathBuf>) -> Vec<QueuedFile> {
        paths.into_iter().map(QueuedFile::new).collect()
    }

    /// Process a queue of files
    ///
    /// Cancellation is checked before each file's pipeline begins; files
    /// already in flight run to completion. A cancelled file keeps status
    /// `Pending` so it remains queued for a later run.
    pub async fn run(
        &self,
        files: Vec<QueuedFile>,
        mode: RunMode,
        cancel: CancellationToken,
    ) -> RunSummary {
        let total = files.len();
        let mut session =
            OrganizeSession::new(self.organizer.library_root().display().to_string());

        self.event_bus.emit_lossy(LongboxEvent::SessionStarted {
            session_id: session.session_id,
            total_files: total,
            timestamp: chrono::Utc::now(),
        });

        if matches!(mode, RunMode::Organize { .. }) {
            // Identification and organizing interleave per file; the
            // session state tracks the run's overall phase
            session.transition_to(SessionState::Organizing);
        }

        let processed = AtomicUsize::new(0);
        let session_id = session.session_id;

        let results: Vec<FileResult> = stream::iter(files)
            .map(|file| {
                let cancel = cancel.clone();
                let processed = &processed;
                async move {
                    let result = self.process_one(file, mode, &cancel).await;
                    let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.event_bus.emit_lossy(LongboxEvent::SessionProgress {
                        session_id,
                        processed: done,
                        total,
                        timestamp: chrono::Utc::now(),
                    });
                    result
                }
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut succeeded = 0;
        let mut warnings = 0;
        let mut errors = 0;
        let mut cancelled = 0;
        for result in &results {
            match &result.disposition {
                Disposition::Cancelled => cancelled += 1,
                Disposition::OrganizeFailed { message } => {
                    errors += 1;
                    session.add_error(format!("{}: {}", result.file.display_name, message));
                }
                _ => match result.file.status {
                    FileStatus::Success => succeeded += 1,
                    FileStatus::Warning => warnings += 1,
                    FileStatus::Error => {
                        errors += 1;
                        if let Some(message) = &result.file.error {
                            session.add_error(format!("{}: {}", result.file.display_name, message));
                        }
                    }
                    FileStatus::Pending => {}
                },
            }
        }

        session.update_progress(results.len(), total, "Done".to_string());

        if cancelled > 0 {
            session.transition_to(SessionState::Cancelled);
            self.event_bus.emit_lossy(LongboxEvent::SessionCancelled {
                session_id,
                remaining: cancelled,
                timestamp: chrono::Utc::now(),
            });
        } else {
            session.transition_to(SessionState::Completed);
        }
        self.event_bus.emit_lossy(LongboxEvent::SessionCompleted {
            session_id,
            succeeded,
            warnings,
            errors,
            cancelled,
            timestamp: chrono::Utc::now(),
        });

        tracing::info!(
            %session_id,
            succeeded,
            warnings,
            errors,
            cancelled,
            "Queue run finished"
        );

        RunSummary { session, results }
    }

    /// Re-identify one file with a caller-forced series (and optionally
    /// publisher), looping back through enrichment and scoring
    ///
    /// Used for manual correction of `Error` files: the forced values are
    /// treated as an exact knowledge-base match.
    pub async fn reidentify(
        &self,
        mut file: QueuedFile,
        series: String,
        publisher: Option<String>,
    ) -> FileResult {
        use crate::models::knowledge::ComicKnowledge;
        use crate::services::knowledge_matcher::MatchOutcome;

        let parsed = parse(&file.display_name);
        let mut forced = ComicKnowledge::new(series);
        forced.publisher = publisher;
        let outcome = MatchOutcome::Exact(forced);

        let enrichment = enrich(
            &parsed,
            &outcome,
            &self.sources,
            self.settings.lookup_timeout,
        )
        .await;
        let metadata = enrichment.metadata.clone();

        let verdict = score(ScoreInput {
            origin: enrichment.origin,
            explicit_issue: parsed.explicit_issue,
            issue: metadata.issue.as_deref(),
            year: metadata.year,
            publisher: metadata.publisher.as_deref(),
        });

        apply_to_file(&mut file, &metadata, verdict.confidence, verdict.status);
        let destination = self.destination_for(&file, &metadata);

        FileResult {
            file,
            metadata,
            destination,
            disposition: Disposition::Identified,
            comic: None,
        }
    }

    /// Reverse the most recent reversible action, if any
    ///
    /// One-shot: the action leaves the log before the reversal runs, and the
    /// reversal itself is recorded.
    pub async fn undo_last(&self) -> Result<Option<crate::models::action::RecentAction>, OrganizeError> {
        let action = {
            let mut log = self.action_log.lock().await;
            match log.latest().map(|a| a.id) {
                Some(id) => log.take(id),
                None => None,
            }
        };
        let action = match action {
            Some(action) => action,
            None => return Ok(None),
        };

        let undo_action = self.organizer.undo(&action).await?;
        self.event_bus.emit_lossy(LongboxEvent::ActionUndone {
            action_id: action.id,
            message: undo_action.message.clone(),
            timestamp: chrono::Utc::now(),
        });

        let mut log = self.action_log.lock().await;
        log.record(undo_action.clone());
        Ok(Some(undo_action))
    }

    async fn process_one(
        &self,
        mut file: QueuedFile,
        mode: RunMode,
        cancel: &CancellationToken,
    ) -> FileResult {
        if cancel.is_cancelled() {
            self.event_bus.emit_lossy(LongboxEvent::FileCancelled {
                file_id: file.id,
                timestamp: chrono::Utc::now(),
            });
            return FileResult {
                file,
                metadata: ComicMetadata::default(),
                destination: None,
                disposition: Disposition::Cancelled,
                comic: None,
            };
        }

        // Identification: parse, match, enrich, score
        let parsed = parse(&file.display_name);
        let matcher_config = MatcherConfig {
            similarity_threshold: self.settings.similarity_threshold,
        };
        let outcome = match_series(&parsed, &self.knowledge_base, &matcher_config);
        let enrichment = enrich(
            &parsed,
            &outcome,
            &self.sources,
            self.settings.lookup_timeout,
        )
        .await;
        let metadata = enrichment.metadata.clone();

        let verdict = score(ScoreInput {
            origin: enrichment.origin,
            explicit_issue: parsed.explicit_issue,
            issue: metadata.issue.as_deref(),
            year: metadata.year,
            publisher: metadata.publisher.as_deref(),
        });
        apply_to_file(&mut file, &metadata, verdict.confidence, verdict.status);

        self.event_bus.emit_lossy(LongboxEvent::FileIdentified {
            file_id: file.id,
            display_name: file.display_name.clone(),
            confidence: file.confidence.map(|c| c.as_str().to_string()),
            status: file.status.as_str().to_string(),
            timestamp: chrono::Utc::now(),
        });

        let destination = self.destination_for(&file, &metadata);

        let accepted = match (mode, file.status) {
            (RunMode::Organize { .. }, FileStatus::Success) => true,
            (RunMode::Organize { include_warnings }, FileStatus::Warning) => include_warnings,
            _ => false,
        };

        let destination_ready = destination
            .as_deref()
            .is_some_and(|d| !has_unresolved_placeholders(d));

        if !accepted || !destination_ready {
            if accepted && !destination_ready {
                tracing::warn!(
                    file = %file.display_name,
                    destination = destination.as_deref().unwrap_or(""),
                    "Destination has unresolved placeholders; file not organized"
                );
            }
            return FileResult {
                file,
                metadata,
                destination,
                disposition: Disposition::Identified,
                comic: None,
            };
        }

        // Organization: move/copy and log the reversible action
        let relative = PathBuf::from(destination.as_deref().unwrap_or_default());
        match self
            .organizer
            .organize(&file.source_path, &relative, self.settings.keep_originals)
            .await
        {
            Ok(outcome) => {
                self.event_bus.emit_lossy(LongboxEvent::ActionRecorded {
                    action_id: outcome.action.id,
                    kind: outcome.action.kind.as_str().to_string(),
                    message: outcome.action.message.clone(),
                    timestamp: chrono::Utc::now(),
                });
                {
                    let mut log = self.action_log.lock().await;
                    log.record(outcome.action);
                }
                self.event_bus.emit_lossy(LongboxEvent::FileOrganized {
                    file_id: file.id,
                    final_path: outcome.final_path.display().to_string(),
                    timestamp: chrono::Utc::now(),
                });

                let comic = Comic::from_metadata(&metadata, outcome.final_path.clone());
                FileResult {
                    file,
                    metadata,
                    destination,
                    disposition: Disposition::Organized {
                        final_path: outcome.final_path,
                    },
                    comic,
                }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(file = %file.display_name, error = %message, "Organize failed");
                self.event_bus.emit_lossy(LongboxEvent::OrganizeFailed {
                    file_id: file.id,
                    message: message.clone(),
                    timestamp: chrono::Utc::now(),
                });
                FileResult {
                    file,
                    metadata,
                    destination,
                    disposition: Disposition::OrganizeFailed { message },
                    comic: None,
                }
            }
        }
    }

    /// Render the relative destination for an identified file
    ///
    /// `None` when there is nothing to organize (series unresolved). The
    /// source file's extension is carried over.
    fn destination_for(&self, file: &QueuedFile, metadata: &ComicMetadata) -> Option<String> {
        if file.status == FileStatus::Error || metadata.series.is_none() {
            return None;
        }

        let folder = format_path(&self.settings.folder_template, metadata);
        let base = format_path(&self.settings.file_template, metadata);
        let extension = file
            .source_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        let file_name = match extension {
            Some(ext) => format!("{}.{}", base, ext),
            None => base,
        };
        Some(format!("{}/{}", folder.trim_matches('/'), file_name))
    }
}

/// Write identification results back onto the queue entry
fn apply_to_file(
    file: &mut QueuedFile,
    metadata: &ComicMetadata,
    confidence: Option<crate::models::queued_file::ConfidenceLevel>,
    status: FileStatus,
) {
    file.series = metadata.series.clone();
    file.issue = metadata.issue.clone();
    file.year = metadata.year;
    file.publisher = metadata.publisher.clone();
    file.confidence = confidence;
    file.status = status;
    if status == FileStatus::Error {
        file.error = Some("No series could be resolved".to_string());
    }
}
