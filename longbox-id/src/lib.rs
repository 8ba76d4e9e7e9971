//! # Longbox Identification & Organization Engine
//!
//! Turns unstructured comic-archive file names into scored, structured
//! metadata records and organizes the files into a templated library
//! layout. Pipeline per file: token parse → knowledge-base match →
//! reference enrichment → confidence scoring → path formatting →
//! organize, with a bounded session-scoped action log for undo.
//!
//! The engine owns no storage: it reads a knowledge-base snapshot and
//! settings, mutates the queue entries it is handed, and produces catalog
//! values for a downstream store.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod types;

pub use config::{EngineSettings, DEFAULT_QUEUE_CONCURRENCY};
pub use models::{Comic, ComicKnowledge, ComicMetadata, ConfidenceLevel, FileStatus, QueuedFile};
pub use services::{QueueProcessor, RunMode};
pub use types::{Creator, IssueDetails, LookupError, MetadataSource, SeriesCandidate};
