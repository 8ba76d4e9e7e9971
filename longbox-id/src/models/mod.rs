//! Data models for the identification and organization engine

pub mod action;
pub mod comic;
pub mod knowledge;
pub mod queued_file;
pub mod session;

pub use action::{ActionKind, RecentAction, UndoPayload};
pub use comic::{Comic, ComicMetadata, MAX_RATING};
pub use knowledge::{ComicKnowledge, KnowledgeBase, KnowledgeEntry};
pub use queued_file::{ConfidenceLevel, FileStatus, QueuedFile};
pub use session::{OrganizeSession, SessionProgress, SessionState, StateTransition};
