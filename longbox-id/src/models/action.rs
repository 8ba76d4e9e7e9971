//! Recent-action records and undo payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Kind of mutating action the organizer performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// File moved into the library (copy-then-delete)
    Move,
    /// File copied into the library, original kept
    Copy,
    /// A previous action was reversed
    Undo,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Move => "Move",
            ActionKind::Copy => "Copy",
            ActionKind::Undo => "Undo",
        }
    }
}

/// Reversal instructions for one action
///
/// Best-effort and session-scoped: a move is reversed by moving the file
/// back; a copy is reversed by removing the duplicate (the original was
/// kept). No catalog state is restored — the engine never owned any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum UndoPayload {
    /// Move the file at `from` back to `to`
    MoveBack { from: PathBuf, to: PathBuf },
    /// Remove the duplicate written at `path`
    RemoveCopy { path: PathBuf },
}

/// Immutable record of one organizer action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentAction {
    pub id: Uuid,
    pub kind: ActionKind,
    /// Human-readable description, e.g. `Moved "x.cbz" → "Image Comics/..."`
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Reversal instructions; None once undone or for irreversible actions
    pub undo: Option<UndoPayload>,
}

impl RecentAction {
    pub fn new(kind: ActionKind, message: impl Into<String>, undo: Option<UndoPayload>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            undo,
        }
    }
}
