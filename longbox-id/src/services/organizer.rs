//! Filesystem organizer
//!
//! Executes the move/copy implied by a formatted destination path. Resolves
//! the relative destination against the library root, creates intermediate
//! directories, and never overwrites: a colliding destination gets an
//! incrementing ` (N)` suffix before the extension. The destination is
//! claimed with an exclusive create, so concurrent organizes racing to the
//! same path settle on distinct files. The returned outcome carries the path
//! actually written, which callers must use instead of the requested one.
//!
//! Failure is all-or-nothing per file: a partial copy is removed before the
//! error is returned, leaving the source in its pre-organization state.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::models::action::{ActionKind, RecentAction, UndoPayload};

/// Filesystem organizer errors
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Source file does not exist
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    /// Destination path is absolute or escapes the library root
    #[error("Invalid destination path: {0}")]
    InvalidDestination(String),

    /// Could not create an intermediate directory
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Copy failed; any partial write was removed
    #[error("Failed to copy {src} to {dst}: {source}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },

    /// Remove failed
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The action carries no reversal instructions (already undone)
    #[error("Action has nothing to undo")]
    NothingToUndo,
}

/// Result of one successful organize
#[derive(Debug)]
pub struct OrganizeOutcome {
    /// Path actually written; may differ from the request due to collisions
    pub final_path: PathBuf,
    /// Reversible record of the action, ready for the action log
    pub action: RecentAction,
}

/// Moves or copies files into the library
pub struct Organizer {
    library_root: PathBuf,
}

impl Organizer {
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
        }
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    /// Move (`keep_original = false`) or copy a file to a destination
    /// relative to the library root
    ///
    /// # Errors
    /// Structured [`OrganizeError`]; the source is left untouched on any
    /// failure.
    pub async fn organize(
        &self,
        source: &Path,
        relative_dest: &Path,
        keep_original: bool,
    ) -> Result<OrganizeOutcome, OrganizeError> {
        if !path_exists(source).await {
            return Err(OrganizeError::SourceMissing(source.to_path_buf()));
        }
        validate_relative(relative_dest)?;

        let requested = self.library_root.join(relative_dest);
        if let Some(parent) = requested.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| OrganizeError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let final_path = reserve_destination(&requested)
            .await
            .map_err(|e| OrganizeError::Copy {
                src: source.to_path_buf(),
                dst: requested.clone(),
                source: e,
            })?;

        if let Err(e) = tokio::fs::copy(source, &final_path).await {
            // Drop any partial write so failure is all-or-nothing
            let _ = tokio::fs::remove_file(&final_path).await;
            return Err(OrganizeError::Copy {
                src: source.to_path_buf(),
                dst: final_path,
                source: e,
            });
        }

        if !keep_original {
            if let Err(e) = tokio::fs::remove_file(source).await {
                // Roll the copy back; the source must stay authoritative
                let _ = tokio::fs::remove_file(&final_path).await;
                return Err(OrganizeError::Remove {
                    path: source.to_path_buf(),
                    source: e,
                });
            }
        }

        let (kind, message, undo) = if keep_original {
            (
                ActionKind::Copy,
                format!(
                    "Copied \"{}\" to \"{}\"",
                    display_name(source),
                    final_path.display()
                ),
                UndoPayload::RemoveCopy {
                    path: final_path.clone(),
                },
            )
        } else {
            (
                ActionKind::Move,
                format!(
                    "Moved \"{}\" to \"{}\"",
                    display_name(source),
                    final_path.display()
                ),
                UndoPayload::MoveBack {
                    from: final_path.clone(),
                    to: source.to_path_buf(),
                },
            )
        };

        tracing::info!(
            source = %source.display(),
            dest = %final_path.display(),
            keep_original,
            "File organized"
        );

        Ok(OrganizeOutcome {
            final_path: final_path.clone(),
            action: RecentAction::new(kind, message, Some(undo)),
        })
    }

    /// Execute the reversal instructions of a recorded action
    ///
    /// Best-effort and one-shot: the caller removes the action from the log
    /// before calling, so a second undo of the same action is impossible.
    /// Returns the follow-up action describing the reversal.
    ///
    /// # Errors
    /// `NothingToUndo` when the action carries no payload; filesystem errors
    /// otherwise.
    pub async fn undo(&self, action: &RecentAction) -> Result<RecentAction, OrganizeError> {
        let payload = action.undo.as_ref().ok_or(OrganizeError::NothingToUndo)?;

        match payload {
            UndoPayload::MoveBack { from, to } => {
                if !path_exists(from).await {
                    return Err(OrganizeError::SourceMissing(from.clone()));
                }
                if let Some(parent) = to.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(|source| {
                        OrganizeError::CreateDir {
                            path: parent.to_path_buf(),
                            source,
                        }
                    })?;
                }
                // The original slot may have been reused; collision-check
                // like any organize
                let restored =
                    reserve_destination(to)
                        .await
                        .map_err(|e| OrganizeError::Copy {
                            src: from.clone(),
                            dst: to.clone(),
                            source: e,
                        })?;
                if let Err(e) = tokio::fs::copy(from, &restored).await {
                    let _ = tokio::fs::remove_file(&restored).await;
                    return Err(OrganizeError::Copy {
                        src: from.clone(),
                        dst: restored,
                        source: e,
                    });
                }
                tokio::fs::remove_file(from)
                    .await
                    .map_err(|source| OrganizeError::Remove {
                        path: from.clone(),
                        source,
                    })?;

                tracing::info!(from = %from.display(), to = %restored.display(), "Move undone");
                Ok(RecentAction::new(
                    ActionKind::Undo,
                    format!("Moved \"{}\" back to \"{}\"", display_name(from), restored.display()),
                    None,
                ))
            }
            UndoPayload::RemoveCopy { path } => {
                tokio::fs::remove_file(path)
                    .await
                    .map_err(|source| OrganizeError::Remove {
                        path: path.clone(),
                        source,
                    })?;

                tracing::info!(path = %path.display(), "Copy undone");
                Ok(RecentAction::new(
                    ActionKind::Undo,
                    format!("Removed copy \"{}\"", path.display()),
                    None,
                ))
            }
        }
    }
}

/// Reject absolute destinations and any `..` traversal
fn validate_relative(path: &Path) -> Result<(), OrganizeError> {
    if path.as_os_str().is_empty() {
        return Err(OrganizeError::InvalidDestination("empty path".to_string()));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(OrganizeError::InvalidDestination(format!(
                    "destination must be relative to the library root: {}",
                    path.display()
                )));
            }
        }
    }
    Ok(())
}

/// Claim the first free path at or after `requested`, suffixing the base
/// name with ` (1)`, ` (2)`, ... on collision
///
/// Each candidate is claimed with an exclusive create (`create_new`), so two
/// concurrent claims of the same path cannot both succeed; the loser moves on
/// to the next suffix. The claimed placeholder file is overwritten by the
/// copy that follows (or removed on failure).
async fn reserve_destination(requested: &Path) -> std::io::Result<PathBuf> {
    if try_claim(requested).await? {
        return Ok(requested.to_path_buf());
    }

    let stem = requested
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = requested.extension().map(|e| e.to_string_lossy().into_owned());

    for n in 1u32.. {
        let file_name = match &extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = requested.with_file_name(file_name);
        if try_claim(&candidate).await? {
            return Ok(candidate);
        }
    }
    unreachable!("u32 counter exhausted");
}

/// Exclusively create `path`; false when it already exists
async fn try_claim(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
