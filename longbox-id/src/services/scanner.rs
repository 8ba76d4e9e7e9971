//! Library folder scanner
//!
//! Recursive comic-archive discovery with format verification. Traversal is
//! sequential with symlink-loop detection; each candidate passes an
//! extension check, then magic-byte verification so mislabeled files are
//! skipped with a warning. A front-end convenience: the engine itself
//! accepts arbitrary caller-supplied paths.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::services::filename_parser::COMIC_EXTENSIONS;

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Cannot access file
    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),
}

/// Comic archive scanner
pub struct Scanner {
    ignore_patterns: Vec<String>,
    max_depth: Option<usize>,
}

impl Scanner {
    /// Scanner with default ignore patterns (system litter, VCS metadata)
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
            max_depth: None,
        }
    }

    /// Add an ignore pattern (matched as a substring of the file name)
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_patterns.push(pattern.into());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Scan a directory tree for comic archives
    ///
    /// Hidden directories and ignored patterns are skipped; unreadable
    /// entries log a warning and scanning continues. Results are sorted for
    /// deterministic queue order.
    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }
        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let mut comic_files = Vec::new();
        let mut symlink_visited = HashSet::new();

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            match self.is_comic_file(path) {
                Ok(true) => comic_files.push(path.to_path_buf()),
                Ok(false) => {
                    if has_comic_extension(path) {
                        tracing::warn!(
                            path = %path.display(),
                            "Skipping file: extension does not match content"
                        );
                    }
                }
                Err(e) => tracing::warn!("Error verifying {}: {}", path.display(), e),
            }
        }

        comic_files.sort();
        tracing::debug!(count = comic_files.len(), root = %root_path.display(), "Scan complete");

        Ok(comic_files)
    }

    fn should_process_entry(
        &self,
        entry: &DirEntry,
        symlink_visited: &mut HashSet<PathBuf>,
    ) -> bool {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();

        // Hidden directories are never descended into
        if entry.file_type().is_dir() && file_name.starts_with('.') && entry.depth() > 0 {
            return false;
        }

        for pattern in &self.ignore_patterns {
            if file_name.contains(pattern) {
                return false;
            }
        }

        // Detect symlink loops
        if entry.file_type().is_symlink() {
            if let Ok(canonical) = path.canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink loop detected: {}", path.display());
                    return false;
                }
            }
        }

        true
    }

    /// Extension check first (fast), then magic bytes (reliable)
    fn is_comic_file(&self, path: &Path) -> Result<bool, ScanError> {
        if !has_comic_extension(path) {
            return Ok(false);
        }
        verify_magic_bytes(path)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

fn has_comic_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| COMIC_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Verify the archive format behind the extension
///
/// cbz is ZIP, cbr is RAR (v4 or v5), cb7 is 7z, pdf is PDF. cbt is tar,
/// whose `ustar` magic sits at offset 257, so a longer prefix is read.
fn verify_magic_bytes(path: &Path) -> Result<bool, ScanError> {
    let mut file = File::open(path)
        .map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

    let mut buffer = [0u8; 265];
    let bytes_read = file
        .read(&mut buffer)
        .map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

    if bytes_read < 4 {
        return Ok(false);
    }

    let matches = match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("cbz") => buffer.starts_with(b"PK\x03\x04"),
        // RAR4 ends \x00, RAR5 \x01\x00; the shared prefix covers both
        Some("cbr") => buffer.starts_with(b"Rar!\x1a\x07"),
        Some("cb7") => buffer.starts_with(b"7z\xBC\xAF\x27\x1C"),
        Some("cbt") => bytes_read >= 262 && &buffer[257..262] == b"ustar",
        Some("pdf") => buffer.starts_with(b"%PDF"),
        _ => false,
    };

    Ok(matches)
}
