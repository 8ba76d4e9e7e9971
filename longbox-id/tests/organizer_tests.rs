//! Organizer integration tests: move/copy semantics, directory creation,
//! collision suffixing, failure isolation, and undo round trips.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use longbox_id::models::action::{ActionKind, UndoPayload};
use longbox_id::services::{OrganizeError, Organizer};

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn test_move_creates_directories_and_removes_source() {
    let incoming = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let source = write_file(incoming.path(), "saga-1.cbz", b"pages");

    let organizer = Organizer::new(library.path());
    let outcome = organizer
        .organize(&source, Path::new("Image Comics/Saga/Saga #1 (2012).cbz"), false)
        .await
        .unwrap();

    assert_eq!(
        outcome.final_path,
        library.path().join("Image Comics/Saga/Saga #1 (2012).cbz")
    );
    assert!(!source.exists());
    assert_eq!(read(&outcome.final_path), b"pages");
    assert_eq!(outcome.action.kind, ActionKind::Move);
    assert!(matches!(
        outcome.action.undo,
        Some(UndoPayload::MoveBack { .. })
    ));
}

#[tokio::test]
async fn test_copy_keeps_original() {
    let incoming = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let source = write_file(incoming.path(), "saga-1.cbz", b"pages");

    let organizer = Organizer::new(library.path());
    let outcome = organizer
        .organize(&source, Path::new("Saga/Saga #1.cbz"), true)
        .await
        .unwrap();

    assert!(source.exists());
    assert!(outcome.final_path.exists());
    assert_eq!(outcome.action.kind, ActionKind::Copy);
    assert!(matches!(
        outcome.action.undo,
        Some(UndoPayload::RemoveCopy { .. })
    ));
}

#[tokio::test]
async fn test_collision_yields_two_distinct_paths() {
    let incoming = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let first = write_file(incoming.path(), "a/saga.cbz", b"first");
    let second = write_file(incoming.path(), "b/saga.cbz", b"second");

    let organizer = Organizer::new(library.path());
    let dest = Path::new("Saga/Saga #1.cbz");

    let outcome_a = organizer.organize(&first, dest, false).await.unwrap();
    let outcome_b = organizer.organize(&second, dest, false).await.unwrap();

    assert_ne!(outcome_a.final_path, outcome_b.final_path);
    assert_eq!(outcome_a.final_path, library.path().join("Saga/Saga #1.cbz"));
    assert_eq!(
        outcome_b.final_path,
        library.path().join("Saga/Saga #1 (1).cbz")
    );
    // Neither overwrote the other
    assert_eq!(read(&outcome_a.final_path), b"first");
    assert_eq!(read(&outcome_b.final_path), b"second");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_collision_never_overwrites() {
    let incoming = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let organizer = Organizer::new(library.path());
    let dest = Path::new("Saga/Saga #1.cbz");

    // Both organizes race for the same destination; the exclusive claim
    // must hand each a distinct final path with its own bytes intact.
    for round in 0..50 {
        let first = write_file(incoming.path(), &format!("a/{round}.cbz"), b"first");
        let second = write_file(incoming.path(), &format!("b/{round}.cbz"), b"second");

        let (outcome_a, outcome_b) = tokio::join!(
            organizer.organize(&first, dest, false),
            organizer.organize(&second, dest, false),
        );
        let outcome_a = outcome_a.unwrap();
        let outcome_b = outcome_b.unwrap();

        assert_ne!(
            outcome_a.final_path, outcome_b.final_path,
            "round {round}: same final path"
        );
        assert_eq!(read(&outcome_a.final_path), b"first");
        assert_eq!(read(&outcome_b.final_path), b"second");

        std::fs::remove_file(&outcome_a.final_path).unwrap();
        std::fs::remove_file(&outcome_b.final_path).unwrap();
    }
}

#[tokio::test]
async fn test_repeated_collisions_increment_suffix() {
    let incoming = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let organizer = Organizer::new(library.path());
    let dest = Path::new("X/same.cbz");

    let mut finals = Vec::new();
    for n in 0..3 {
        let source = write_file(incoming.path(), &format!("{n}.cbz"), b"x");
        finals.push(organizer.organize(&source, dest, false).await.unwrap().final_path);
    }

    assert!(finals[0].ends_with("same.cbz"));
    assert!(finals[1].ends_with("same (1).cbz"));
    assert!(finals[2].ends_with("same (2).cbz"));
}

#[tokio::test]
async fn test_failure_leaves_source_intact() {
    let incoming = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let source = write_file(incoming.path(), "saga.cbz", b"pages");

    let organizer = Organizer::new(library.path());
    let err = organizer
        .organize(&source, Path::new("../escape.cbz"), false)
        .await
        .unwrap_err();

    assert!(matches!(err, OrganizeError::InvalidDestination(_)));
    assert!(source.exists());
}

#[tokio::test]
async fn test_undo_move_restores_original_path() {
    let incoming = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let source = write_file(incoming.path(), "saga.cbz", b"pages");

    let organizer = Organizer::new(library.path());
    let outcome = organizer
        .organize(&source, Path::new("Saga/saga.cbz"), false)
        .await
        .unwrap();
    assert!(!source.exists());

    let undo_action = organizer.undo(&outcome.action).await.unwrap();
    assert_eq!(undo_action.kind, ActionKind::Undo);
    // The reversal itself is not reversible
    assert!(undo_action.undo.is_none());
    assert!(source.exists());
    assert!(!outcome.final_path.exists());
    assert_eq!(read(&source), b"pages");
}

#[tokio::test]
async fn test_undo_copy_removes_duplicate() {
    let incoming = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let source = write_file(incoming.path(), "saga.cbz", b"pages");

    let organizer = Organizer::new(library.path());
    let outcome = organizer
        .organize(&source, Path::new("Saga/saga.cbz"), true)
        .await
        .unwrap();

    organizer.undo(&outcome.action).await.unwrap();
    assert!(source.exists());
    assert!(!outcome.final_path.exists());
}

#[tokio::test]
async fn test_undo_move_back_collision_checked() {
    let incoming = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let source = write_file(incoming.path(), "saga.cbz", b"original");

    let organizer = Organizer::new(library.path());
    let outcome = organizer
        .organize(&source, Path::new("Saga/saga.cbz"), false)
        .await
        .unwrap();

    // The original slot was reused in the meantime
    write_file(incoming.path(), "saga.cbz", b"newcomer");

    organizer.undo(&outcome.action).await.unwrap();
    // The newcomer is untouched; the restored file got a suffix
    assert_eq!(read(&incoming.path().join("saga.cbz")), b"newcomer");
    assert_eq!(read(&incoming.path().join("saga (1).cbz")), b"original");
}

#[tokio::test]
async fn test_undo_without_payload_errors() {
    let library = TempDir::new().unwrap();
    let organizer = Organizer::new(library.path());
    let action = longbox_id::models::action::RecentAction::new(ActionKind::Undo, "done", None);

    let err = organizer.undo(&action).await.unwrap_err();
    assert!(matches!(err, OrganizeError::NothingToUndo));
}
