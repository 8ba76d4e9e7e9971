//! Reference database contract tests against a generated SQLite fixture.

use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;

use longbox_id::db::reference::ReferenceDatabase;
use longbox_id::types::{LookupError, MetadataSource};

/// Build a small reference catalog fixture on disk
async fn seed_fixture(path: &Path) {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = SqlitePool::connect(&url).await.unwrap();

    sqlx::query(
        "CREATE TABLE series (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            publisher TEXT,
            year_began INTEGER,
            issue_count INTEGER
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE issues (
            id INTEGER PRIMARY KEY,
            series_id INTEGER NOT NULL,
            number TEXT NOT NULL,
            title TEXT,
            publication_date TEXT,
            synopsis TEXT,
            genre TEXT,
            characters TEXT
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE issue_creators (
            issue_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            role TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO series (id, name, publisher, year_began, issue_count) VALUES
            (1, 'Saga', 'Image Comics', 2012, 66),
            (2, 'Saga of the Swamp Thing', 'DC Comics', 1982, 171),
            (3, 'Hellboy', 'Dark Horse Comics', 1994, NULL)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO issues
            (id, series_id, number, title, publication_date, synopsis, genre, characters)
         VALUES
            (10, 1, '1', NULL, '2012-03', 'Two soldiers from opposite sides fall in love.',
             'Science Fiction', 'Alana; Marko; Hazel'),
            (11, 1, '2', NULL, '2012-04', NULL, NULL, NULL)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO issue_creators (issue_id, name, role) VALUES
            (10, 'Brian K. Vaughan', 'script'),
            (10, 'Fiona Staples', 'pencils')",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool.close().await;
}

async fn connected_fixture(dir: &TempDir) -> ReferenceDatabase {
    let path = dir.path().join("reference.db");
    seed_fixture(&path).await;
    let db = ReferenceDatabase::new(path);
    assert!(db.connect().await);
    db
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_prefers_shorter_names() {
    let dir = TempDir::new().unwrap();
    let db = connected_fixture(&dir).await;

    let candidates = db.search_series_records("saga").await.unwrap();
    assert_eq!(candidates.len(), 2);
    // Substring matches ordered by name length, exact-looking hit first
    assert_eq!(candidates[0].name, "Saga");
    assert_eq!(candidates[0].publisher.as_deref(), Some("Image Comics"));
    assert_eq!(candidates[0].year_began, Some(2012));
    assert_eq!(candidates[0].issue_count, Some(66));
    assert_eq!(candidates[1].name, "Saga of the Swamp Thing");
}

#[tokio::test]
async fn test_search_without_match_is_empty() {
    let dir = TempDir::new().unwrap();
    let db = connected_fixture(&dir).await;

    let candidates = db.search_series_records("Cerebus").await.unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_null_columns_come_back_as_none() {
    let dir = TempDir::new().unwrap();
    let db = connected_fixture(&dir).await;

    let candidates = db.search_series_records("Hellboy").await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].issue_count, None);
}

#[tokio::test]
async fn test_out_of_range_columns_degrade_to_none() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reference.db");
    seed_fixture(&path).await;

    // Corrupt row: year outside u16 range, negative issue count
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = SqlitePool::connect(&url).await.unwrap();
    sqlx::query(
        "INSERT INTO series (id, name, publisher, year_began, issue_count)
         VALUES (9, 'Weird Tales', NULL, 99999, -4)",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let db = ReferenceDatabase::new(path);
    assert!(db.connect().await);
    let candidates = db.search_series_records("Weird Tales").await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].year_began, None);
    assert_eq!(candidates[0].issue_count, None);
}

#[tokio::test]
async fn test_issue_details_and_missing_issue() {
    let dir = TempDir::new().unwrap();
    let db = connected_fixture(&dir).await;

    let details = db.get_issue_details(1, "1").await.unwrap().unwrap();
    assert_eq!(details.publication_date.as_deref(), Some("2012-03"));
    assert!(details.synopsis.as_deref().unwrap().contains("fall in love"));
    assert_eq!(details.genre.as_deref(), Some("Science Fiction"));

    // Known series, unknown issue
    assert!(db.get_issue_details(1, "999").await.unwrap().is_none());
    // Unknown series
    assert!(db.get_issue_details(77, "1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_issue_creators_ordered_by_role() {
    let dir = TempDir::new().unwrap();
    let db = connected_fixture(&dir).await;

    let issue_id = db.find_issue_id(1, "1").await.unwrap().unwrap();
    let creators = db.get_issue_creators(issue_id).await.unwrap();
    assert_eq!(creators.len(), 2);
    assert_eq!(creators[0].role, "pencils");
    assert_eq!(creators[0].name, "Fiona Staples");
    assert_eq!(creators[1].role, "script");

    // Issue with no recorded credits
    let bare = db.find_issue_id(1, "2").await.unwrap().unwrap();
    assert!(db.get_issue_creators(bare).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disconnect_makes_queries_unavailable() {
    let dir = TempDir::new().unwrap();
    let db = connected_fixture(&dir).await;
    assert!(db.is_connected().await);

    db.disconnect().await;
    assert!(!db.is_connected().await);
    let err = db.search_series_records("Saga").await.unwrap_err();
    assert!(matches!(err, LookupError::NotAvailable(_)));

    // Reconnect works
    assert!(db.connect().await);
    assert!(!db.search_series_records("Saga").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_metadata_source_seam() {
    let dir = TempDir::new().unwrap();
    let db = connected_fixture(&dir).await;
    let source: &dyn MetadataSource = &db;

    assert_eq!(source.name(), "reference-db");
    let candidates = source.search_series("Saga").await.unwrap();
    let saga = &candidates[0];
    let details = source.issue_details(saga.id, "1").await.unwrap().unwrap();
    assert!(details.synopsis.is_some());
}
