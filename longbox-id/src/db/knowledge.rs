//! Knowledge-base store and settings accessors
//!
//! Implements the store contract the engine reads its snapshot from:
//! `list` / `upsert` / `remove`. Mutations happen between runs only; a run
//! loads an immutable snapshot before matching begins. Aliases are stored as
//! a JSON array in a single column.

use longbox_common::{Error, Result};
use sqlx::{Pool, Sqlite};

use crate::models::knowledge::ComicKnowledge;

/// List every knowledge-base record, ordered by series name
pub async fn list_knowledge(db: &Pool<Sqlite>) -> Result<Vec<ComicKnowledge>> {
    let rows: Vec<(String, Option<String>, String, Option<i64>, Option<i64>)> = sqlx::query_as(
        "SELECT series_name, publisher, aliases, start_year, volume_count
         FROM comic_knowledge ORDER BY series_name",
    )
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|(series_name, publisher, aliases, start_year, volume_count)| {
            let aliases: Vec<String> = serde_json::from_str(&aliases).map_err(|e| {
                Error::Internal(format!("Corrupt aliases for '{}': {}", series_name, e))
            })?;
            Ok(ComicKnowledge {
                series_name,
                publisher,
                aliases,
                start_year: start_year.map(|y| y as u16),
                volume_count: volume_count.map(|v| v as u16),
            })
        })
        .collect()
}

/// Insert or update a knowledge-base record, keyed by series name
pub async fn upsert_knowledge(db: &Pool<Sqlite>, record: &ComicKnowledge) -> Result<()> {
    let aliases = serde_json::to_string(&record.aliases)
        .map_err(|e| Error::Internal(format!("Serialize aliases failed: {}", e)))?;

    sqlx::query(
        "INSERT INTO comic_knowledge (series_name, publisher, aliases, start_year, volume_count)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(series_name) DO UPDATE SET
             publisher = excluded.publisher,
             aliases = excluded.aliases,
             start_year = excluded.start_year,
             volume_count = excluded.volume_count",
    )
    .bind(&record.series_name)
    .bind(&record.publisher)
    .bind(aliases)
    .bind(record.start_year.map(|y| y as i64))
    .bind(record.volume_count.map(|v| v as i64))
    .execute(db)
    .await?;

    Ok(())
}

/// Remove a knowledge-base record
///
/// Returns true when a record was deleted, false when none matched.
pub async fn remove_knowledge(db: &Pool<Sqlite>, series_name: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comic_knowledge WHERE series_name = ?")
        .bind(series_name)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Get the ComicVine API key from the settings table
pub async fn get_comicvine_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, "comicvine_api_key").await
}

/// Store the ComicVine API key in the settings table
pub async fn set_comicvine_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, "comicvine_api_key", key).await
}

/// Get the fuzzy-match similarity threshold override, if set
pub async fn get_similarity_threshold(db: &Pool<Sqlite>) -> Result<Option<f64>> {
    get_setting(db, "similarity_threshold").await
}

/// Get the queue concurrency override, if set
pub async fn get_queue_concurrency(db: &Pool<Sqlite>) -> Result<Option<usize>> {
    get_setting(db, "queue_concurrency").await
}

/// Get the external-lookup timeout override in seconds, if set
pub async fn get_lookup_timeout_secs(db: &Pool<Sqlite>) -> Result<Option<u64>> {
    get_setting(db, "lookup_timeout_secs").await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn saga() -> ComicKnowledge {
        ComicKnowledge {
            series_name: "Saga".to_string(),
            publisher: Some("Image Comics".to_string()),
            aliases: vec!["Saga (Image)".to_string()],
            start_year: Some(2012),
            volume_count: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_list_roundtrip() {
        let pool = setup_test_db().await;

        upsert_knowledge(&pool, &saga()).await.unwrap();
        let records = list_knowledge(&pool).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0], saga());
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let pool = setup_test_db().await;

        upsert_knowledge(&pool, &saga()).await.unwrap();
        let mut updated = saga();
        updated.volume_count = Some(11);
        upsert_knowledge(&pool, &updated).await.unwrap();

        let records = list_knowledge(&pool).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].volume_count, Some(11));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_name() {
        let pool = setup_test_db().await;

        upsert_knowledge(&pool, &ComicKnowledge::new("Zot!")).await.unwrap();
        upsert_knowledge(&pool, &ComicKnowledge::new("Akira")).await.unwrap();
        upsert_knowledge(&pool, &saga()).await.unwrap();

        let names: Vec<String> = list_knowledge(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.series_name)
            .collect();
        assert_eq!(names, vec!["Akira", "Saga", "Zot!"]);
    }

    #[tokio::test]
    async fn test_remove_reports_whether_deleted() {
        let pool = setup_test_db().await;

        upsert_knowledge(&pool, &saga()).await.unwrap();
        assert!(remove_knowledge(&pool, "Saga").await.unwrap());
        assert!(!remove_knowledge(&pool, "Saga").await.unwrap());
        assert!(list_knowledge(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_key_set_and_get() {
        let pool = setup_test_db().await;

        assert_eq!(get_comicvine_api_key(&pool).await.unwrap(), None);
        set_comicvine_api_key(&pool, "cv_key_123".to_string())
            .await
            .unwrap();
        assert_eq!(
            get_comicvine_api_key(&pool).await.unwrap(),
            Some("cv_key_123".to_string())
        );
    }

    #[tokio::test]
    async fn test_numeric_setting_parses() {
        let pool = setup_test_db().await;

        sqlx::query("INSERT INTO settings (key, value) VALUES ('similarity_threshold', '0.9')")
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(get_similarity_threshold(&pool).await.unwrap(), Some(0.9));
        assert_eq!(get_queue_concurrency(&pool).await.unwrap(), None);
    }
}
