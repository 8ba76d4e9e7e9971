//! Database access for longbox-id
//!
//! One read-write SQLite database holds the knowledge base and the settings
//! table. The read-only reference database is a separate file opened on
//! demand (see [`reference`]).

pub mod knowledge;
pub mod reference;

use longbox_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize the database connection pool
///
/// Creates the parent directory and the database file when missing, then
/// ensures the longbox-id tables exist.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create longbox-id tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comic_knowledge (
            series_name TEXT PRIMARY KEY,
            publisher TEXT,
            aliases TEXT NOT NULL DEFAULT '[]',
            start_year INTEGER,
            volume_count INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, comic_knowledge)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_tables_is_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        init_tables(&pool).await.unwrap();
        init_tables(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comic_knowledge")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
