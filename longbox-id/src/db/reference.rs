//! Local reference database collaborator
//!
//! Read-only SQLite dump of a comics reference catalog (Grand Comics
//! Database-style). Connection is explicit: `connect` returns a boolean
//! success signal and every query before a successful connect fails with
//! `LookupError::NotAvailable`. Query failures are survivable; the
//! enrichment layer degrades to "no enrichment."
//!
//! Expected schema:
//! - `series(id, name, publisher, year_began, issue_count)`
//! - `issues(id, series_id, number, title, publication_date, synopsis,
//!   genre, characters)`
//! - `issue_creators(issue_id, name, role)`

use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::types::{Creator, IssueDetails, LookupError, MetadataSource, SeriesCandidate};

/// Read-only reference database, opened on demand
pub struct ReferenceDatabase {
    path: PathBuf,
    pool: RwLock<Option<SqlitePool>>,
}

impl ReferenceDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the database read-only
    ///
    /// Returns true on success. A missing or unopenable file logs a warning
    /// and returns false; it is not an error, the engine simply runs without
    /// local enrichment.
    pub async fn connect(&self) -> bool {
        if self.pool.read().await.is_some() {
            return true;
        }
        if !self.path.exists() {
            tracing::warn!(path = %self.path.display(), "Reference database file not found");
            return false;
        }

        let db_url = format!("sqlite://{}?mode=ro", self.path.display());
        match SqlitePool::connect(&db_url).await {
            Ok(pool) => {
                tracing::info!(path = %self.path.display(), "Reference database connected");
                *self.pool.write().await = Some(pool);
                true
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Reference database connect failed");
                false
            }
        }
    }

    /// Close the connection; subsequent queries fail until reconnected
    pub async fn disconnect(&self) {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
            tracing::debug!("Reference database disconnected");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.pool.read().await.is_some()
    }

    async fn pool(&self) -> Result<SqlitePool, LookupError> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| LookupError::NotAvailable("reference database not connected".to_string()))
    }

    /// Search series by name, case-insensitive substring match
    pub async fn search_series_records(
        &self,
        name: &str,
    ) -> Result<Vec<SeriesCandidate>, LookupError> {
        let pool = self.pool().await?;
        let pattern = format!("%{}%", name);

        let rows: Vec<(i64, String, Option<String>, Option<i64>, Option<i64>)> = sqlx::query_as(
            "SELECT id, name, publisher, year_began, issue_count
             FROM series WHERE name LIKE ? COLLATE NOCASE
             ORDER BY LENGTH(name), name LIMIT 25",
        )
        .bind(pattern)
        .fetch_all(&pool)
        .await
        .map_err(|e| LookupError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, name, publisher, year_began, issue_count)| SeriesCandidate {
                id,
                name,
                publisher,
                // A corrupt row degrades to an absent field, not a wrapped value
                year_began: year_began.and_then(|y| u16::try_from(y).ok()),
                issue_count: issue_count.and_then(|c| u32::try_from(c).ok()),
            })
            .collect())
    }

    /// Fetch details for one issue of a series
    pub async fn get_issue_details(
        &self,
        series_id: i64,
        issue_number: &str,
    ) -> Result<Option<IssueDetails>, LookupError> {
        let pool = self.pool().await?;

        let row: Option<(
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        )> = sqlx::query_as(
            "SELECT title, publication_date, synopsis, genre, characters
             FROM issues WHERE series_id = ? AND number = ?",
        )
        .bind(series_id)
        .bind(issue_number)
        .fetch_optional(&pool)
        .await
        .map_err(|e| LookupError::Database(e.to_string()))?;

        Ok(row.map(
            |(title, publication_date, synopsis, genre, characters)| IssueDetails {
                title,
                publication_date,
                synopsis,
                genre,
                characters,
            },
        ))
    }

    /// List creator credits on an issue
    pub async fn get_issue_creators(&self, issue_id: i64) -> Result<Vec<Creator>, LookupError> {
        let pool = self.pool().await?;

        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT name, role FROM issue_creators WHERE issue_id = ? ORDER BY role, name",
        )
        .bind(issue_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| LookupError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(name, role)| Creator { name, role })
            .collect())
    }

    /// Row id of an issue, for creator lookups
    pub async fn find_issue_id(
        &self,
        series_id: i64,
        issue_number: &str,
    ) -> Result<Option<i64>, LookupError> {
        let pool = self.pool().await?;

        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM issues WHERE series_id = ? AND number = ?")
                .bind(series_id)
                .bind(issue_number)
                .fetch_optional(&pool)
                .await
                .map_err(|e| LookupError::Database(e.to_string()))?;

        Ok(row.map(|(id,)| id))
    }
}

#[async_trait::async_trait]
impl MetadataSource for ReferenceDatabase {
    fn name(&self) -> &'static str {
        "reference-db"
    }

    async fn search_series(&self, name: &str) -> Result<Vec<SeriesCandidate>, LookupError> {
        self.search_series_records(name).await
    }

    async fn issue_details(
        &self,
        series_id: i64,
        issue_number: &str,
    ) -> Result<Option<IssueDetails>, LookupError> {
        self.get_issue_details(series_id, issue_number).await
    }
}
