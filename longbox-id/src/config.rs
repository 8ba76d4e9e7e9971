//! Engine settings and API key resolution
//!
//! Runtime knobs for the identification engine, assembled from the settings
//! table and the TOML bootstrap file. The ComicVine API key resolves with
//! database > environment > TOML priority, warning when multiple sources
//! define it.

use longbox_common::config::TomlConfig;
use longbox_common::Result;
use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tracing::{info, warn};

use crate::services::knowledge_matcher::DEFAULT_SIMILARITY_THRESHOLD;
use crate::services::path_formatter::{DEFAULT_FILE_TEMPLATE, DEFAULT_FOLDER_TEMPLATE};

/// Environment variable naming the ComicVine API key
pub const ENV_COMICVINE_API_KEY: &str = "LONGBOX_COMICVINE_API_KEY";

/// Default number of files identified concurrently
pub const DEFAULT_QUEUE_CONCURRENCY: usize = 4;

/// Default timeout for one external lookup call
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Resolved engine settings for one run
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Minimum fuzzy-match similarity accepted by the matcher
    pub similarity_threshold: f64,
    /// Concurrent in-flight files in a queue run
    pub concurrency: usize,
    /// Timeout per external lookup (local reference DB, remote API)
    pub lookup_timeout: Duration,
    /// Destination folder template
    pub folder_template: String,
    /// Destination file-name template (extension carried from the source)
    pub file_template: String,
    /// Copy instead of move when organizing
    pub keep_originals: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            concurrency: DEFAULT_QUEUE_CONCURRENCY,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            folder_template: DEFAULT_FOLDER_TEMPLATE.to_string(),
            file_template: DEFAULT_FILE_TEMPLATE.to_string(),
            keep_originals: false,
        }
    }
}

/// Load engine settings
///
/// Tuning knobs (threshold, concurrency, timeout) come from the settings
/// table, falling back to built-in defaults; templates and the keep-originals
/// flag come from the TOML file.
pub async fn load_engine_settings(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<EngineSettings> {
    let defaults = EngineSettings::default();

    let similarity_threshold = crate::db::knowledge::get_similarity_threshold(db)
        .await?
        .unwrap_or(defaults.similarity_threshold);
    let concurrency = crate::db::knowledge::get_queue_concurrency(db)
        .await?
        .unwrap_or(defaults.concurrency)
        .max(1);
    let lookup_timeout = crate::db::knowledge::get_lookup_timeout_secs(db)
        .await?
        .map(Duration::from_secs)
        .unwrap_or(defaults.lookup_timeout);

    Ok(EngineSettings {
        similarity_threshold,
        concurrency,
        lookup_timeout,
        folder_template: toml_config
            .folder_template
            .clone()
            .unwrap_or(defaults.folder_template),
        file_template: toml_config
            .file_template
            .clone()
            .unwrap_or(defaults.file_template),
        keep_originals: toml_config.keep_originals.unwrap_or(defaults.keep_originals),
    })
}

/// Resolve the ComicVine API key from 3-tier configuration
///
/// Priority: database > environment > TOML. Returns `None` when no source
/// defines a key; remote enrichment is simply disabled then.
pub async fn resolve_comicvine_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::knowledge::get_comicvine_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(ENV_COMICVINE_API_KEY)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .comicvine_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    let mut sources = Vec::new();
    if db_key.is_some() {
        sources.push("database");
    }
    if env_key.is_some() {
        sources.push("environment");
    }
    if toml_key.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "ComicVine API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("ComicVine API key loaded from database");
        return Ok(Some(key));
    }
    if let Some(key) = env_key {
        info!("ComicVine API key loaded from environment variable");
        return Ok(Some(key));
    }
    if let Some(key) = toml_key {
        info!("ComicVine API key loaded from TOML config");
        return Ok(Some(key));
    }

    Ok(None)
}

/// Validate an API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
