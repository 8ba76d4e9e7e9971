//! Configuration loading and library root resolution
//!
//! Two-tier configuration: a small TOML bootstrap file (paths, templates,
//! logging) plus runtime settings stored in the database settings table.
//! Resolution priority for every value: command line > environment variable >
//! TOML file > built-in default.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the library root folder
pub const ENV_LIBRARY_ROOT: &str = "LONGBOX_LIBRARY_ROOT";

/// Bootstrap configuration loaded from the TOML file
///
/// These settings cannot change during a run; the process must restart to
/// pick up edits. Every field is optional so a missing file degrades to
/// built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder the organized library lives under
    #[serde(default)]
    pub library_root: Option<PathBuf>,

    /// Path to the Longbox SQLite database (knowledge base + settings)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Path to a read-only reference database file (Grand Comics
    /// Database-style dump), if one is installed
    #[serde(default)]
    pub reference_db_path: Option<PathBuf>,

    /// ComicVine API key for remote enrichment
    #[serde(default)]
    pub comicvine_api_key: Option<String>,

    /// Destination folder template, e.g. `"{publisher}/{series}"`
    #[serde(default)]
    pub folder_template: Option<String>,

    /// Destination file-name template, e.g. `"{series} #{issue} ({year})"`
    #[serde(default)]
    pub file_template: Option<String>,

    /// Copy instead of move when organizing
    #[serde(default)]
    pub keep_originals: Option<bool>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load the TOML configuration
///
/// With an explicit path the file must exist and parse. Without one, the
/// platform default location is consulted and a missing file yields
/// `TomlConfig::default()`.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(p) => {
            if !p.exists() {
                return Err(Error::Config(format!("Config file not found: {}", p.display())));
            }
            p.to_path_buf()
        }
        None => match find_config_file() {
            Some(p) => p,
            None => return Ok(TomlConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    tracing::debug!(path = %path.display(), "Loaded TOML configuration");
    Ok(config)
}

/// Write a TOML configuration file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Locate the configuration file for the platform
///
/// Linux checks `~/.config/longbox/longbox.toml` then
/// `/etc/longbox/longbox.toml`; macOS and Windows use the platform config
/// directory. Returns None when no file exists.
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(path) = dirs::config_dir().map(|d| d.join("longbox").join("longbox.toml")) {
        if path.exists() {
            return Some(path);
        }
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/longbox/longbox.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// Default configuration file path for the platform (whether or not it exists)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("longbox").join("longbox.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Resolve the library root folder
///
/// Priority order:
/// 1. Command-line argument
/// 2. `LONGBOX_LIBRARY_ROOT` environment variable
/// 3. TOML config file
/// 4. OS-dependent default
pub fn resolve_library_root(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(ENV_LIBRARY_ROOT) {
        return PathBuf::from(path);
    }
    if let Some(path) = &toml_config.library_root {
        return path.clone();
    }
    default_library_root()
}

/// OS-dependent default library root
pub fn default_library_root() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("longbox").join("library"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/longbox/library"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("longbox").join("library"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/longbox/library"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("longbox").join("library"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\longbox\\library"))
    } else {
        PathBuf::from("./longbox_library")
    }
}

/// Default path of the Longbox database (knowledge base + settings)
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("longbox").join("longbox.db"))
        .unwrap_or_else(|| PathBuf::from("./longbox.db"))
}

/// Standard User-Agent for outbound HTTP clients
pub fn user_agent() -> String {
    format!(
        "Longbox/{} ( github.com/longbox/longbox )",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn test_default_library_root_is_nonempty() {
        let root = default_library_root();
        assert!(!root.as_os_str().is_empty());
    }

    #[test]
    fn test_toml_config_parses_partial_file() {
        let config: TomlConfig = toml::from_str(
            r#"
            library_root = "/comics/library"
            keep_originals = true

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.library_root, Some(PathBuf::from("/comics/library")));
        assert_eq!(config.keep_originals, Some(true));
        assert_eq!(config.logging.level, "debug");
        assert!(config.comicvine_api_key.is_none());
        assert!(config.folder_template.is_none());
    }

    #[test]
    fn test_toml_config_empty_file_yields_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert!(config.library_root.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_user_agent_format() {
        let ua = user_agent();
        assert!(ua.starts_with("Longbox/"));
        assert!(ua.contains("github.com"));
    }
}
