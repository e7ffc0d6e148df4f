//! Application configuration for kyukou.
//!
//! User config lives at `~/.kyukou/kyukou.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KyukouError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "kyukou.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".kyukou";

/// Default database file name under the config directory.
const DB_FILE_NAME: &str = "kyukou.db";

// ---------------------------------------------------------------------------
// Config structs (matching kyukou.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Announcement sources to ingest.
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            sources: default_sources(),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Database path; defaults to `~/.kyukou/kyukou.db` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// `[[sources]]` entry — one announcement page to ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Short name used in logs and CLI filters.
    pub name: String,
    /// Page URL; also recorded as each event's `link`.
    pub url: String,
    /// Department label stamped onto every event from this source.
    pub department: String,
    /// CSS selector matching the announcement table rows. The first
    /// matched row is treated as the header and skipped.
    #[serde(default = "default_row_selector")]
    pub row_selector: String,
}

fn default_row_selector() -> String {
    "table tr".into()
}

/// The law-department notice board the tool was originally built for.
fn default_sources() -> Vec<Source> {
    vec![Source {
        name: "law".into(),
        url: "http://www.law.kyushu-u.ac.jp/kyukou/keiji.cgi".into(),
        department: "法学部".into(),
        row_selector: r#".article-main [style="height: 600px; overflow: auto;"] table tr"#.into(),
    }]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.kyukou/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| KyukouError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.kyukou/kyukou.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| KyukouError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| KyukouError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| KyukouError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| KyukouError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| KyukouError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the database path: explicit config value, else the default
/// location under the config directory.
pub fn resolve_db_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.defaults.db_path {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(config_dir()?.join(DB_FILE_NAME)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("timeout_secs"));
        assert!(toml_str.contains("keiji.cgi"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.timeout_secs, 30);
        assert_eq!(parsed.sources.len(), 1);
        assert_eq!(parsed.sources[0].department, "法学部");
    }

    #[test]
    fn config_with_custom_source() {
        let toml_str = r#"
[defaults]
db_path = "/tmp/kyukou.db"

[[sources]]
name = "econ"
url = "https://example.ac.jp/notices"
department = "経済学部"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.db_path.as_deref(), Some("/tmp/kyukou.db"));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].name, "econ");
        // selector falls back to the generic table-row default
        assert_eq!(config.sources[0].row_selector, "table tr");
    }

    #[test]
    fn db_path_override_wins() {
        let mut config = AppConfig::default();
        config.defaults.db_path = Some("/tmp/other.db".into());
        let path = resolve_db_path(&config).expect("resolve");
        assert_eq!(path, PathBuf::from("/tmp/other.db"));
    }
}
