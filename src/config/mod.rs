//! Bot configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults, `config.toml`
//! in the data directory, then CLI flags / environment (clap resolves the
//! env fallbacks before the values arrive here).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::error;

use crate::commands::DEFAULT_PREFIX;

const DEFAULT_API_BASE_URL: &str = "https://api.notion.com";
const DEFAULT_HEALTH_PORT: u16 = 8080;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Base URL of the external document store API.
    pub api_base_url: String,
    /// Bearer token for the store. None = offline mode (in-memory store).
    pub store_token: Option<String>,
    /// Database holding the task pages.
    pub database_id: Option<String>,
    /// Command prefix, e.g. `$`.
    pub command_prefix: String,
    /// Port for the keep-alive HTTP endpoint.
    pub health_port: u16,
    /// Bind address for the keep-alive endpoint.
    pub bind_address: String,
    /// Log level filter (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log output format: "compact" or "json".
    pub log_format: String,
    /// Optional log file path (rotated daily).
    pub log_file: Option<PathBuf>,
}

/// `config.toml` shape — every field optional, defaults apply when absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TomlConfig {
    api_base_url: Option<String>,
    store_token: Option<String>,
    database_id: Option<String>,
    command_prefix: Option<String>,
    health_port: Option<u16>,
    bind_address: Option<String>,
    log_level: Option<String>,
    log_format: Option<String>,
    log_file: Option<PathBuf>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

impl BotConfig {
    /// Resolve the configuration. `data_dir` is where `config.toml` lives;
    /// the remaining arguments are CLI/env overrides and win over the file.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data_dir: Option<&Path>,
        api_base_url: Option<String>,
        store_token: Option<String>,
        database_id: Option<String>,
        command_prefix: Option<String>,
        health_port: Option<u16>,
        bind_address: Option<String>,
        log_level: Option<String>,
    ) -> Self {
        let file = data_dir.and_then(load_toml).unwrap_or_default();

        Self {
            api_base_url: api_base_url
                .or(file.api_base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            store_token: store_token.or(file.store_token),
            database_id: database_id.or(file.database_id),
            command_prefix: command_prefix
                .or(file.command_prefix)
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            health_port: health_port.or(file.health_port).unwrap_or(DEFAULT_HEALTH_PORT),
            bind_address: bind_address
                .or(file.bind_address)
                .unwrap_or_else(default_bind_address),
            log_level: log_level
                .or(file.log_level)
                .unwrap_or_else(|| "info".to_string()),
            log_format: file.log_format.unwrap_or_else(|| "compact".to_string()),
            log_file: file.log_file,
        }
    }

    /// Whether both store credentials are present. Without them the bot runs
    /// against the in-memory store.
    pub fn store_configured(&self) -> bool {
        matches!(&self.store_token, Some(t) if !t.is_empty())
            && matches!(&self.database_id, Some(d) if !d.is_empty())
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self::new(None, None, None, None, None, None, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let config = BotConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.command_prefix, "$");
        assert_eq!(config.health_port, DEFAULT_HEALTH_PORT);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert!(!config.store_configured());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "command_prefix = \"!\"\nhealth_port = 9000\nstore_token = \"secret\"\ndatabase_id = \"db1\"\n",
        )
        .unwrap();
        let config = BotConfig::new(Some(dir.path()), None, None, None, None, None, None, None);
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.health_port, 9000);
        assert!(config.store_configured());
    }

    #[test]
    fn cli_overrides_win_over_the_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "health_port = 9000\n").unwrap();
        let config = BotConfig::new(
            Some(dir.path()),
            None,
            None,
            None,
            Some("?".to_string()),
            Some(9001),
            None,
            None,
        );
        assert_eq!(config.health_port, 9001);
        assert_eq!(config.command_prefix, "?");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "health_port = \"oops").unwrap();
        let config = BotConfig::new(Some(dir.path()), None, None, None, None, None, None, None);
        assert_eq!(config.health_port, DEFAULT_HEALTH_PORT);
    }

    #[test]
    fn token_without_database_is_not_configured() {
        let config = BotConfig::new(
            None,
            None,
            Some("secret".to_string()),
            None,
            None,
            None,
            None,
            None,
        );
        assert!(!config.store_configured());
    }
}
