//! Configuration loading for Parley.
//!
//! Reads `config.toml` from the data directory (`~/.parley/` by default)
//! into [`ParleyConfig`]. A missing or malformed file falls back to the
//! defaults, so the client always starts.

use std::path::{Path, PathBuf};

use parley_types::config::ParleyConfig;
use secrecy::SecretString;

pub const CONFIG_FILE: &str = "config.toml";
pub const DATA_DIR_ENV: &str = "PARLEY_DATA_DIR";
pub const API_TOKEN_ENV: &str = "PARLEY_API_TOKEN";

/// Load configuration from `{data_dir}/config.toml`.
pub async fn load_config(data_dir: &Path) -> ParleyConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ParleyConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ParleyConfig::default();
        }
    };

    match toml::from_str::<ParleyConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ParleyConfig::default()
        }
    }
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `PARLEY_DATA_DIR` environment variable
/// 2. `~/.parley`
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var(DATA_DIR_ENV).ok())
}

fn data_dir_from(env: Option<String>) -> PathBuf {
    if let Some(dir) = env.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".parley");
    }
    PathBuf::from(".parley")
}

/// API token from `PARLEY_API_TOKEN`, if set and non-empty.
pub fn api_token() -> Option<SecretString> {
    token_from(std::env::var(API_TOKEN_ENV).ok())
}

fn token_from(env: Option<String>) -> Option<SecretString> {
    env.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .map(SecretString::from)
}
