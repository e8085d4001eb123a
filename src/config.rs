//! ChainBank Configuration
//!
//! Loads and saves the service configuration from
//! `~/.chainbank/chainbank.json`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::types::{default_config, ChainbankConfig};

/// Directory name under the user's home for all chainbank data.
const CHAINBANK_DIR_NAME: &str = ".chainbank";

/// Config file name within the chainbank directory.
const CONFIG_FILENAME: &str = "chainbank.json";

/// Returns the chainbank base directory: `~/.chainbank`.
pub fn get_chainbank_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
    home.join(CHAINBANK_DIR_NAME)
}

/// Returns the full path to the config file: `~/.chainbank/chainbank.json`.
pub fn get_config_path() -> PathBuf {
    get_chainbank_dir().join(CONFIG_FILENAME)
}

/// Load the config from disk, merging missing fields with defaults.
///
/// Returns `None` if the config file does not exist or cannot be parsed.
pub fn load_config() -> Option<ChainbankConfig> {
    let config_path = get_config_path();
    if !config_path.exists() {
        return None;
    }

    let contents = fs::read_to_string(&config_path).ok()?;
    let mut config: ChainbankConfig = serde_json::from_str(&contents).ok()?;

    let defaults = default_config();
    if config.db_path.is_empty() {
        config.db_path = defaults.db_path;
    }
    if config.version.is_empty() {
        config.version = defaults.version;
    }

    Some(config)
}

/// Save the config to disk at `~/.chainbank/chainbank.json`.
///
/// Creates the chainbank directory with mode 0o700 if it does not exist.
pub fn save_config(config: &ChainbankConfig) -> Result<()> {
    let dir = get_chainbank_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create chainbank directory")?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    let config_path = get_config_path();
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&config_path, &json).context("Failed to write config file")?;
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

/// Resolve a path that may start with `~` to an absolute path.
///
/// If the path starts with `~`, the tilde is replaced with the user's
/// home directory. Otherwise the path is returned as-is.
pub fn resolve_path(p: &str) -> String {
    if let Some(rest) = p.strip_prefix('~') {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        home.join(rest).to_string_lossy().to_string()
    } else {
        p.to_string()
    }
}
