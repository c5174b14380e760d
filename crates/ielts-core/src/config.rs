//! Practice configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_STORAGE_PREFIX;

/// Top-level ielts-practice configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeConfig {
    /// Directory holding persisted session state.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Prefix for session storage keys.
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
    /// Module used when a command does not name one.
    #[serde(default = "default_module")]
    pub default_module: String,
    /// Directory for saved graded attempts.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./.ielts-state")
}
fn default_storage_prefix() -> String {
    DEFAULT_STORAGE_PREFIX.to_string()
}
fn default_module() -> String {
    "reading".to_string()
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("./ielts-results")
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            storage_prefix: default_storage_prefix(),
            default_module: default_module(),
            results_dir: default_results_dir(),
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `ielts.toml` in the current directory
/// 2. `~/.config/ielts/config.toml`
///
/// Environment variable overrides: `IELTS_STORAGE_DIR`, `IELTS_RESULTS_DIR`.
pub fn load_config() -> Result<PracticeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PracticeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("ielts.toml");
        if local.exists() {
            Some(local)
        } else {
            config_home()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PracticeConfig::default(),
    };

    if let Ok(dir) = std::env::var("IELTS_STORAGE_DIR") {
        config.storage_dir = PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("IELTS_RESULTS_DIR") {
        config.results_dir = PathBuf::from(dir);
    }

    Ok(config)
}

/// Parse a TOML config document.
pub fn parse_config(content: &str) -> Result<PracticeConfig> {
    Ok(toml::from_str(content)?)
}

fn config_home() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("ielts"))
}
