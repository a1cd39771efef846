//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.depot/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::AgentRole;
use crate::api::chatbot::DEFAULT_CHAT_PATH;
use crate::core::state::DEFAULT_QUICK_HISTORY_LIMIT;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DepotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub wms: WmsConfig,
    #[serde(default)]
    pub chatbot: ChatbotConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub username: Option<String>,
    pub default_role: Option<AgentRole>,
    pub storage_dir: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WmsConfig {
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChatbotConfig {
    pub base_url: Option<String>,
    pub chat_path: Option<String>,
    pub quick_history_limit: Option<usize>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_WMS_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_CHATBOT_BASE_URL: &str = "http://localhost:8001/api";
pub const DEFAULT_USERNAME: &str = "guest";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub username: String,
    pub default_role: AgentRole,
    pub wms_base_url: String,
    pub chatbot_base_url: String,
    pub chat_path: String,
    pub storage_dir: Option<PathBuf>,
    pub quick_history_limit: usize,
    /// `None` keeps requests unbounded.
    pub request_timeout: Option<Duration>,
}

/// Values that arrive from CLI flags (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub username: Option<String>,
    pub role: Option<AgentRole>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.depot/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".depot").join("config.toml"))
}

/// Load config from `~/.depot/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `DepotConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<DepotConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(DepotConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<DepotConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(DepotConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: DepotConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Depot Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# username = "guest"                 # Or set DEPOT_USERNAME
# default_role = "clerk"             # "clerk", "picker", "packer", "manager", "driver"
# storage_dir = "/home/me/.depot/storage"   # Or set DEPOT_STORAGE_DIR
# request_timeout_secs = 30          # Unset = no timeout

# [wms]
# base_url = "http://localhost:8000"         # Or set DEPOT_WMS_API_URL

# [chatbot]
# base_url = "http://localhost:8001/api"     # Or set DEPOT_CHATBOT_API_URL
# chat_path = "/chat"
# quick_history_limit = 5
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &DepotConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

fn resolve_with_env(
    config: &DepotConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Username: CLI → env → config → default
    let username = cli
        .username
        .clone()
        .or_else(|| env("DEPOT_USERNAME"))
        .or_else(|| config.general.username.clone())
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

    // Role: CLI → config → default
    let default_role = cli
        .role
        .or(config.general.default_role)
        .unwrap_or_default();

    // Base URLs: env → config → default
    let wms_base_url = env("DEPOT_WMS_API_URL")
        .or_else(|| config.wms.base_url.clone())
        .unwrap_or_else(|| DEFAULT_WMS_BASE_URL.to_string());

    let chatbot_base_url = env("DEPOT_CHATBOT_API_URL")
        .or_else(|| config.chatbot.base_url.clone())
        .unwrap_or_else(|| DEFAULT_CHATBOT_BASE_URL.to_string());

    let storage_dir = env("DEPOT_STORAGE_DIR")
        .or_else(|| config.general.storage_dir.clone())
        .map(PathBuf::from);

    ResolvedConfig {
        username,
        default_role,
        wms_base_url,
        chatbot_base_url,
        chat_path: config
            .chatbot
            .chat_path
            .clone()
            .unwrap_or_else(|| DEFAULT_CHAT_PATH.to_string()),
        storage_dir,
        quick_history_limit: config
            .chatbot
            .quick_history_limit
            .unwrap_or(DEFAULT_QUICK_HISTORY_LIMIT),
        request_timeout: config
            .general
            .request_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs),
    }
}
