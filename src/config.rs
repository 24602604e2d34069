use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Result, WrapErr};
use log::{LevelFilter, debug};
use serde::{Deserialize, Serialize};

use crate::DEFAULT_LANGUAGE_PREFERENCES;
use crate::cache::DEFAULT_TTL;
use crate::client::{CLIENT_VERSION, ClientConfig, DEFAULT_TIMEOUT, PLAYER_URL, USER_AGENT};
use crate::logging;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Language preference order; `auto` means any auto-generated track
    pub languages: Option<Vec<String>>,
    pub credential_ttl_hours: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub client_version: Option<String>,
    /// Credential record location; defaults to the platform cache dir
    pub cache_path: Option<PathBuf>,
    /// verbose, debug, info, warn, error or none
    pub log_level: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytsub/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&content).wrap_err_with(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn languages(&self) -> Vec<String> {
        match &self.languages {
            Some(langs) => langs.clone(),
            None => DEFAULT_LANGUAGE_PREFERENCES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn credential_ttl(&self) -> Duration {
        self.credential_ttl_hours
            .map(|h| Duration::from_secs(h.saturating_mul(60 * 60)))
            .unwrap_or(DEFAULT_TTL)
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
            .as_deref()
            .and_then(logging::parse_level)
            .unwrap_or(LevelFilter::Info)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: self.timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT),
            user_agent: self.user_agent.clone().unwrap_or_else(|| USER_AGENT.to_string()),
            player_url: PLAYER_URL.to_string(),
            client_version: self.client_version.clone().unwrap_or_else(|| CLIENT_VERSION.to_string()),
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytsub")
        .join("config.toml")
}
