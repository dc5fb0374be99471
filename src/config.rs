use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{Result, TrackerError};

const DEFAULT_PAGE_SIZE: u32 = 50;
const LEGACY_SOAP_SUFFIX: &str = "/rpc/soap/jirasoapservice-v2";

#[derive(Deserialize, Default, Debug)]
pub struct Config {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub page_size: Option<u32>,
    /// Look up display names for users instead of showing login names
    #[serde(default)]
    pub resolve_user_names: bool,
    /// Values for action fields the issue has no value for, keyed by
    /// `"<action name>:<field name>"`
    #[serde(default)]
    pub action_defaults: HashMap<String, String>,
}

/// Login name and secret used to open a session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub api_token: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents =
            std::fs::read_to_string(config_path).map_err(|e| TrackerError::ConfigRead {
                path: config_path.to_path_buf(),
                source: e,
            })?;

        toml::from_str(&contents).map_err(|e| TrackerError::ConfigParse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "jira-commit")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(TrackerError::NoConfigDir)
    }

    /// Server root with env var taking precedence over config file
    pub fn server_url(&self) -> Result<String> {
        let raw = std::env::var("JIRA_URL")
            .ok()
            .or_else(|| self.server_url.clone())
            .ok_or(TrackerError::MissingServerUrl)?;
        Ok(normalize_server_url(&raw))
    }

    /// Credentials with env vars taking precedence over config file
    pub fn credentials(&self) -> Result<Credentials> {
        let username = std::env::var("JIRA_USER")
            .ok()
            .or_else(|| self.username.clone());
        let api_token = std::env::var("JIRA_API_TOKEN")
            .ok()
            .or_else(|| self.api_token.clone());

        match (username, api_token) {
            (Some(username), Some(api_token)) => Ok(Credentials {
                username,
                api_token,
            }),
            _ => Err(TrackerError::MissingCredentials),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Configured default for an action field, e.g. `"Resolve Issue:Fix Version/s"`.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.action_defaults.get(key).cloned()
    }
}

/// Strip trailing slashes and the legacy SOAP endpoint path.
pub fn normalize_server_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches(['/', '\\']);
    match trimmed.rfind(LEGACY_SOAP_SUFFIX) {
        Some(offset) if offset > 0 => trimmed[..offset].to_string(),
        _ => trimmed.to_string(),
    }
}
