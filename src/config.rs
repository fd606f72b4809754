use std::path::PathBuf;

use compact_str::CompactString;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::{
    client::config::DEFAULT_BASE_URL,
    result::{MmlinkError, Result},
};

/// Persisted application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend base URL
    pub base_url: CompactString,
    /// Log level override for the log file
    pub log_level: Option<CompactString>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            log_level: None,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.config_dir().join("mmlink.toml")
    } else {
        PathBuf::from("mmlink.toml")
    }
}

pub fn load_config(config_file: &PathBuf) -> Result<AppConfig> {
    confy::load_path(config_file)
        .map_err(|e| MmlinkError::config_load_error(config_file.clone(), e))
}

pub fn save_config(config_file: &PathBuf, config: AppConfig) -> Result<()> {
    confy::store_path(config_file, &config)
        .map_err(|e| MmlinkError::config_save_error(config_file.clone(), e))?;

    Ok(())
}

/// Single-value store holding the backend bearer token
///
/// The token lives in its own file under one fixed key, so `login`/`logout`
/// can rotate credentials without touching the main configuration.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredToken {
    auth_token: Option<CompactString>,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        if let Some(dirs) = BaseDirs::new() {
            dirs.config_dir().join("mmlink-auth.toml")
        } else {
            PathBuf::from("mmlink-auth.toml")
        }
    }

    /// Read the stored token, if any
    pub fn load(&self) -> Result<Option<CompactString>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let stored: StoredToken = confy::load_path(&self.path)
            .map_err(|e| MmlinkError::config_load_error(self.path.clone(), e))?;
        Ok(stored.auth_token)
    }

    /// Persist the token
    pub fn save(&self, token: &str) -> Result<()> {
        let stored = StoredToken { auth_token: Some(token.into()) };
        confy::store_path(&self.path, &stored)
            .map_err(|e| MmlinkError::config_save_error(self.path.clone(), e))
    }

    /// Remove the stored token
    pub fn clear(&self) -> Result<()> {
        confy::store_path(&self.path, &StoredToken::default())
            .map_err(|e| MmlinkError::config_save_error(self.path.clone(), e))
    }
}
