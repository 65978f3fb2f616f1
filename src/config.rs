use std::{path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "CREATE_USER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where and what the user-creation call sends. Missing keys keep their defaults.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CallerConfig {
    pub base_url: String,
    pub users_path: String,
    pub name: String,
    pub timeout_ms: Option<u64>,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            users_path: "/api/users".to_string(),
            name: "John Doe".to_string(),
            timeout_ms: None,
        }
    }
}

impl CallerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Loads the file named by `CREATE_USER_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn users_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.users_path.starts_with('/') {
            format!("{base}{}", self.users_path)
        } else {
            format!("{base}/{}", self.users_path)
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
