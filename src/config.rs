//! Command line settings
//!
//! Values come from the command line first, then `~/.kubewire/config.toml`
//! (or the file named by `--config`), then built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use kubewire_client::{Client, Connection, DEFAULT_BASE_URL, DEFAULT_NAMESPACE, Endpoint};

/// Contents of the config file, every key optional
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub namespace: Option<String>,
    pub token: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Get the default config file path
    fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".kubewire").join("config.toml"))
    }

    /// Load an explicit config file, or the default one if it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub namespace: String,
    pub token: Option<String>,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

impl Settings {
    /// Merge command line overrides over the file
    pub fn resolve(file: FileConfig, host: Option<String>, namespace: Option<String>) -> Self {
        Self {
            host: host
                .or(file.host)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            namespace: namespace
                .or(file.namespace)
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            token: file.token.filter(|t| !t.is_empty()),
            connect_timeout: file.connect_timeout_secs.map(Duration::from_secs),
            request_timeout: file.request_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn endpoint(&self) -> Result<Endpoint> {
        let endpoint = Endpoint::new(&self.host, self.namespace.clone())
            .with_context(|| format!("Invalid host: {}", self.host))?;
        Ok(match &self.token {
            Some(token) => endpoint.with_token(token.clone()),
            None => endpoint,
        })
    }

    /// Build a client; `streaming` clients never get the request timeout
    pub fn client(&self, streaming: bool) -> Result<Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let (false, Some(timeout)) = (streaming, self.request_timeout) {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Client::from_connection(Connection::with_client(
            self.endpoint()?,
            http,
        )))
    }
}
