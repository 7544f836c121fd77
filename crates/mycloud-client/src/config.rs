//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client talks to a local development
//! backend with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use mycloud_shared::constants::{DEFAULT_API_BASE_URL, DEFAULT_CRYPTO_SECRET};

use crate::error::ClientError;

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// REST API base URL, without a trailing slash.
    /// Env: `MYCLOUD_API_BASE_URL`
    /// Default: `http://localhost:8000/api`
    pub api_base_url: String,

    /// Secret the persisted session token is sealed with.
    /// Env: `MYCLOUD_CRYPTO_SECRET`
    /// Default: `mycloud-secure-key`
    pub crypto_secret: String,

    /// Directory holding the persisted session token.
    /// Env: `MYCLOUD_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Per-request timeout.
    /// Env: `MYCLOUD_TIMEOUT_SECS`
    /// Default: 30 seconds
    pub request_timeout: Duration,
}

// keeps the secret out of logs
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("crypto_secret", &"<redacted>")
            .field("data_dir", &self.data_dir)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            crypto_secret: DEFAULT_CRYPTO_SECRET.to_string(),
            data_dir: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MYCLOUD_API_BASE_URL") {
            match normalize_base_url(&url) {
                Some(url) => config.api_base_url = url,
                None => tracing::warn!(value = %url, "Invalid MYCLOUD_API_BASE_URL, using default"),
            }
        }

        if let Ok(secret) = std::env::var("MYCLOUD_CRYPTO_SECRET") {
            if !secret.is_empty() {
                config.crypto_secret = secret;
            }
        }

        if let Ok(dir) = std::env::var("MYCLOUD_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(val) = std::env::var("MYCLOUD_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid MYCLOUD_TIMEOUT_SECS, using default"),
            }
        }

        config
    }

    /// Override the base URL (e.g. from a command line flag).
    pub fn with_api_base_url(mut self, url: &str) -> Self {
        match normalize_base_url(url) {
            Some(url) => self.api_base_url = url,
            None => tracing::warn!(value = %url, "Ignoring invalid API base URL"),
        }
        self
    }

    /// Resolve the directory holding local state.
    ///
    /// - Linux:   `~/.local/share/mycloud`
    /// - macOS:   `~/Library/Application Support/com.mycloud.mycloud`
    /// - Windows: `{FOLDERID_RoamingAppData}\mycloud\mycloud\data`
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ClientError> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let project_dirs =
            ProjectDirs::from("com", "mycloud", "mycloud").ok_or(ClientError::NoDataDir)?;
        Ok(project_dirs.data_dir().to_path_buf())
    }
}

/// Accept `http(s)://host[/path]`, strip trailing slashes.
fn normalize_base_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))?;
    if rest.is_empty() || rest.starts_with('/') {
        return None;
    }
    Some(url.to_string())
}
