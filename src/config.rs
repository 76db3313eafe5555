//! Relay configuration: defaults, then an optional TOML file, then the
//! environment. CLI flags are applied last by the binary.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::RelayError;

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/gpt";

/// Environment variable holding the API base URL.
pub const ENV_BASE_URL: &str = "GPT_API";

/// Environment variable holding the whole-request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "GPT_RELAY_TIMEOUT_SECS";

/// Settings for a [`RelayClient`](crate::client::RelayClient).
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Base URL of the GPT proxy API (e.g. `http://localhost:3000/gpt`).
    pub base_url: String,
    /// TCP connection timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout, body included. `None` lets long streams run.
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// On-disk shape. Every field is optional so a file can override just one.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

impl RelayConfig {
    /// Create a config with sensible defaults.
    ///
    /// - connect_timeout: 10 s
    /// - request_timeout: none
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agent: format!("gpt-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Defaults, overlaid with `path` (if given) and then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, RelayError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RelayError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&raw)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, RelayError> {
        let file: FileConfig =
            toml::from_str(raw).map_err(|e| RelayError::Config(format!("invalid TOML: {}", e)))?;
        let mut config = Self::default();
        if let Some(url) = file.base_url {
            config.base_url = url;
        }
        if let Some(secs) = file.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(ua) = file.user_agent {
            config.user_agent = ua;
        }
        Ok(config)
    }

    /// Overlay environment values. `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                RelayError::Config(format!("{} must be a whole number of seconds, got {:?}", ENV_TIMEOUT_SECS, raw))
            })?;
            self.request_timeout = Some(Duration::from_secs(secs));
        }
        Ok(())
    }

    /// Reject base URLs reqwest could never reach: anything that does not
    /// parse, is not http(s), or has no host.
    pub fn validate(&self) -> Result<(), RelayError> {
        let url = Url::parse(self.base_url.trim())
            .map_err(|e| RelayError::Config(format!("invalid base URL {:?}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RelayError::Config(format!(
                "base URL must use http or https, got {:?}",
                self.base_url
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(RelayError::Config(format!("base URL has no host: {:?}", self.base_url)));
        }
        Ok(())
    }
}
