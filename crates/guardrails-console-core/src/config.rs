//! Console configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `GUARDRAILS_*` environment variables.

use crate::error::ConsoleError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_AUDIT_REFRESH_SECS: u64 = 10;
const DEFAULT_STATS_POLL_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable prefix, e.g. `GUARDRAILS_BASE_URL`.
pub const ENV_PREFIX: &str = "GUARDRAILS";

/// Runtime settings shared by the gateway client and the views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Root URL of the gateway API.
    pub base_url: String,
    /// Audit entries per page.
    pub page_size: usize,
    /// Auto-refresh period of the audit stream while on page 0.
    pub audit_refresh_secs: u64,
    /// Poll period of the stats view.
    pub stats_poll_secs: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Where the API key is persisted. `None` uses the platform config dir.
    pub credential_path: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            audit_refresh_secs: DEFAULT_AUDIT_REFRESH_SECS,
            stats_poll_secs: DEFAULT_STATS_POLL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            credential_path: None,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from an optional file plus the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConsoleError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: ConsoleConfig = settings.try_deserialize()?;
        cfg.validated()
    }

    /// Check invariants and normalize the base URL.
    pub fn validated(mut self) -> Result<Self, ConsoleError> {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if self.base_url.is_empty() {
            return Err(ConsoleError::Config("base_url must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(ConsoleError::Config("page_size must be > 0".to_string()));
        }
        if self.audit_refresh_secs == 0 || self.stats_poll_secs == 0 {
            return Err(ConsoleError::Config(
                "polling intervals must be > 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConsoleError::Config(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn audit_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.audit_refresh_secs)
    }

    pub fn stats_poll_interval(&self) -> Duration {
        Duration::from_secs(self.stats_poll_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolved credential file location.
    pub fn credential_file(&self) -> Result<PathBuf, ConsoleError> {
        if let Some(path) = &self.credential_path {
            return Ok(path.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join("guardrails").join("api_key"))
            .ok_or_else(|| {
                ConsoleError::Config(
                    "no platform config directory; set credential_path".to_string(),
                )
            })
    }
}
