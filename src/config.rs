use std::env;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::cache::sled_store;
use crate::circuit::DEFAULT_COOLDOWN;
use crate::error::FlagsError;
use crate::fetcher::{Auth, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Client configuration, usually read from a `flags.toml` file.
///
/// ```toml
/// base_url = "https://api.flags.gg"
/// max_retries = 3
///
/// [auth]
/// project_id = "..."
/// agent_id = "..."
/// environment_id = "..."
///
/// [cache]
/// backend = "sled"
/// path = "/var/lib/myapp/flags.db"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_backend")]
    pub backend: CacheBackend,
    #[serde(default = "default_cache_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Sled,
}

// ── Default value functions ──────────────────────────

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN.as_secs()
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_cache_path() -> String {
    sled_store::DEFAULT_PATH.to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_cache_path(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            auth: Auth::default(),
            cache: CacheConfig::default(),
            cooldown_secs: default_cooldown_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults if the file
    /// doesn't exist or cannot be parsed.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                warn!(path, error = %e, "failed to parse flags config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, FlagsError> {
        toml::from_str(content).map_err(|e| FlagsError::Config(e.to_string()))
    }

    /// Apply `FF_*` environment variable overrides. `FLAGS_*` is reserved
    /// for flag overrides and never read here. Variables that aren't valid
    /// UTF-8 are skipped.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        );
    }

    pub(crate) fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, val) in vars {
            match key.as_str() {
                "FF_BASE_URL" => self.base_url = val,
                "FF_MAX_RETRIES" => match val.parse::<u32>() {
                    Ok(n) => self.max_retries = n,
                    Err(_) => warn!(value = %val, "ignoring invalid FF_MAX_RETRIES"),
                },
                "FF_PROJECT_ID" => self.auth.project_id = val,
                "FF_AGENT_ID" => self.auth.agent_id = val,
                "FF_ENVIRONMENT_ID" => self.auth.environment_id = val,
                "FF_CACHE" => match val.to_lowercase().as_str() {
                    "memory" => self.cache.backend = CacheBackend::Memory,
                    "sled" => self.cache.backend = CacheBackend::Sled,
                    other => warn!(value = other, "unknown FF_CACHE value"),
                },
                "FF_CACHE_PATH" => self.cache.path = val,
                _ => {}
            }
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
