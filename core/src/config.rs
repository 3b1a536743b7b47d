use crate::sync::CacheConfig;
use crate::sync::PollingConfig;
use crate::sync::cache::DEFAULT_CACHE_TTL;
use crate::sync::cache::DEFAULT_REQUEST_TIMEOUT;
use crate::sync::controller::DEFAULT_MAX_CONSECUTIVE_FAILURES;
use crate::sync::controller::DEFAULT_POLL_INTERVAL;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_TOML_FILE: &str = "config.toml";
pub const OUTREACH_HOME_ENV: &str = "OUTREACH_HOME";
pub const BASE_URL_ENV: &str = "OUTREACH_API_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid sync config: {0}")]
    Invalid(String),
    #[error("could not resolve a home directory; set OUTREACH_HOME")]
    NoHome,
}

/// Resolved settings for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub base_url: String,
    pub cache_ttl: Duration,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub max_consecutive_failures: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigToml {
    #[serde(default)]
    sync: SyncToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SyncToml {
    base_url: Option<String>,
    cache_ttl_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    max_consecutive_failures: Option<u32>,
}

/// `$OUTREACH_HOME` when set, otherwise `~/.outreach`.
pub fn find_outreach_home() -> Result<PathBuf, ConfigError> {
    if let Some(home) = std::env::var_os(OUTREACH_HOME_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    let mut home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
    home.push(".outreach");
    Ok(home)
}

impl SyncConfig {
    /// Config file from the outreach home, then the base URL environment override.
    pub fn load() -> Result<Self, ConfigError> {
        let home = find_outreach_home()?;
        let mut config = Self::load_from_home(&home)?;
        if let Ok(base_url) = std::env::var(BASE_URL_ENV)
            && !base_url.trim().is_empty()
        {
            debug!("using {BASE_URL_ENV} override");
            config = config.with_base_url(base_url)?;
        }
        Ok(config)
    }

    /// A missing `config.toml` yields the defaults.
    pub fn load_from_home(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(CONFIG_TOML_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no config at {}; using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        Self::from_toml_str(&contents).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse { path, message },
            other => other,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let parsed: ConfigToml = toml::from_str(contents).map_err(|err| ConfigError::Parse {
            path: PathBuf::from(CONFIG_TOML_FILE),
            message: err.to_string(),
        })?;
        let defaults = Self::default();
        let sync = parsed.sync;
        let config = Self {
            base_url: sync.base_url.unwrap_or(defaults.base_url),
            cache_ttl: sync
                .cache_ttl_ms
                .map_or(defaults.cache_ttl, Duration::from_millis),
            poll_interval: sync
                .poll_interval_ms
                .map_or(defaults.poll_interval, Duration::from_millis),
            request_timeout: sync
                .request_timeout_ms
                .map_or(defaults.request_timeout, Duration::from_millis),
            max_consecutive_failures: sync
                .max_consecutive_failures
                .unwrap_or(defaults.max_consecutive_failures),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        self.base_url = base_url.into();
        self.validate()?;
        Ok(self)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        self.poll_interval = interval;
        self.validate()?;
        Ok(self)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.cache_ttl,
            request_timeout: self.request_timeout,
        }
    }

    pub fn polling_config(&self) -> PollingConfig {
        PollingConfig {
            interval: self.poll_interval,
            max_consecutive_failures: self.max_consecutive_failures,
            enabled: true,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".to_string()));
        }
        for (name, value) in [
            ("cache_ttl_ms", self.cache_ttl),
            ("poll_interval_ms", self.poll_interval),
            ("request_timeout_ms", self.request_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }
        if self.max_consecutive_failures == 0 {
            return Err(ConfigError::Invalid(
                "max_consecutive_failures must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
