//! Configuration for Social Presence
//!
//! Settings come from a TOML file, then environment variables, then
//! whatever the binary applies from its command line. The TTL policy
//! table is deliberately absent: it is fixed in [`crate::constants`].

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::DEFAULT_SHADOW_GRACE;
use crate::types::{PresenceError, Result};

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "social-presence.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Status store configuration
    pub store: StoreConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: SocketAddr,
}

/// Which status store backs the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process TTL map; state is lost on restart
    #[default]
    Memory,
    /// Redis server at `store.url`
    Redis,
}

impl StoreBackend {
    /// Config name of the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Redis => "redis",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = PresenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(PresenceError::config(format!("Invalid store backend: {}", other))),
        }
    }
}

/// Status store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store implementation to run against
    pub backend: StoreBackend,

    /// Redis connection URL, used by the `redis` backend
    pub url: String,

    /// Upper bound on any single store call
    #[serde(with = "duration_str")]
    pub call_timeout: Duration,

    /// How much longer the shadow record lives than the primary
    #[serde(with = "duration_str")]
    pub shadow_grace: Duration,

    /// Reclaim fully expired records every this many writes (0 = never)
    pub purge_every_writes: u64,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose Prometheus metrics at `/metrics`
    pub enable_prometheus: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "redis://127.0.0.1:6379".to_string(),
            call_timeout: Duration::from_secs(2),
            shadow_grace: DEFAULT_SHADOW_GRACE,
            purge_every_writes: 4096,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enable_prometheus: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Where a loaded configuration came from
///
/// Loading happens before logging is set up, so the outcome is handed back
/// to the caller to report once a subscriber exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// The file passed explicitly
    File(PathBuf),
    /// The default file found in the working directory
    DefaultFile(PathBuf),
    /// The default file exists but could not be used
    DefaultFileInvalid {
        /// Path of the rejected file
        path: PathBuf,
        /// Why it was rejected
        error: String,
    },
    /// No file; built-in defaults
    Defaults,
}

impl ConfigSource {
    /// Report the source through `tracing`
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) | ConfigSource::DefaultFile(path) => {
                info!("Loaded configuration from: {}", path.display());
            }
            ConfigSource::DefaultFileInvalid { path, error } => {
                warn!("Failed to load {}: {}. Using defaults.", path.display(), error);
            }
            ConfigSource::Defaults => info!("No config file specified, using defaults"),
        }
    }
}

impl Config {
    /// Load configuration from an optional file, then apply environment overrides
    ///
    /// An explicit path must exist and parse. Without one, the default file
    /// is used if present, otherwise built-in defaults.
    pub fn load(path: Option<&str>) -> Result<(Self, ConfigSource)> {
        Self::load_with_default(path, Path::new(DEFAULT_CONFIG_FILE))
    }

    /// [`Config::load`] with an explicit fallback file
    pub fn load_with_default(path: Option<&str>, default_file: &Path) -> Result<(Self, ConfigSource)> {
        let (mut config, source) = match path {
            Some(path) => (Self::from_file(path)?, ConfigSource::File(PathBuf::from(path))),
            None if default_file.exists() => match Self::from_file(default_file) {
                Ok(config) => (config, ConfigSource::DefaultFile(default_file.to_path_buf())),
                Err(e) => (
                    Config::default(),
                    ConfigSource::DefaultFileInvalid {
                        path: default_file.to_path_buf(),
                        error: e.to_string(),
                    },
                ),
            },
            None => (Config::default(), ConfigSource::Defaults),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok((config, source))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PresenceError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| PresenceError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply `PRESENCE_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("PRESENCE_HTTP_ADDR") {
            self.server.http_addr = addr
                .parse()
                .map_err(|e| PresenceError::config(format!("Invalid HTTP address: {}", e)))?;
        }

        if let Some(backend) = lookup("PRESENCE_STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }

        if let Some(url) = lookup("PRESENCE_STORE_URL") {
            self.store.url = url;
        }

        if let Some(timeout) = lookup("PRESENCE_STORE_TIMEOUT") {
            self.store.call_timeout = parse_duration(&timeout)
                .map_err(|e| PresenceError::config(format!("Invalid store timeout: {}", e)))?;
        }

        if let Some(grace) = lookup("PRESENCE_SHADOW_GRACE") {
            self.store.shadow_grace = parse_duration(&grace)
                .map_err(|e| PresenceError::config(format!("Invalid shadow grace: {}", e)))?;
        }

        if let Some(enabled) = lookup("PRESENCE_METRICS") {
            self.metrics.enable_prometheus = enabled
                .parse()
                .map_err(|e| PresenceError::config(format!("Invalid metrics flag: {}", e)))?;
        }

        if let Some(level) = lookup("PRESENCE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("PRESENCE_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.store.call_timeout.is_zero() {
            return Err(PresenceError::config("Store call timeout must be positive"));
        }

        if self.store.shadow_grace.is_zero() {
            return Err(PresenceError::config("Shadow grace window must be positive"));
        }

        if self.store.backend == StoreBackend::Redis
            && !(self.store.url.starts_with("redis://") || self.store.url.starts_with("rediss://"))
        {
            return Err(PresenceError::config(format!(
                "Redis store URL must use redis:// or rediss://, got: {}",
                self.store.url
            )));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(PresenceError::config(format!("Invalid log level: {}", other))),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => return Err(PresenceError::config(format!("Invalid log format: {}", other))),
        }

        Ok(())
    }
}

/// Parse durations like `500ms`, `30s`, `10m`, `24h`, or bare seconds
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let (number, unit_ms) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (s, 1_000)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("Invalid duration format: '{}'", s))?;
    value
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("Duration out of range: '{}'", s))
}

/// Render a duration in the largest unit that represents it exactly
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms % 3_600_000 == 0 && ms > 0 {
        format!("{}h", ms / 3_600_000)
    } else if ms % 60_000 == 0 && ms > 0 {
        format!("{}m", ms / 60_000)
    } else if ms % 1_000 == 0 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{}ms", ms)
    }
}

/// Serde adapter for human readable durations
mod duration_str {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(de::Error::custom)
    }
}
