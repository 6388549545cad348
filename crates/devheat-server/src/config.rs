//! Server configuration.
//!
//! Settings are layered: built-in defaults, then an optional
//! `config.toml` (by default `~/.config/devheat/config.toml`), then
//! environment variables and command-line flags applied by the binary.
//!
//! ```toml
//! bind = "127.0.0.1:3000"
//!
//! [github]
//! token = "ghp_..."
//! cache_ttl_secs = 3600
//!
//! [cache]
//! default_ttl_secs = 600
//! sweep_interval_secs = 300
//!
//! [rate_limit]
//! max_requests = 100
//! window_secs = 60
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devheat_core::TracingOutputFormat;
use devheat_providers::{GitHubConfig, HttpOptions, LeetCodeConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregator::AggregatorConfig;
use crate::ratelimit::RateLimitConfig;

/// Longest accepted rate limit window or sweep interval, in seconds.
const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`ServerConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be written back as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An upstream endpoint is not a valid URL.
    #[error("invalid {name} endpoint {value:?}: {source}")]
    InvalidEndpoint {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    /// A setting has an unusable value.
    #[error("invalid setting {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,

    /// Log output format: pretty, compact or json.
    pub log_format: String,

    /// GitHub upstream settings.
    pub github: GitHubSettings,

    /// LeetCode upstream settings.
    pub leetcode: LeetCodeSettings,

    /// Transport limits shared by both upstreams.
    pub upstream: UpstreamSettings,

    /// Response cache settings.
    pub cache: CacheSettings,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitSettings,
}

/// GitHub upstream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// GraphQL endpoint.
    pub endpoint: String,
    /// Access token. Usually supplied through `GITHUB_TOKEN` instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Freshness of a cached payload, in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            endpoint: GitHubConfig::DEFAULT_ENDPOINT.to_string(),
            token: None,
            cache_ttl_secs: GitHubConfig::DEFAULT_CACHE_TTL_SECS,
        }
    }
}

/// LeetCode upstream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeetCodeSettings {
    /// GraphQL endpoint.
    pub endpoint: String,
    /// Freshness of a cached payload, in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for LeetCodeSettings {
    fn default() -> Self {
        Self {
            endpoint: LeetCodeConfig::DEFAULT_ENDPOINT.to_string(),
            cache_ttl_secs: LeetCodeConfig::DEFAULT_CACHE_TTL_SECS,
        }
    }
}

/// Transport limits for upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Hard deadline per request, in seconds.
    pub timeout_secs: u64,
    /// Largest accepted response body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout_secs: HttpOptions::DEFAULT_TIMEOUT_SECS,
            max_body_bytes: HttpOptions::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// TTL of merged heatmaps when the request sets none, in seconds.
    pub default_ttl_secs: u64,
    /// Upper bound for a requested `cacheTTL`, in seconds.
    pub max_ttl_secs: u64,
    /// Interval between expiry sweeps, in seconds.
    pub sweep_interval_secs: u64,
    /// How long expired upstream payloads remain available as stale
    /// fallback, in seconds.
    pub stale_retention_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: 10 * 60,
            max_ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 5 * 60,
            stale_retention_secs: 24 * 60 * 60,
        }
    }
}

/// Rate limiting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Requests allowed per client and window; 0 disables limiting.
    pub max_requests: u32,
    /// Window length, in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_format: TracingOutputFormat::default().to_string(),
            github: GitHubSettings::default(),
            leetcode: LeetCodeSettings::default(),
            upstream: UpstreamSettings::default(),
            cache: CacheSettings::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("devheat")
            .join("config.toml")
    }

    /// Builder: set the listen address.
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Builder: set the GitHub token.
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github.token = Some(token.into());
        self
    }

    /// Builder: set the GitHub endpoint.
    pub fn with_github_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.github.endpoint = endpoint.into();
        self
    }

    /// Builder: set the LeetCode endpoint.
    pub fn with_leetcode_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.leetcode.endpoint = endpoint.into();
        self
    }

    /// Builder: set the per-window request limit (0 disables).
    pub fn with_rate_limit(mut self, max_requests: u32) -> Self {
        self.rate_limit.max_requests = max_requests;
        self
    }

    /// Builder: set the log format.
    pub fn with_log_format(mut self, format: impl Into<String>) -> Self {
        self.log_format = format.into();
        self
    }

    /// Parses the configured log format.
    pub fn tracing_format(&self) -> Result<TracingOutputFormat, ConfigError> {
        self.log_format
            .parse()
            .map_err(|e: devheat_core::TracingError| ConfigError::Invalid {
                name: "log_format",
                message: e.to_string(),
            })
    }

    fn http_options(&self) -> HttpOptions {
        HttpOptions::default()
            .with_timeout(Duration::from_secs(self.upstream.timeout_secs))
            .with_max_body_bytes(self.upstream.max_body_bytes)
    }

    /// Builds the GitHub provider configuration.
    pub fn github_config(&self) -> Result<GitHubConfig, ConfigError> {
        let mut config = GitHubConfig::new()
            .with_endpoint(&self.github.endpoint)
            .map_err(|source| ConfigError::InvalidEndpoint {
                name: "github",
                value: self.github.endpoint.clone(),
                source,
            })?
            .with_cache_ttl(Duration::from_secs(self.github.cache_ttl_secs))
            .with_http(self.http_options());

        if let Some(ref token) = self.github.token {
            config = config.with_token(token.clone());
        }
        Ok(config)
    }

    /// Builds the LeetCode provider configuration.
    pub fn leetcode_config(&self) -> Result<LeetCodeConfig, ConfigError> {
        let config = LeetCodeConfig::new();
        let http = self
            .http_options()
            .with_user_agent(config.http.user_agent.clone());

        Ok(config
            .with_endpoint(&self.leetcode.endpoint)
            .map_err(|source| ConfigError::InvalidEndpoint {
                name: "leetcode",
                value: self.leetcode.endpoint.clone(),
                source,
            })?
            .with_cache_ttl(Duration::from_secs(self.leetcode.cache_ttl_secs))
            .with_http(http))
    }

    /// Builds the aggregator configuration.
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            default_ttl: Duration::from_secs(self.cache.default_ttl_secs),
            max_ttl: Duration::from_secs(self.cache.max_ttl_secs),
        }
    }

    /// Builds the rate limiter configuration.
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit.max_requests,
            window: Duration::from_secs(self.rate_limit.window_secs),
        }
    }

    /// Returns the interval between cache sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_secs)
    }

    /// Returns the stale retention window.
    pub fn stale_retention(&self) -> Duration {
        Duration::from_secs(self.cache.stale_retention_secs)
    }

    /// Checks settings that defaults cannot make invalid but files can.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracing_format()?;
        self.github_config()?;
        self.leetcode_config()?;

        if !(1..=MAX_INTERVAL_SECS).contains(&self.cache.sweep_interval_secs) {
            return Err(ConfigError::Invalid {
                name: "cache.sweep_interval_secs",
                message: format!("must be between 1 and {MAX_INTERVAL_SECS}"),
            });
        }
        if self.rate_limit.max_requests > 0 && self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "rate_limit.window_secs",
                message: "must be greater than 0 when rate limiting is enabled".to_string(),
            });
        }
        if self.rate_limit.window_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::Invalid {
                name: "rate_limit.window_secs",
                message: format!("must be at most {MAX_INTERVAL_SECS}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.github.endpoint, "https://api.github.com/graphql");
        assert_eq!(config.leetcode.endpoint, "https://leetcode.com/graphql");
        assert_eq!(config.cache.default_ttl_secs, 600);
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_config() {
        let config = ServerConfig::default()
            .with_bind("127.0.0.1:8080".parse().unwrap())
            .with_github_token("ghp_test")
            .with_github_endpoint("http://localhost:9000/graphql")
            .with_leetcode_endpoint("http://localhost:9001/graphql")
            .with_rate_limit(0)
            .with_log_format("json");

        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.tracing_format().unwrap(), TracingOutputFormat::Json);
        assert_eq!(config.rate_limit_config().max_requests, 0);

        let github = config.github_config().unwrap();
        assert_eq!(github.endpoint.as_str(), "http://localhost:9000/graphql");
        assert_eq!(github.token.as_deref(), Some("ghp_test"));

        let leetcode = config.leetcode_config().unwrap();
        assert_eq!(leetcode.endpoint.port(), Some(9001));
        assert!(leetcode.http.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn toml_overrides_defaults() {
        let toml_content = r#"
bind = "127.0.0.1:4000"
log_format = "pretty"

[github]
cache_ttl_secs = 120

[upstream]
timeout_secs = 3

[cache]
max_ttl_secs = 3600

[rate_limit]
max_requests = 10
window_secs = 30
"#;
        let config: ServerConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.bind.port(), 4000);
        assert_eq!(config.github.cache_ttl_secs, 120);
        assert_eq!(config.github.endpoint, GitHubConfig::DEFAULT_ENDPOINT);
        assert_eq!(config.aggregator_config().max_ttl, Duration::from_secs(3600));
        assert_eq!(config.aggregator_config().default_ttl, Duration::from_secs(600));
        assert_eq!(
            config.github_config().unwrap().http.timeout,
            Duration::from_secs(3)
        );
        assert_eq!(config.rate_limit_config().window, Duration::from_secs(30));
    }

    #[test]
    fn invalid_endpoint() {
        let config = ServerConfig::default().with_github_endpoint("not a url");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { name: "github", .. }));
    }

    #[test]
    fn invalid_log_format() {
        let err = ServerConfig::default()
            .with_log_format("xml")
            .validate()
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r#"invalid setting log_format: unknown log format "xml", expected pretty, compact or json"#);
    }

    #[test]
    fn zero_sweep_interval_rejected() {
        let mut config = ServerConfig::default();
        config.cache.sweep_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "cache.sweep_interval_secs", .. })
        ));
    }

    #[test]
    fn oversized_rate_limit_window_rejected() {
        let mut config = ServerConfig::default();
        config.rate_limit.window_secs = u64::MAX;
        let err = config.validate().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid setting rate_limit.window_secs: must be at most 86400");

        config.rate_limit.window_secs = 24 * 60 * 60;
        assert!(config.validate().is_ok());

        config.cache.sweep_interval_secs = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "cache.sweep_interval_secs", .. })
        ));
    }

    #[test]
    fn unknown_toml_is_parse_error() {
        let err = toml::from_str::<ServerConfig>("bind = 42").unwrap_err();
        assert!(ConfigError::from(err).to_string().starts_with("failed to parse config"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[leetcode]\ncache_ttl_secs = 60").unwrap();

        let config = ServerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.leetcode.cache_ttl_secs, 60);
        assert_eq!(config.leetcode_config().unwrap().cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn dump_round_trips_through_toml() {
        let config = ServerConfig::default().with_rate_limit(7);
        let dumped = toml::to_string_pretty(&config).unwrap();
        let parsed: ServerConfig = toml::from_str(&dumped).unwrap();
        assert_eq!(parsed.rate_limit.max_requests, 7);
        assert!(!dumped.contains("token"));
    }

    #[test]
    fn default_path_format() {
        let path = ServerConfig::default_path();
        assert!(path.ends_with("devheat/config.toml"));
    }
}
