//! Load: config loading from file and environment variables.

use std::path::Path;

use super::model::{AgentConfig, MetricsConfig, MultilineConfig};
use crate::error::ConfigError;

const DEFAULT_CONFIG_PATH: &str = "/etc/logrecord/agent.toml";

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn parse_sources(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AgentConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("LOGRECORD_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using environment variables", config_path);
            Self::from_env()
        };

        // Environment variables override file config for critical settings
        if let Ok(sources) = std::env::var("LOGRECORD_SOURCES") {
            config.sources = parse_sources(&sources);
        }
        if let Some(follow) = env_parse("LOGRECORD_FOLLOW") {
            config.follow = follow;
        }
        if let Ok(addr) = std::env::var("LOGRECORD_METRICS_ADDRESS") {
            config.metrics.bind_address = addr;
        }

        config.metrics.resolve_host_labels();
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AgentConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sources: std::env::var("LOGRECORD_SOURCES")
                .map(|s| parse_sources(&s))
                .unwrap_or(defaults.sources),
            follow: env_parse("LOGRECORD_FOLLOW").unwrap_or(defaults.follow),
            poll_interval_ms: env_parse("LOGRECORD_POLL_INTERVAL_MS")
                .unwrap_or(defaults.poll_interval_ms),
            channel_capacity: env_parse("LOGRECORD_CHANNEL_CAPACITY")
                .unwrap_or(defaults.channel_capacity),
            metrics: MetricsConfig::from_env(),
            multiline: MultilineConfig::from_env(),
        }
    }
}

impl MetricsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_parse("LOGRECORD_METRICS_ENABLED").unwrap_or(defaults.enabled),
            bind_address: std::env::var("LOGRECORD_METRICS_ADDRESS")
                .unwrap_or(defaults.bind_address),
            host_name: None,
            host_ip: None,
        }
    }

    /// Fill unset host labels from the node environment.
    /// `NODE_NAME` wins over `HOSTNAME`, then `/etc/hostname`.
    pub fn resolve_host_labels(&mut self) {
        if self.host_name.is_none() {
            self.host_name = std::env::var("NODE_NAME")
                .or_else(|_| std::env::var("HOSTNAME"))
                .ok()
                .or_else(|| {
                    std::fs::read_to_string("/etc/hostname")
                        .ok()
                        .map(|s| s.trim().to_string())
                })
                .filter(|s| !s.is_empty());
        }
        if self.host_ip.is_none() {
            self.host_ip = std::env::var("NODE_IP").ok().filter(|s| !s.is_empty());
        }
    }
}

impl MultilineConfig {
    /// Load multiline configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_lines: env_parse("LOGRECORD_MULTILINE_MAX_LINES").unwrap_or(defaults.max_lines),
            max_bytes: env_parse("LOGRECORD_MULTILINE_MAX_BYTES").unwrap_or(defaults.max_bytes),
            flush_timeout_ms: env_parse("LOGRECORD_MULTILINE_FLUSH_TIMEOUT_MS")
                .unwrap_or(defaults.flush_timeout_ms),
            ..defaults
        }
    }
}
