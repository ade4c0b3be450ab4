//! Model: AgentConfig and related structs.

use std::collections::HashMap;
use std::net::SocketAddr;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::multiline::TimestampPattern;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Files to read; `-` reads standard input
    pub sources: Vec<String>,
    /// Keep polling sources for appended data after EOF
    pub follow: bool,
    pub poll_interval_ms: u64,
    /// Capacity of the record channel between sources and the writer
    pub channel_capacity: usize,
    pub metrics: MetricsConfig,
    pub multiline: MultilineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub bind_address: String,
    /// Constant `host_name` label; resolved from the environment when unset
    pub host_name: Option<String>,
    /// Constant `host_ip` label
    pub host_ip: Option<String>,
}

/// What to do with empty physical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyLinePolicy {
    /// Treat as a continuation of the current record
    #[default]
    Append,
    /// Discard the line
    Drop,
    /// Close the current record; the line itself is discarded
    Flush,
}

/// How record boundaries are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// First-line rules only
    #[default]
    Heuristic,
    /// First-line rules and a leading timestamp are both required
    HeuristicWithTimestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultilineConfig {
    pub max_lines: usize,
    pub max_bytes: usize,
    /// Idle time after which a pending record is flushed; 0 disables
    pub flush_timeout_ms: u64,
    pub empty_lines: EmptyLinePolicy,
    pub boundary: BoundaryMode,
    /// Extra timestamp templates on top of the built-in ones
    pub timestamp_patterns: Vec<String>,
    pub source_overrides: HashMap<String, SourceMultilineConfig>,
}

/// Per-source multiline override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMultilineConfig {
    pub max_lines: Option<usize>,
    pub max_bytes: Option<usize>,
    pub flush_timeout_ms: Option<u64>,
    pub empty_lines: Option<EmptyLinePolicy>,
    pub boundary: Option<BoundaryMode>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            sources: vec!["-".to_string()],
            follow: false,
            poll_interval_ms: 250,
            channel_capacity: 1024,
            metrics: MetricsConfig::default(),
            multiline: MultilineConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:9464".to_string(),
            host_name: None,
            host_ip: None,
        }
    }
}

impl Default for MultilineConfig {
    fn default() -> Self {
        Self {
            max_lines: 500,
            max_bytes: 1_048_576,
            flush_timeout_ms: 1000,
            empty_lines: EmptyLinePolicy::Append,
            boundary: BoundaryMode::Heuristic,
            timestamp_patterns: Vec::new(),
            source_overrides: HashMap::new(),
        }
    }
}

impl AgentConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("sources must not be empty".to_string()));
        }
        if self.sources.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Invalid("source paths must not be empty".to_string()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be > 0".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be > 0".to_string()));
        }
        self.metrics.validate()?;
        self.multiline.validate()?;
        for source in &self.sources {
            self.multiline.for_source(source).validate()?;
        }
        Ok(())
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled {
            self.bind_address.parse::<SocketAddr>().map_err(|e| {
                ConfigError::Invalid(format!(
                    "metrics.bind_address {:?} is not a socket address: {}",
                    self.bind_address, e
                ))
            })?;
        }
        Ok(())
    }
}

impl MultilineConfig {
    /// Validate multiline configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lines == 0 {
            return Err(ConfigError::Invalid("multiline.max_lines must be > 0".to_string()));
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid("multiline.max_bytes must be > 0".to_string()));
        }
        for template in &self.timestamp_patterns {
            TimestampPattern::compile(template)?;
        }
        Ok(())
    }
}
