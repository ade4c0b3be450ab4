//! Boot: logging init, config load and validation, shared detector.

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::AgentConfig;
use crate::error::ConfigError;
use crate::multiline::TimestampDetector;

/// Initialise the tracing / logging subsystem.
///
/// Diagnostics go to stderr; stdout carries the JSON records.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logrecord_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load and validate configuration, then compile the timestamp templates.
///
/// Configuration problems are the only fatal errors; everything after boot
/// degrades per source.
pub fn boot() -> Result<(AgentConfig, Arc<TimestampDetector>), ConfigError> {
    info!("Starting logrecord agent v{}", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::load()?;
    config.validate().map_err(|e| {
        error!("Configuration rejected: {}", e);
        e
    })?;

    info!("Sources: {:?} (follow={})", config.sources, config.follow);
    info!(
        "Multiline: max_lines={}, max_bytes={}, flush_timeout={}ms, empty_lines={:?}, boundary={:?}",
        config.multiline.max_lines,
        config.multiline.max_bytes,
        config.multiline.flush_timeout_ms,
        config.multiline.empty_lines,
        config.multiline.boundary,
    );

    let detector = build_detector(&config)?;
    info!("Timestamp detector ready ({} patterns)", detector.patterns().len());

    Ok((config, detector))
}

/// Built-in templates plus any configured ones, shared by every source.
fn build_detector(config: &AgentConfig) -> Result<Arc<TimestampDetector>, ConfigError> {
    let detector = TimestampDetector::with_patterns(&config.multiline.timestamp_patterns)?;
    Ok(Arc::new(detector))
}
