//! Record counters for alerting.
//!
//! The pipeline talks to a [`MetricsSink`]; production wires in
//! [`RecordMetrics`], a `prometheus-client` registry exposed by [`route`].

pub mod route;

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use tracing::warn;

use crate::conf::MetricsConfig;
use crate::model::{Classification, Level};

/// Exception counter key when no class name was found.
pub const UNKNOWN_EXCEPTION_TYPE: &str = "unknown";

/// Counter increments driven by classified records. Implementations must be
/// safe to share between source tasks and must never fail.
#[cfg_attr(test, mockall::automock)]
pub trait MetricsSink: Send + Sync {
    fn record_level(&self, level: Level);
    fn record_exception(&self, exception_type: &str);
    fn record_truncated(&self);
}

/// Apply one classified record to `sink`: one level increment, one exception
/// increment when flagged, one truncation increment when size-capped.
pub fn observe(sink: &dyn MetricsSink, classification: &Classification, truncated: bool) {
    sink.record_level(classification.level);
    if classification.is_exception {
        sink.record_exception(
            classification
                .exception_type
                .as_deref()
                .unwrap_or(UNKNOWN_EXCEPTION_TYPE),
        );
    }
    if truncated {
        sink.record_truncated();
    }
}

type Labels = Vec<(&'static str, String)>;

/// Prometheus-backed sink. Every series carries `host_name` / `host_ip`.
#[derive(Debug)]
pub struct RecordMetrics {
    registry: Registry,
    host_name: String,
    host_ip: String,

    /// Records per severity level
    pub log_level_count: Family<Labels, Counter>,

    /// Exception records per exception type
    pub log_exception_count: Family<Labels, Counter>,

    /// Records force-flushed by a size cap
    pub log_truncated_count: Family<Labels, Counter>,
}

impl Default for RecordMetrics {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

impl RecordMetrics {
    pub fn new(config: &MetricsConfig) -> Self {
        let mut registry = Registry::default();

        let log_level_count = Family::<Labels, Counter>::default();
        registry.register(
            "log_level_count",
            "Number of log records per severity level",
            log_level_count.clone(),
        );

        let log_exception_count = Family::<Labels, Counter>::default();
        registry.register(
            "log_exception_count",
            "Number of log records carrying an exception, per exception type",
            log_exception_count.clone(),
        );

        let log_truncated_count = Family::<Labels, Counter>::default();
        registry.register(
            "log_truncated_count",
            "Number of log records cut at the line or byte limit",
            log_truncated_count.clone(),
        );

        Self {
            registry,
            host_name: config.host_name.clone().unwrap_or_default(),
            host_ip: config.host_ip.clone().unwrap_or_default(),
            log_level_count,
            log_exception_count,
            log_truncated_count,
        }
    }

    fn labels(&self, extra: Option<(&'static str, &str)>) -> Labels {
        let mut labels = Vec::with_capacity(3);
        if let Some((key, value)) = extra {
            labels.push((key, value.to_string()));
        }
        labels.push(("host_name", self.host_name.clone()));
        labels.push(("host_ip", self.host_ip.clone()));
        labels
    }

    /// Encode all metrics in OpenMetrics text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = prometheus_client::encoding::text::encode(&mut buffer, &self.registry) {
            warn!("Failed to encode metrics: {}", e);
        }
        buffer
    }
}

impl MetricsSink for RecordMetrics {
    fn record_level(&self, level: Level) {
        self.log_level_count
            .get_or_create(&self.labels(Some(("level", level.as_str()))))
            .inc();
    }

    fn record_exception(&self, exception_type: &str) {
        self.log_exception_count
            .get_or_create(&self.labels(Some(("type", exception_type))))
            .inc();
    }

    fn record_truncated(&self) {
        self.log_truncated_count.get_or_create(&self.labels(None)).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use std::sync::Arc;

    fn host_config() -> MetricsConfig {
        MetricsConfig {
            host_name: Some("node-a".to_string()),
            host_ip: Some("10.0.0.1".to_string()),
            ..MetricsConfig::default()
        }
    }

    fn classification(level: Level, exception_type: Option<&str>, is_exception: bool) -> Classification {
        Classification {
            level,
            is_exception,
            exception_type: exception_type.map(str::to_string),
        }
    }

    // ─── observe ────────────────────────────────────────────────

    #[test]
    fn test_observe_plain_record_counts_level_only() {
        let mut sink = MockMetricsSink::new();
        sink.expect_record_level().with(eq(Level::Info)).times(1).return_const(());
        sink.expect_record_exception().never();
        sink.expect_record_truncated().never();

        observe(&sink, &classification(Level::Info, None, false), false);
    }

    #[test]
    fn test_observe_exception_without_type_uses_unknown() {
        let mut sink = MockMetricsSink::new();
        sink.expect_record_level().with(eq(Level::Error)).times(1).return_const(());
        sink.expect_record_exception()
            .withf(|t| t == "unknown")
            .times(1)
            .return_const(());
        sink.expect_record_truncated().never();

        observe(&sink, &classification(Level::Error, None, true), false);
    }

    #[test]
    fn test_observe_typed_truncated_exception() {
        let mut sink = MockMetricsSink::new();
        sink.expect_record_level().times(1).return_const(());
        sink.expect_record_exception()
            .withf(|t| t == "java.io.IOException")
            .times(1)
            .return_const(());
        sink.expect_record_truncated().times(1).return_const(());

        observe(
            &sink,
            &classification(Level::Warn, Some("java.io.IOException"), true),
            true,
        );
    }

    // ─── RecordMetrics ──────────────────────────────────────────

    #[test]
    fn test_registers_all_counters() {
        let encoded = RecordMetrics::default().encode();
        assert!(encoded.contains("# HELP log_level_count"));
        assert!(encoded.contains("# HELP log_exception_count"));
        assert!(encoded.contains("# HELP log_truncated_count"));
        assert!(encoded.ends_with("# EOF\n"));
    }

    #[test]
    fn test_level_counter_carries_host_labels() {
        let metrics = RecordMetrics::new(&host_config());
        metrics.record_level(Level::Error);
        metrics.record_level(Level::Error);
        metrics.record_level(Level::Unknown);

        let encoded = metrics.encode();
        assert!(encoded.contains(
            "log_level_count_total{level=\"ERROR\",host_name=\"node-a\",host_ip=\"10.0.0.1\"} 2"
        ));
        assert!(encoded.contains(
            "log_level_count_total{level=\"unknown\",host_name=\"node-a\",host_ip=\"10.0.0.1\"} 1"
        ));
    }

    #[test]
    fn test_exception_and_truncated_counters() {
        let metrics = RecordMetrics::new(&host_config());
        metrics.record_exception("ValueError");
        metrics.record_truncated();

        let encoded = metrics.encode();
        assert!(encoded.contains(
            "log_exception_count_total{type=\"ValueError\",host_name=\"node-a\",host_ip=\"10.0.0.1\"} 1"
        ));
        assert!(encoded
            .contains("log_truncated_count_total{host_name=\"node-a\",host_ip=\"10.0.0.1\"} 1"));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let metrics = Arc::new(RecordMetrics::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_level(Level::Warn);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let labels = metrics.labels(Some(("level", "WARN")));
        assert_eq!(metrics.log_level_count.get_or_create(&labels).get(), 8000);
    }
}
