//! Group: per-source multiline configuration resolution.

use super::model::MultilineConfig;

impl MultilineConfig {
    /// Effective config for one source: base values with the matching
    /// `source_overrides` entry (keyed by source path) applied on top.
    pub fn for_source(&self, source: &str) -> Self {
        let mut config = self.clone();
        // A per-source config never needs the full overrides map
        config.source_overrides.clear();

        if let Some(over) = self.source_overrides.get(source) {
            if let Some(max) = over.max_lines {
                config.max_lines = max;
            }
            if let Some(max) = over.max_bytes {
                config.max_bytes = max;
            }
            if let Some(timeout) = over.flush_timeout_ms {
                config.flush_timeout_ms = timeout;
            }
            if let Some(policy) = over.empty_lines {
                config.empty_lines = policy;
            }
            if let Some(boundary) = over.boundary {
                config.boundary = boundary;
            }
        }

        config
    }
}
