//! Record classification: severity level and exception detection.
//!
//! Both are pure text scans over closed token tables, so the policy can be
//! swapped without touching the accumulator.

pub mod exception;
pub mod level;

pub use exception::{detect_exception, ExceptionScan, EXCEPTION_MARKERS, EXCEPTION_SUFFIXES};
pub use level::{detect_level, LEVEL_TOKENS};

use crate::model::{Classification, CompletedRecord, Level};

#[derive(Debug, Clone, Copy)]
pub struct RecordClassifier {
    level_tokens: &'static [(&'static str, Level)],
    markers: &'static [&'static str],
    suffixes: &'static [&'static str],
}

impl RecordClassifier {
    pub fn new(
        level_tokens: &'static [(&'static str, Level)],
        markers: &'static [&'static str],
        suffixes: &'static [&'static str],
    ) -> Self {
        Self {
            level_tokens,
            markers,
            suffixes,
        }
    }

    pub fn classify(&self, record: &CompletedRecord) -> Classification {
        self.classify_text(&record.text)
    }

    /// Level from the first line, exception from the whole text.
    pub fn classify_text(&self, text: &str) -> Classification {
        let first_line = text.split('\n').next().unwrap_or("");
        let level = level::detect_level_with(first_line, self.level_tokens);
        let scan = exception::detect_exception_with(text, self.markers, self.suffixes);
        Classification {
            level,
            is_exception: scan.is_exception,
            exception_type: scan.exception_type,
        }
    }
}

impl Default for RecordClassifier {
    fn default() -> Self {
        Self::new(LEVEL_TOKENS, EXCEPTION_MARKERS, EXCEPTION_SUFFIXES)
    }
}
