use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One physical line as delivered by a line source, terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalLine {
    /// Arrival sequence number, monotonic per source
    pub seq: u64,
    pub text: String,
}

impl PhysicalLine {
    pub fn new(seq: u64, text: impl Into<String>) -> Self {
        Self {
            seq,
            text: text.into(),
        }
    }
}

/// Why the accumulator closed a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    /// The next first line arrived
    NextRecord,
    /// `max_lines` / `max_bytes` would have been exceeded
    SizeLimit,
    /// No line arrived within the flush timeout
    IdleTimeout,
    /// An empty line closed the record (`EmptyLinePolicy::Flush`)
    EmptyLine,
    /// The source ended or the pipeline was cancelled
    EndOfStream,
}

/// A logical record produced by flushing the in-flight buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRecord {
    /// Buffered lines joined with `\n`, arrival order preserved
    pub text: String,
    pub start_seq: u64,
    pub end_seq: u64,
    pub line_count: usize,
    /// Set only when the record was force-flushed by a size cap
    pub truncated: bool,
    pub flush_reason: FlushReason,
}

impl CompletedRecord {
    /// First physical line of the record.
    pub fn first_line(&self) -> &str {
        self.text.split('\n').next().unwrap_or("")
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

/// Closed severity enumeration. `Unknown` when no token matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "TRACE")]
    Trace,
    #[serde(rename = "DEBUG")]
    Debug,
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "FATAL")]
    Fatal,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Level {
    /// Label value used for the `level` metric label and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata derived from a completed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub level: Level,
    pub is_exception: bool,
    /// Class-name-like token preceding an exception suffix, if one was found
    pub exception_type: Option<String>,
}

/// Unit emitted downstream: record text plus labels.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub source: String,
    pub text: String,
    pub start_seq: u64,
    pub end_seq: u64,
    pub line_count: usize,
    pub level: Level,
    pub is_exception: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
    pub truncated: bool,
    pub flush_reason: FlushReason,
    /// Serializes as ISO-8601
    pub observed_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(source: &str, record: CompletedRecord, classification: Classification) -> Self {
        Self {
            source: source.to_string(),
            text: record.text,
            start_seq: record.start_seq,
            end_seq: record.end_seq,
            line_count: record.line_count,
            level: classification.level,
            is_exception: classification.is_exception,
            exception_type: classification.exception_type,
            truncated: record.truncated,
            flush_reason: record.flush_reason,
            observed_at: Utc::now(),
        }
    }
}
