use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::conf::{BoundaryMode, EmptyLinePolicy, MultilineConfig};
use crate::model::{CompletedRecord, FlushReason, PhysicalLine};

use super::first_line::is_first_line;
use super::timestamp::TimestampDetector;

enum RecordAction {
    StartNew,
    Append,
    FlushAndStartNew(FlushReason),
    FlushAndDiscard,
    Discard,
}

/// Reassembles logical records from physical lines of a single source.
///
/// The accumulator is either empty or holds one in-flight record:
/// - the first line seen while empty always starts a record
/// - a first line while accumulating flushes the current record and starts a new one
/// - a continuation line is appended, unless that would exceed `max_lines` or
///   `max_bytes`, in which case the current record is force-flushed with
///   `truncated = true` and the line starts a new record
/// - `finish()` flushes whatever is pending at end of stream
///
/// Records come out strictly in the order their first line arrived.
pub struct RecordAccumulator {
    pending: Option<InFlightRecord>,
    max_lines: usize,
    max_bytes: usize,
    timeout: Duration,
    last_update: Option<Instant>,
    empty_lines: EmptyLinePolicy,
    boundary: BoundaryMode,
    detector: Arc<TimestampDetector>,
}

impl RecordAccumulator {
    pub fn new(config: &MultilineConfig, detector: Arc<TimestampDetector>) -> Self {
        Self {
            pending: None,
            max_lines: config.max_lines.max(1),
            max_bytes: config.max_bytes.max(1),
            timeout: Duration::from_millis(config.flush_timeout_ms),
            last_update: None,
            empty_lines: config.empty_lines,
            boundary: config.boundary,
            detector,
        }
    }

    /// Feed one physical line. Returns the record completed by this line, if any.
    pub fn push(&mut self, line: PhysicalLine) -> Option<CompletedRecord> {
        match self.decide(&line.text) {
            RecordAction::StartNew => {
                self.start_new_record(line);
                None
            }
            RecordAction::Append => {
                if let Some(ref mut record) = self.pending {
                    record.append(line);
                    self.last_update = Some(Instant::now());
                }
                None
            }
            RecordAction::FlushAndStartNew(reason) => {
                let complete = self.flush(reason);
                self.start_new_record(line);
                complete
            }
            RecordAction::FlushAndDiscard => {
                tracing::trace!(seq = line.seq, "multiline: empty line closes record");
                self.flush(FlushReason::EmptyLine)
            }
            RecordAction::Discard => {
                tracing::trace!(seq = line.seq, "multiline: empty line dropped");
                None
            }
        }
    }

    fn decide(&self, text: &str) -> RecordAction {
        if text.is_empty() {
            match self.empty_lines {
                EmptyLinePolicy::Append => {}
                EmptyLinePolicy::Drop => return RecordAction::Discard,
                EmptyLinePolicy::Flush if self.pending.is_some() => {
                    return RecordAction::FlushAndDiscard
                }
                EmptyLinePolicy::Flush => return RecordAction::Discard,
            }
        }

        let Some(ref record) = self.pending else {
            return RecordAction::StartNew;
        };

        if self.is_boundary(text) {
            tracing::trace!("multiline: first line detected, flushing");
            return RecordAction::FlushAndStartNew(FlushReason::NextRecord);
        }

        if record.would_exceed(text, self.max_lines, self.max_bytes) {
            tracing::debug!(
                start_seq = record.start_seq,
                lines = record.lines.len(),
                bytes = record.bytes,
                max_lines = self.max_lines,
                max_bytes = self.max_bytes,
                "multiline: size limit reached, force-flushing"
            );
            return RecordAction::FlushAndStartNew(FlushReason::SizeLimit);
        }

        RecordAction::Append
    }

    fn is_boundary(&self, text: &str) -> bool {
        match self.boundary {
            BoundaryMode::Heuristic => is_first_line(text),
            BoundaryMode::HeuristicWithTimestamp => {
                is_first_line(text) && self.detector.contains_timestamp(text)
            }
        }
    }

    /// Flush the pending record if it has been idle longer than the flush
    /// timeout. Call periodically so quiet sources still emit their last record.
    /// A zero timeout disables idle flushing.
    pub fn check_timeout(&mut self) -> Option<CompletedRecord> {
        if self.timeout.is_zero() {
            return None;
        }
        let last = self.last_update?;
        if last.elapsed() > self.timeout {
            tracing::debug!(
                elapsed_ms = last.elapsed().as_millis() as u64,
                "multiline: idle timeout flush"
            );
            return self.flush(FlushReason::IdleTimeout);
        }
        None
    }

    /// End of stream: flush the pending record, if any, and return to empty.
    pub fn finish(&mut self) -> Option<CompletedRecord> {
        self.flush(FlushReason::EndOfStream)
    }

    /// Restart the idle clock of the pending record. Time the caller spent
    /// blocked downstream must not count as the source being idle.
    pub fn touch(&mut self) {
        if self.pending.is_some() {
            self.last_update = Some(Instant::now());
        }
    }

    /// Returns true if a record is being assembled.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn flush(&mut self, reason: FlushReason) -> Option<CompletedRecord> {
        let record = self.pending.take()?;
        self.last_update = None;
        Some(record.into_completed(reason))
    }

    fn start_new_record(&mut self, line: PhysicalLine) {
        self.pending = Some(InFlightRecord::new(line));
        self.last_update = Some(Instant::now());
    }
}

struct InFlightRecord {
    lines: Vec<String>,
    start_seq: u64,
    last_seq: u64,
    /// Joined size including `\n` separators
    bytes: usize,
}

impl InFlightRecord {
    fn new(line: PhysicalLine) -> Self {
        Self {
            bytes: line.text.len(),
            start_seq: line.seq,
            last_seq: line.seq,
            lines: vec![line.text],
        }
    }

    fn would_exceed(&self, next: &str, max_lines: usize, max_bytes: usize) -> bool {
        self.lines.len() + 1 > max_lines || self.bytes + 1 + next.len() > max_bytes
    }

    fn append(&mut self, line: PhysicalLine) {
        self.bytes += 1 + line.text.len();
        self.last_seq = line.seq;
        self.lines.push(line.text);
    }

    fn into_completed(self, reason: FlushReason) -> CompletedRecord {
        CompletedRecord {
            line_count: self.lines.len(),
            text: self.lines.join("\n"),
            start_seq: self.start_seq,
            end_seq: self.last_seq,
            truncated: reason == FlushReason::SizeLimit,
            flush_reason: reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MultilineConfig {
        MultilineConfig {
            max_lines: 50,
            max_bytes: 64 * 1024,
            flush_timeout_ms: 300,
            ..MultilineConfig::default()
        }
    }

    fn accumulator(config: &MultilineConfig) -> RecordAccumulator {
        RecordAccumulator::new(config, Arc::new(TimestampDetector::default()))
    }

    /// Push every line with increasing sequence numbers, then end the stream.
    fn assemble(acc: &mut RecordAccumulator, lines: &[&str]) -> Vec<CompletedRecord> {
        let mut out: Vec<CompletedRecord> = lines
            .iter()
            .enumerate()
            .filter_map(|(seq, text)| acc.push(PhysicalLine::new(seq as u64, *text)))
            .collect();
        out.extend(acc.finish());
        out
    }

    // ─── End-to-end scenarios ───────────────────────────────────

    #[test]
    fn test_stack_trace_is_one_record() {
        let mut acc = accumulator(&test_config());
        let records = assemble(
            &mut acc,
            &[
                "2024-01-02 10:00:00 ERROR boom",
                "\tat Foo.bar(Foo.java:10)",
                "Caused by: NPE",
                "\tat Baz.qux",
            ],
        );

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.line_count, 4);
        assert_eq!(
            record.text,
            "2024-01-02 10:00:00 ERROR boom\n\tat Foo.bar(Foo.java:10)\nCaused by: NPE\n\tat Baz.qux"
        );
        assert_eq!(record.start_seq, 0);
        assert_eq!(record.end_seq, 3);
        assert!(!record.truncated);
        assert_eq!(record.flush_reason, FlushReason::EndOfStream);
    }

    #[test]
    fn test_single_lines_are_separate_records() {
        let mut acc = accumulator(&test_config());
        assert!(acc.push(PhysicalLine::new(0, "INFO start")).is_none());

        let first = acc.push(PhysicalLine::new(1, "INFO done")).unwrap();
        assert_eq!(first.text, "INFO start");
        assert_eq!(first.line_count, 1);
        assert_eq!(first.flush_reason, FlushReason::NextRecord);

        let second = acc.finish().unwrap();
        assert_eq!(second.text, "INFO done");
        assert_eq!(second.start_seq, 1);
        assert!(!acc.has_pending());
    }

    #[test]
    fn test_size_cap_force_flushes_and_resumes() {
        let config = MultilineConfig {
            max_lines: 3,
            ..test_config()
        };
        let mut acc = accumulator(&config);
        let records = assemble(
            &mut acc,
            &["ERROR x", "\tat 1", "\tat 2", "\tat 3", "\tat 4", "INFO next"],
        );

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].text, "ERROR x\n\tat 1\n\tat 2");
        assert!(records[0].truncated);
        assert_eq!(records[0].flush_reason, FlushReason::SizeLimit);

        // Assembly resumes with the line that did not fit
        assert_eq!(records[1].text, "\tat 3\n\tat 4");
        assert_eq!(records[1].start_seq, 3);
        assert!(!records[1].truncated);

        assert_eq!(records[2].text, "INFO next");
        assert!(!records[2].truncated);
    }

    #[test]
    fn test_byte_cap_counts_separators() {
        let config = MultilineConfig {
            max_bytes: 10,
            ..test_config()
        };
        let mut acc = accumulator(&config);

        // "ab" + "\n" + "\tcdefg" = 9 bytes, fits
        assert!(acc.push(PhysicalLine::new(0, "ab")).is_none());
        assert!(acc.push(PhysicalLine::new(1, "\tcdefg")).is_none());
        // + "\n" + "\th" = 12 bytes, does not fit
        let flushed = acc.push(PhysicalLine::new(2, "\th")).unwrap();
        assert_eq!(flushed.text, "ab\n\tcdefg");
        assert!(flushed.truncated);
    }

    #[test]
    fn test_oversized_single_line_is_kept_whole() {
        let config = MultilineConfig {
            max_bytes: 8,
            ..test_config()
        };
        let mut acc = accumulator(&config);
        let long = "X".repeat(100);
        let records = assemble(&mut acc, &[long.as_str(), "INFO next"]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, long);
        assert!(!records[0].truncated);
    }

    // ─── State machine edges ────────────────────────────────────

    #[test]
    fn test_first_line_of_stream_always_starts_record() {
        let mut acc = accumulator(&test_config());
        let records = assemble(&mut acc, &["\tat orphan.frame", "INFO next"]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "\tat orphan.frame");
    }

    #[test]
    fn test_finish_when_empty_is_noop() {
        let mut acc = accumulator(&test_config());
        assert!(acc.finish().is_none());
        assert!(acc.finish().is_none());
    }

    #[test]
    fn test_usable_after_finish() {
        let mut acc = accumulator(&test_config());
        assemble(&mut acc, &["INFO a"]);
        let records = assemble(&mut acc, &["INFO b", "  more"]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "INFO b\n  more");
    }

    #[test]
    fn test_json_block_grouped_until_closing_brace() {
        let mut acc = accumulator(&test_config());
        let records = assemble(
            &mut acc,
            &["INFO payload {", "  \"id\": 1,", "  \"ok\": true", "}", "INFO after"],
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line_count, 4);
        assert_eq!(records[1].text, "INFO after");
    }

    // ─── Properties ─────────────────────────────────────────────

    const MIXED: &[&str] = &[
        "2024-01-02 10:00:00 INFO boot",
        "2024-01-02 10:00:01 ERROR failed",
        "java.lang.IllegalStateException: bad",
        "\tat a.B.c(B.java:1)",
        "Caused by: java.io.IOException",
        "\t... 3 more",
        "",
        "for call at svc.Call",
        "WARN retry",
        "}",
        "  indented",
        "DEBUG end",
    ];

    #[test]
    fn test_assembly_is_idempotent() {
        let first = assemble(&mut accumulator(&test_config()), MIXED);
        let second = assemble(&mut accumulator(&test_config()), MIXED);
        assert_eq!(first, second);
    }

    #[test]
    fn test_records_ordered_by_start_seq() {
        let config = MultilineConfig {
            max_lines: 2,
            ..test_config()
        };
        let records = assemble(&mut accumulator(&config), MIXED);
        assert!(records.windows(2).all(|w| w[0].start_seq < w[1].start_seq));
        assert!(records.windows(2).all(|w| w[0].end_seq < w[1].start_seq));
    }

    #[test]
    fn test_round_trip_reproduces_input() {
        let records = assemble(&mut accumulator(&test_config()), MIXED);
        let joined: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(joined.join("\n"), MIXED.join("\n"));

        let total: usize = records.iter().map(|r| r.line_count).sum();
        assert_eq!(total, MIXED.len());
    }

    // ─── Empty-line policies ────────────────────────────────────

    #[test]
    fn test_empty_line_appended_by_default() {
        let records = assemble(&mut accumulator(&test_config()), &["INFO a", "", "INFO b"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "INFO a\n");
        assert_eq!(records[0].line_count, 2);
    }

    #[test]
    fn test_empty_line_drop_policy() {
        let config = MultilineConfig {
            empty_lines: EmptyLinePolicy::Drop,
            ..test_config()
        };
        let records = assemble(
            &mut accumulator(&config),
            &["", "ERROR a", "", "\tat x", "INFO b"],
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "ERROR a\n\tat x");
        assert_eq!(records[0].start_seq, 1);
    }

    #[test]
    fn test_empty_line_flush_policy() {
        let config = MultilineConfig {
            empty_lines: EmptyLinePolicy::Flush,
            ..test_config()
        };
        let mut acc = accumulator(&config);
        assert!(acc.push(PhysicalLine::new(0, "ERROR a")).is_none());
        assert!(acc.push(PhysicalLine::new(1, "\tat x")).is_none());

        let flushed = acc.push(PhysicalLine::new(2, "")).unwrap();
        assert_eq!(flushed.text, "ERROR a\n\tat x");
        assert_eq!(flushed.flush_reason, FlushReason::EmptyLine);
        assert!(!flushed.truncated);
        assert!(!acc.has_pending());

        // Nothing pending: the empty line is simply dropped
        assert!(acc.push(PhysicalLine::new(3, "")).is_none());
        assert!(!acc.has_pending());
    }

    // ─── Boundary modes ─────────────────────────────────────────

    #[test]
    fn test_timestamp_boundary_mode() {
        let config = MultilineConfig {
            boundary: BoundaryMode::HeuristicWithTimestamp,
            ..test_config()
        };
        let records = assemble(
            &mut accumulator(&config),
            &[
                "2024-01-02 10:00:00 ERROR query failed",
                "SELECT *",
                "FROM users",
                "2024-01-02 10:00:01 INFO recovered",
            ],
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line_count, 3);
        assert_eq!(records[1].text, "2024-01-02 10:00:01 INFO recovered");
    }

    #[test]
    fn test_heuristic_mode_ignores_timestamps() {
        let records = assemble(
            &mut accumulator(&test_config()),
            &["2024-01-02 10:00:00 ERROR query failed", "SELECT *"],
        );
        assert_eq!(records.len(), 2);
    }

    // ─── Timeout handling ───────────────────────────────────────

    #[test]
    fn test_proactive_timeout_check() {
        let config = MultilineConfig {
            flush_timeout_ms: 50,
            ..test_config()
        };
        let mut acc = accumulator(&config);
        acc.push(PhysicalLine::new(0, "ERROR panic"));
        acc.push(PhysicalLine::new(1, "\tat main"));

        assert!(acc.check_timeout().is_none());
        assert!(acc.has_pending());

        std::thread::sleep(Duration::from_millis(100));

        let flushed = acc.check_timeout().unwrap();
        assert_eq!(flushed.line_count, 2);
        assert_eq!(flushed.flush_reason, FlushReason::IdleTimeout);
        assert!(!flushed.truncated);
        assert!(!acc.has_pending());
    }

    #[test]
    fn test_zero_timeout_disables_idle_flush() {
        let config = MultilineConfig {
            flush_timeout_ms: 0,
            ..test_config()
        };
        let mut acc = accumulator(&config);
        acc.push(PhysicalLine::new(0, "ERROR panic"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(acc.check_timeout().is_none());
        assert!(acc.has_pending());
    }

    #[test]
    fn test_check_timeout_no_pending() {
        let mut acc = accumulator(&test_config());
        assert!(acc.check_timeout().is_none());
    }

    #[test]
    fn test_touch_restarts_idle_clock() {
        let config = MultilineConfig {
            flush_timeout_ms: 50,
            ..test_config()
        };
        let mut acc = accumulator(&config);
        acc.push(PhysicalLine::new(0, "ERROR panic"));

        std::thread::sleep(Duration::from_millis(100));
        acc.touch();
        assert!(acc.check_timeout().is_none());
        assert!(acc.has_pending());

        acc.push(PhysicalLine::new(1, "\tat main"));
        let record = acc.finish().unwrap();
        assert_eq!(record.text, "ERROR panic\n\tat main");
        assert_eq!(record.flush_reason, FlushReason::EndOfStream);
    }

    #[test]
    fn test_touch_without_pending_is_noop() {
        let mut acc = accumulator(&test_config());
        acc.touch();
        assert!(!acc.has_pending());
        assert!(acc.check_timeout().is_none());
    }
}
