//! Per-source record pipeline: accumulate, classify, count, forward.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::classify::RecordClassifier;
use crate::error::SourceError;
use crate::metrics::{observe, MetricsSink};
use crate::model::{CompletedRecord, LogRecord, PhysicalLine};
use crate::multiline::RecordAccumulator;

/// How often an idle source is checked for a record past its flush timeout.
pub const TIMEOUT_CHECK_INTERVAL: Duration = Duration::from_millis(150);

/// Owns the accumulator of one source. Every completed record is classified,
/// reported to the metrics sink exactly once, and returned as a [`LogRecord`].
pub struct RecordPipeline {
    source: String,
    accumulator: RecordAccumulator,
    classifier: RecordClassifier,
    metrics: Arc<dyn MetricsSink>,
}

impl RecordPipeline {
    pub fn new(
        source: impl Into<String>,
        accumulator: RecordAccumulator,
        classifier: RecordClassifier,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            source: source.into(),
            accumulator,
            classifier,
            metrics,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn push_line(&mut self, line: PhysicalLine) -> Option<LogRecord> {
        let record = self.accumulator.push(line)?;
        Some(self.emit(record))
    }

    pub fn check_timeout(&mut self) -> Option<LogRecord> {
        let record = self.accumulator.check_timeout()?;
        Some(self.emit(record))
    }

    /// Restart the idle clock of the pending record.
    pub fn touch(&mut self) {
        self.accumulator.touch();
    }

    pub fn finish(&mut self) -> Option<LogRecord> {
        let record = self.accumulator.finish()?;
        Some(self.emit(record))
    }

    fn emit(&self, record: CompletedRecord) -> LogRecord {
        let classification = self.classifier.classify(&record);
        observe(self.metrics.as_ref(), &classification, record.truncated);
        trace!(
            source = %self.source,
            start_seq = record.start_seq,
            lines = record.line_count,
            record_level = %classification.level,
            "record completed"
        );
        LogRecord::new(&self.source, record, classification)
    }
}

/// Drive `pipeline` from `lines` until the stream ends, fails, or `shutdown`
/// fires, then flush the pending record. Returns the number of records sent.
///
/// A read error ends this source only. The final record is sent before the
/// function returns, so awaiting the task is enough to know it was delivered.
pub async fn run_source<S>(
    lines: S,
    mut pipeline: RecordPipeline,
    records: mpsc::Sender<LogRecord>,
    shutdown: CancellationToken,
) -> u64
where
    S: Stream<Item = Result<PhysicalLine, SourceError>>,
{
    tokio::pin!(lines);

    let mut timeout_interval = tokio::time::interval(TIMEOUT_CHECK_INTERVAL);
    timeout_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut sent = 0u64;

    loop {
        // Lines before the idle check: a tick only wins while the source is pending
        let item = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!(source = %pipeline.source(), "source cancelled");
                break;
            }
            item = lines.next() => item,
            _ = timeout_interval.tick() => {
                if let Some(record) = pipeline.check_timeout() {
                    if !forward(&records, record).await {
                        return sent;
                    }
                    sent += 1;
                }
                continue;
            }
        };

        match item {
            Some(Ok(line)) => {
                if let Some(record) = pipeline.push_line(line) {
                    if !forward(&records, record).await {
                        return sent;
                    }
                    sent += 1;
                    // Time blocked on a full channel is not idle time
                    pipeline.touch();
                }
            }
            Some(Err(e)) => {
                error!(source = %pipeline.source(), "Source failed: {}", e);
                break;
            }
            None => break,
        }
    }

    if let Some(record) = pipeline.finish() {
        if forward(&records, record).await {
            sent += 1;
        }
    }

    debug!(source = %pipeline.source(), records = sent, "source finished");
    sent
}

async fn forward(records: &mpsc::Sender<LogRecord>, record: LogRecord) -> bool {
    if records.send(record).await.is_err() {
        warn!("Record writer is gone, dropping record");
        return false;
    }
    true
}
