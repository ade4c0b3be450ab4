//! Serve: wire sources, pipelines, writer and metrics endpoint, run to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::classify::RecordClassifier;
use crate::conf::AgentConfig;
use crate::metrics::route::serve_metrics;
use crate::metrics::{MetricsSink, RecordMetrics};
use crate::multiline::{RecordAccumulator, TimestampDetector};
use crate::runtime::stop::cancel_on_signal;
use crate::service::{run_source, write_records, LineSource, RecordPipeline};

/// Run every configured source to completion (or until shutdown), writing
/// records to stdout.
///
/// Each source task sends its final record before returning; the writer is
/// awaited after all sources, so nothing accepted by a pipeline is lost on a
/// graceful stop.
pub async fn serve(
    config: AgentConfig,
    detector: Arc<TimestampDetector>,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let metrics = Arc::new(RecordMetrics::new(&config.metrics));
    let metrics_task = if config.metrics.enabled {
        Some(tokio::spawn(serve_metrics(
            config.metrics.bind_address.clone(),
            Arc::clone(&metrics),
            shutdown.clone(),
        )))
    } else {
        info!("Metrics endpoint disabled");
        None
    };

    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let writer = tokio::spawn(write_records(rx, tokio::io::stdout()));

    let classifier = RecordClassifier::default();
    let sink: Arc<dyn MetricsSink> = metrics.clone();
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    let mut sources = JoinSet::new();
    for path in &config.sources {
        let multiline = config.multiline.for_source(path);
        let pipeline = RecordPipeline::new(
            path.clone(),
            RecordAccumulator::new(&multiline, Arc::clone(&detector)),
            classifier,
            Arc::clone(&sink),
        );
        let source = LineSource::new(path.clone(), config.follow, poll_interval);

        info!("Reading source: {}", source.name());
        sources.spawn(run_source(source.lines(), pipeline, tx.clone(), shutdown.clone()));
    }
    // Writer ends once the last source task drops its sender
    drop(tx);

    info!("logrecord agent is running, press Ctrl+C to stop");

    let mut records = 0u64;
    while let Some(result) = sources.join_next().await {
        match result {
            Ok(sent) => records += sent,
            Err(e) => error!("Source task failed: {}", e),
        }
    }

    let written = writer.await??;

    shutdown.cancel();
    if let Some(task) = metrics_task {
        if let Err(e) = task.await {
            error!("Metrics task failed: {}", e);
        }
    }

    info!("Shutdown complete: {} records assembled, {} written", records, written);
    Ok(())
}
