//! HTTP exposition of [`RecordMetrics`] at `GET /metrics`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::RecordMetrics;

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// `GET /metrics` in OpenMetrics text.
///
/// Counters are declared as `log_level_count`, `log_exception_count` and
/// `log_truncated_count` (the `# TYPE` lines), and their samples carry the
/// OpenMetrics `_total` suffix: query `log_level_count_total{level="ERROR"}`.
pub fn router(metrics: Arc<RecordMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<RecordMetrics>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], metrics.encode())
}

/// Serve the metrics endpoint until `shutdown` fires.
///
/// An unusable address is logged and the function returns; log processing
/// does not depend on the endpoint being reachable.
pub async fn serve_metrics(bind_address: String, metrics: Arc<RecordMetrics>, shutdown: CancellationToken) {
    let addr: SocketAddr = match bind_address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid metrics address {}: {}", bind_address, e);
            return;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind metrics endpoint on {}: {}", addr, e);
            return;
        }
    };

    info!("Metrics endpoint listening on: http://{}/metrics", addr);

    if let Err(e) = axum::serve(listener, router(metrics))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        error!("Metrics server error: {}", e);
    }

    info!("Metrics endpoint stopped");
}
