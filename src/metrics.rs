//! Prometheus metrics for the citizen assistant.
//!
//! Exposes:
//! - `poliscope_retrieval_duration_seconds` (histogram per tier)
//! - `poliscope_retrieval_total` (counter per answering tier)
//! - `poliscope_retrieval_inflight` (gauge)
//! - `poliscope_rate_limited_total` (counter)
//! - `poliscope_command_duration_seconds` / `_total` / `_inflight` (CLI)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, register_int_gauge_vec, Encoder, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, IntGaugeVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static RETRIEVAL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 5ms up to ~10 seconds.
    let buckets =
        prometheus::exponential_buckets(0.005, 2.0, 12).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "poliscope_retrieval_duration_seconds",
        "Context retrieval duration in seconds, by answering tier",
        &["tier"],
        buckets
    )
    .expect("failed to register retrieval duration histogram")
});

static RETRIEVAL_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "poliscope_retrieval_total",
        "Total retrievals by answering tier",
        &["tier"]
    )
    .expect("failed to register retrieval counter")
});

static RETRIEVAL_INFLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "poliscope_retrieval_inflight",
        "Number of in-flight retrievals"
    )
    .expect("failed to register retrieval inflight gauge")
});

static RATE_LIMITED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "poliscope_rate_limited_total",
        "Total requests denied by the rate limiter"
    )
    .expect("failed to register rate limited counter")
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~3 minutes.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "poliscope_command_duration_seconds",
        "CLI command duration in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "poliscope_command_total",
        "Total command executions by status",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

static COMMAND_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "poliscope_command_inflight",
        "Number of in-flight commands",
        &["command"]
    )
    .expect("failed to register inflight gauge")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&RETRIEVAL_DURATION);
    Lazy::force(&RETRIEVAL_TOTAL);
    Lazy::force(&RETRIEVAL_INFLIGHT);
    Lazy::force(&RATE_LIMITED_TOTAL);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
    Lazy::force(&COMMAND_INFLIGHT);
}

/// Increment the retrieval inflight gauge.
pub fn record_retrieval_start() {
    init_collectors();
    RETRIEVAL_INFLIGHT.inc();
}

/// Record one finished retrieval with the tier that answered it.
pub fn record_retrieval(tier: &'static str, duration: Duration) {
    init_collectors();
    RETRIEVAL_INFLIGHT.dec();
    RETRIEVAL_DURATION
        .with_label_values(&[tier])
        .observe(duration.as_secs_f64());
    RETRIEVAL_TOTAL.with_label_values(&[tier]).inc();
}

/// Record one request denied by the rate limiter.
pub fn record_rate_limited() {
    init_collectors();
    RATE_LIMITED_TOTAL.inc();
}

/// Increment inflight gauge for a command.
pub fn record_command_start(command: &'static str) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).inc();
}

/// Record command completion with duration and status.
pub fn record_command_result(command: &'static str, duration: Duration, success: bool) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).dec();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(duration.as_secs_f64());
    COMMAND_TOTAL
        .with_label_values(&[command, if success { "ok" } else { "error" }])
        .inc();
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::from("encode error"))
            .unwrap());
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, encoder.format_type())
        .body(Full::from(buffer))
        .unwrap())
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::new()))
            .unwrap()),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn records_retrieval_per_tier() {
        let before = RETRIEVAL_TOTAL.with_label_values(&["pattern"]).get();

        record_retrieval_start();
        record_retrieval("pattern", Duration::from_millis(12));

        assert_eq!(
            RETRIEVAL_TOTAL.with_label_values(&["pattern"]).get(),
            before + 1
        );
        assert!(
            RETRIEVAL_DURATION
                .with_label_values(&["pattern"])
                .get_sample_count()
                >= 1
        );
    }

    #[test]
    fn inflight_gauge_balances() {
        init_collectors();
        let before = RETRIEVAL_INFLIGHT.get();

        record_retrieval_start();
        assert_eq!(RETRIEVAL_INFLIGHT.get(), before + 1);

        record_retrieval("sentinel", Duration::from_millis(1));
        assert_eq!(RETRIEVAL_INFLIGHT.get(), before);
    }

    #[test]
    fn rate_limited_counter_increments() {
        init_collectors();
        let before = RATE_LIMITED_TOTAL.get();

        record_rate_limited();
        record_rate_limited();

        assert_eq!(RATE_LIMITED_TOTAL.get(), before + 2);
    }

    #[test]
    fn records_successful_command_metrics() {
        let cmd = "test_command_metrics_success";

        record_command_start(cmd);
        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 1);

        record_command_result(cmd, Duration::from_millis(120), true);

        assert_eq!(COMMAND_INFLIGHT.with_label_values(&[cmd]).get(), 0);
        assert_eq!(COMMAND_TOTAL.with_label_values(&[cmd, "ok"]).get(), 1);
        assert_eq!(
            COMMAND_DURATION
                .with_label_values(&[cmd])
                .get_sample_count(),
            1
        );
    }

    #[test]
    fn records_failed_command_metrics() {
        let cmd = "test_command_metrics_error";

        record_command_start(cmd);
        record_command_result(cmd, Duration::from_secs(2), false);

        assert_eq!(COMMAND_TOTAL.with_label_values(&[cmd, "error"]).get(), 1);
    }

    #[tokio::test]
    async fn metrics_response_contains_registered_metrics() {
        record_retrieval_start();
        record_retrieval("keyword", Duration::from_millis(10));

        let response = metrics_response().await.expect("metrics response");
        assert_eq!(response.status(), StatusCode::OK);

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect metrics body")
            .to_bytes();
        let text = String::from_utf8(body_bytes.to_vec()).expect("utf-8 metrics body");
        assert!(text.contains("poliscope_retrieval_total"));
        assert!(text.contains("poliscope_retrieval_duration_seconds"));
    }

    #[tokio::test]
    async fn metrics_response_has_correct_content_type() {
        let response = metrics_response().await.expect("metrics response");

        let content_type = response.headers().get(hyper::header::CONTENT_TYPE);
        assert!(content_type.is_some());

        let ct_str = content_type.unwrap().to_str().unwrap();
        assert!(ct_str.contains("text/plain") || ct_str.contains("text/"));
    }

    #[test]
    fn init_collectors_can_be_called_multiple_times() {
        init_collectors();
        init_collectors();
        init_collectors();
        // Should not panic
    }
}
