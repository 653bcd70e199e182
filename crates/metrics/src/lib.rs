//! Metrics and tracing setup for corvid.
//!
//! Provides a global [`ServiceMetrics`] singleton backed by the `prometheus`
//! crate, plus an optional lightweight HTTP server for Prometheus scraping.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::OnceLock;

// ────────────────────────── Tracing ──────────────────────────

/// Initialize the tracing subscriber with env-filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

// ────────────────────────── Prometheus metrics ──────────────────────────

/// Global metrics instance.
static METRICS: OnceLock<ServiceMetrics> = OnceLock::new();

/// Retrieve (or lazily create) the global metrics singleton.
pub fn metrics() -> &'static ServiceMetrics {
    METRICS.get_or_init(ServiceMetrics::new)
}

/// All Prometheus metrics for a corvid server.
pub struct ServiceMetrics {
    pub registry: Registry,

    // ── Store operation counters ──
    pub store_puts: IntCounter,
    pub store_gets: IntCounter,
    pub store_removes: IntCounter,

    // ── Store operation latency ──
    pub store_latency_secs: HistogramVec,

    // ── Dispatch counters ──
    pub hooks: IntCounter,
    pub unhooks: IntCounter,
    pub events: IntCounter,
    pub events_by_type: IntCounterVec,

    // ── Event dispatch latency ──
    pub event_latency_secs: HistogramVec,
}

// Manual Debug impl because prometheus types don't derive Debug.
impl std::fmt::Debug for ServiceMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceMetrics").finish_non_exhaustive()
    }
}

/// Default histogram buckets (seconds) for store/event latency.
const LATENCY_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

impl ServiceMetrics {
    fn new() -> Self {
        let registry = Registry::new();

        let store_puts = IntCounter::with_opts(Opts::new(
            "corvid_store_puts_total",
            "Store PUT operations",
        ))
        .expect("store_puts counter");
        let store_gets = IntCounter::with_opts(Opts::new(
            "corvid_store_gets_total",
            "Store GET operations",
        ))
        .expect("store_gets counter");
        let store_removes = IntCounter::with_opts(Opts::new(
            "corvid_store_removes_total",
            "Store REMOVE operations",
        ))
        .expect("store_removes counter");

        let store_latency_secs = HistogramVec::new(
            HistogramOpts::new(
                "corvid_store_latency_seconds",
                "Store operation latency in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["op_type"],
        )
        .expect("store_latency_secs histogram");

        let hooks = IntCounter::with_opts(Opts::new(
            "corvid_hooks_total",
            "Handler bindings installed",
        ))
        .expect("hooks counter");
        let unhooks = IntCounter::with_opts(Opts::new(
            "corvid_unhooks_total",
            "Handler bindings removed",
        ))
        .expect("unhooks counter");
        let events = IntCounter::with_opts(Opts::new(
            "corvid_events_total",
            "Events dispatched",
        ))
        .expect("events counter");

        let events_by_type = IntCounterVec::new(
            Opts::new("corvid_events_by_type_total", "Events dispatched, by type"),
            &["event_type"],
        )
        .expect("events_by_type counter vec");

        let event_latency_secs = HistogramVec::new(
            HistogramOpts::new(
                "corvid_event_latency_seconds",
                "Event dispatch latency in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["event_type"],
        )
        .expect("event_latency_secs histogram");

        // Register all metrics
        registry
            .register(Box::new(store_puts.clone()))
            .expect("register store_puts");
        registry
            .register(Box::new(store_gets.clone()))
            .expect("register store_gets");
        registry
            .register(Box::new(store_removes.clone()))
            .expect("register store_removes");
        registry
            .register(Box::new(store_latency_secs.clone()))
            .expect("register store_latency_secs");
        registry
            .register(Box::new(hooks.clone()))
            .expect("register hooks");
        registry
            .register(Box::new(unhooks.clone()))
            .expect("register unhooks");
        registry
            .register(Box::new(events.clone()))
            .expect("register events");
        registry
            .register(Box::new(events_by_type.clone()))
            .expect("register events_by_type");
        registry
            .register(Box::new(event_latency_secs.clone()))
            .expect("register event_latency_secs");

        Self {
            registry,
            store_puts,
            store_gets,
            store_removes,
            store_latency_secs,
            hooks,
            unhooks,
            events,
            events_by_type,
            event_latency_secs,
        }
    }
}

/// Encode all registered metrics in Prometheus text exposition format.
pub fn encode_metrics() -> String {
    let m = metrics();
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&m.registry.gather(), &mut buf)
        .expect("prometheus text encoding");
    String::from_utf8(buf).expect("prometheus output is valid UTF-8")
}

/// Helper: start a store operation latency timer. Returns a guard that
/// records elapsed time on drop.
pub fn start_store_timer(op_type: &str) -> prometheus::HistogramTimer {
    metrics()
        .store_latency_secs
        .with_label_values(&[op_type])
        .start_timer()
}

/// Helper: start an event dispatch latency timer.
pub fn start_event_timer(event_type: &str) -> prometheus::HistogramTimer {
    metrics()
        .event_latency_secs
        .with_label_values(&[event_type])
        .start_timer()
}

// ────────────────────────── Metrics HTTP server ──────────────────────────

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

async fn metrics_handler(
    _req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let body = encode_metrics();
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .expect("valid HTTP response"))
}

/// Serve Prometheus metrics on the given address (`GET /metrics`).
///
/// This spawns a lightweight HTTP/1.1 server. Call from a `tokio::spawn`.
pub async fn serve_metrics(
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("metrics server listening on http://{}/metrics", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(metrics_handler))
                .await
            {
                tracing::debug!("metrics connection error: {}", e);
            }
        });
    }
}

// ────────────────────────── Tests ──────────────────────────
