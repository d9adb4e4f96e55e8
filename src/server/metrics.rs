use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;
use tracing::info;

/// Metric name prefix for all Waveforge metrics
const PREFIX: &str = "waveforge";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Library Metrics
    pub static ref LIBRARY_SOUNDS_TOTAL: Gauge = Gauge::new(
        format!("{PREFIX}_library_sounds_total"),
        "Total sounds in the library"
    ).expect("Failed to create library_sounds_total metric");

    pub static ref LINEAGES_TOTAL: Gauge = Gauge::new(
        format!("{PREFIX}_lineages_total"),
        "Total lineages in the graph store"
    ).expect("Failed to create lineages_total metric");

    pub static ref LINEAGE_NODES_TOTAL: Gauge = Gauge::new(
        format!("{PREFIX}_lineage_nodes_total"),
        "Total nodes in the lineage graph store"
    ).expect("Failed to create lineage_nodes_total metric");

    // Derivation Metrics
    pub static ref VARIATIONS_PRODUCED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_variations_produced_total"),
        "Variations successfully produced"
    ).expect("Failed to create variations_produced_total metric");

    pub static ref VARIATIONS_FAILED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_variations_failed_total"),
        "Variations that failed within a batch"
    ).expect("Failed to create variations_failed_total metric");

    // Synthesis Metrics
    pub static ref SYNTHESIS_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_synthesis_requests_total"), "Synthesis requests by engine and outcome"),
        &["engine", "status"]
    ).expect("Failed to create synthesis_requests_total metric");

    // Tempo Metrics
    pub static ref TEMPO_CORRECTIONS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_tempo_corrections_total"),
        "Tempo corrections performed"
    ).expect("Failed to create tempo_corrections_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(LIBRARY_SOUNDS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LINEAGES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LINEAGE_NODES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(VARIATIONS_PRODUCED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(VARIATIONS_FAILED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SYNTHESIS_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TEMPO_CORRECTIONS_TOTAL.clone()));

    info!("Metrics system initialized successfully");
}

/// Seed the store gauges from the opened databases.
pub fn init_store_metrics(sounds: usize, lineages: usize, nodes: usize) {
    LIBRARY_SOUNDS_TOTAL.set(sounds as f64);
    LINEAGES_TOTAL.set(lineages as f64);
    LINEAGE_NODES_TOTAL.set(nodes as f64);
}

/// Record an HTTP request for Prometheus.
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Handler for the /metrics endpoint (Prometheus text format).
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response();
    }
    (
        StatusCode::OK,
        [("content-type", prometheus::TEXT_FORMAT)],
        buffer,
    )
        .into_response()
}

/// Run the dedicated metrics server (Prometheus scrape target).
pub async fn run_metrics_server(port: u16) -> anyhow::Result<()> {
    let router = axum::Router::new().route("/metrics", axum::routing::get(metrics_handler));
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Metrics server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
