use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

/// Prometheus metrics for the cart service
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // HTTP metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_flight: GaugeVec,

    // Database metrics
    pub database_operations_total: CounterVec,
    pub database_operation_duration_seconds: HistogramVec,

    // Cart metrics
    pub cart_operations_total: CounterVec,
}

/// Latency buckets shared by the request and database histograms, in seconds
const LATENCY_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

fn register<M>(registry: &Registry, metric: M) -> Result<M, MetricsError>
where
    M: prometheus::core::Collector + Clone + 'static,
{
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

fn counter(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<CounterVec, MetricsError> {
    register(registry, CounterVec::new(Opts::new(name, help), labels)?)
}

fn histogram(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<HistogramVec, MetricsError> {
    let opts = HistogramOpts::new(name, help).buckets(LATENCY_BUCKETS.to_vec());
    register(registry, HistogramVec::new(opts, labels)?)
}

impl Metrics {
    /// Build a fresh registry with every cart service metric registered
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let metrics = Metrics {
            http_requests_total: counter(
                &registry,
                "http_requests_total",
                "HTTP requests handled, by route and status",
                &["method", "endpoint", "status_code"],
            )?,
            http_request_duration_seconds: histogram(
                &registry,
                "http_request_duration_seconds",
                "HTTP request latency",
                &["method", "endpoint"],
            )?,
            http_requests_in_flight: register(
                &registry,
                GaugeVec::new(
                    Opts::new("http_requests_in_flight", "HTTP requests currently in progress"),
                    &["method", "endpoint"],
                )?,
            )?,
            database_operations_total: counter(
                &registry,
                "database_operations_total",
                "Cart store calls, by operation and result",
                &["operation", "table", "status"],
            )?,
            database_operation_duration_seconds: histogram(
                &registry,
                "database_operation_duration_seconds",
                "Cart store call latency",
                &["operation", "table"],
            )?,
            cart_operations_total: counter(
                &registry,
                "cart_operations_total",
                "Cart operations, by outcome",
                &["operation", "outcome"],
            )?,
            registry,
        };

        info!("Registered cart service metrics");
        Ok(metrics)
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    /// Record HTTP request metrics
    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status_str = status_code.to_string();

        self.http_requests_total
            .with_label_values(&[method, endpoint, &status_str])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_seconds);
    }

    /// Record database operation metrics
    pub fn record_database_operation(
        &self,
        operation: &str,
        table: &str,
        success: bool,
        duration_seconds: f64,
    ) {
        let status = if success { "success" } else { "error" };

        self.database_operations_total
            .with_label_values(&[operation, table, status])
            .inc();

        self.database_operation_duration_seconds
            .with_label_values(&[operation, table])
            .observe(duration_seconds);
    }

    /// Record the outcome of a cart operation (`success`, `not_found`, `at_floor`, `invalid`, `error`)
    pub fn record_cart_operation(&self, operation: &str, outcome: &str) {
        self.cart_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn increment_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .inc();
    }

    pub fn decrement_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .dec();
    }
}
