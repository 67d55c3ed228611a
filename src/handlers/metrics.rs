use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus::TEXT_FORMAT;
use std::sync::Arc;
use tracing::{error, instrument};

use crate::observability::Metrics;

/// Prometheus scrape endpoint
#[instrument(name = "scrape_metrics", skip_all)]
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    let exposition = match metrics.encode() {
        Ok(exposition) => exposition,
        Err(err) => {
            error!(error = %err, "Metrics exposition failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response = exposition.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(TEXT_FORMAT),
    );
    response
}
