use axum::{
    extract::{MatchedPath, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::{Status, TraceContextExt};
use std::{sync::Arc, time::Instant};
use tracing::{error, info, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Metrics;

/// Request tracing and HTTP metrics for every route.
///
/// Opens a server span named after the matched route (`POST /api/cart/add`),
/// tracks in-flight requests, and records the status code and latency once
/// the inner service responds.
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let user_agent = header_value(request.headers(), "user-agent")
        .unwrap_or("unknown")
        .to_string();
    let client_ip = client_address(request.headers());

    // Group by route template so per-user paths do not explode label cardinality
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let span_name = format!("{} {}", method, endpoint);
    let span = tracing::info_span!(
        target: "storefront_cart::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.url = %uri,
        http.user_agent = %user_agent,
        client.address = %client_ip,
        http.response.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        metrics.increment_in_flight(&method, &endpoint);

        let trace_id = tracing::Span::current()
            .context()
            .span()
            .span_context()
            .trace_id()
            .to_string();

        info!(trace_id = %trace_id, method = %method, path = %endpoint, client_ip = %client_ip, "Processing request");

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let duration_ms = duration.as_millis();
        let status_code = response.status().as_u16();

        let current_span = tracing::Span::current();
        current_span.record("http.response.status_code", status_code);
        current_span.record("http.response_time_ms", duration_ms);

        let otel_context = current_span.context();
        if status_code >= 500 {
            otel_context.span().set_status(Status::error("HTTP server error"));
        } else {
            otel_context.span().set_status(Status::Ok);
        }

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());
        metrics.decrement_in_flight(&method, &endpoint);

        if status_code >= 500 {
            error!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request failed"
            );
        } else {
            info!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request completed"
            );
        }

        response
    }
    .instrument(span)
    .await
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`, else `unknown`
fn client_address(headers: &HeaderMap) -> String {
    header_value(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .or_else(|| header_value(headers, "x-real-ip"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderValue, Method, Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    async fn error_handler() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn app(metrics: Arc<Metrics>) -> Router {
        Router::new()
            .route("/api/cart/:email", get(ok_handler))
            .route("/error", get(error_handler))
            .layer(middleware::from_fn(move |req, next| {
                observability_middleware(metrics.clone(), req, next)
            }))
    }

    #[tokio::test]
    async fn test_records_matched_route_not_raw_path() {
        let metrics = Arc::new(Metrics::new().unwrap());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/cart/a@x.com")
            .header("user-agent", "test-client/1.0")
            .body(Body::empty())
            .unwrap();

        let response = app(metrics.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let count = metrics
            .http_requests_total
            .with_label_values(&["GET", "/api/cart/:email", "200"])
            .get();
        assert_eq!(count, 1.0);

        let in_flight = metrics
            .http_requests_in_flight
            .with_label_values(&["GET", "/api/cart/:email"])
            .get();
        assert_eq!(in_flight, 0.0);
    }

    #[tokio::test]
    async fn test_records_server_errors() {
        let metrics = Arc::new(Metrics::new().unwrap());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/error")
            .body(Body::empty())
            .unwrap();

        let response = app(metrics.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("status_code=\"500\""));
    }

    #[test]
    fn test_client_address_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_address(&headers), "203.0.113.7");

        headers.remove("x-forwarded-for");
        assert_eq!(client_address(&headers), "10.0.0.2");

        assert_eq!(client_address(&HeaderMap::new()), "unknown");
    }
}
