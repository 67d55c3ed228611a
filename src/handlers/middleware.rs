use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::models::CartActionResponse;

/// Reject bodies that are not JSON or that declare a length above `max_request_size`.
///
/// Failures use the same `{success, message}` envelope as the cart endpoints.
pub async fn request_validation_middleware(
    max_request_size: usize,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Err(rejection) = validate_content_type(&request) {
        return rejection.into_response();
    }

    if let Err(rejection) = validate_request_size(&request, max_request_size) {
        return rejection.into_response();
    }

    next.run(request).await
}

type Rejection = (StatusCode, Json<CartActionResponse>);

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    (status, Json(CartActionResponse::failure(message)))
}

fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn validate_content_type(request: &Request<Body>) -> Result<(), Rejection> {
    if !carries_body(request.method()) {
        return Ok(());
    }

    match request.headers().get(header::CONTENT_TYPE) {
        Some(content_type) => {
            let content_type = content_type.to_str().unwrap_or("");
            if content_type.starts_with("application/json") {
                Ok(())
            } else {
                warn!("Invalid content type: {}", content_type);
                Err(reject(
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "Content-Type must be application/json",
                ))
            }
        }
        None => {
            warn!("Missing content type header on {}", request.uri().path());
            Err(reject(
                StatusCode::BAD_REQUEST,
                "Content-Type header is required for requests with body",
            ))
        }
    }
}

fn validate_request_size(request: &Request<Body>, max_request_size: usize) -> Result<(), Rejection> {
    let declared_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());

    match declared_length {
        Some(length) if length > max_request_size => {
            warn!("Request too large: {} bytes", length);
            Err(reject(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!(
                    "Request size {} bytes exceeds maximum of {} bytes",
                    length, max_request_size
                ),
            ))
        }
        _ => Ok(()),
    }
}

/// Allow the storefront UI to call the cart API from another origin
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(24 * 60 * 60))
}

pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'"),
    );

    response
}
