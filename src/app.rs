use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::handlers::{
    admin::create_admin_router, cart::create_cart_router, cors_layer, health_check,
    metrics_handler, request_validation_middleware, security_headers_middleware,
};
use crate::observability::{observability_middleware, Metrics};
use crate::repositories::TableManager;
use crate::services::CartService;

/// Everything the HTTP layer needs, assembled once at startup
#[derive(Clone)]
pub struct AppComponents {
    pub metrics: Arc<Metrics>,
    pub cart_service: Arc<CartService>,
    /// Table provisioning; absent for the in-memory backend
    pub table_manager: Option<Arc<TableManager>>,
    pub carts_table_name: String,
}

/// Build the service router with the full middleware stack
pub fn create_app(server: &ServerConfig, components: AppComponents) -> Router {
    let AppComponents {
        metrics,
        cart_service,
        table_manager,
        carts_table_name,
    } = components;

    let metrics_for_middleware = metrics.clone();
    let max_request_size = server.max_request_size;

    let mut app = Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics.clone())
        .nest("/api/cart", create_cart_router(cart_service, metrics));

    if let Some(table_manager) = table_manager {
        app = app.merge(create_admin_router(table_manager, carts_table_name));
    }

    // Outermost layer is listed last
    app.layer(DefaultBodyLimit::max(max_request_size))
        .layer(middleware::from_fn(move |req, next| {
            request_validation_middleware(max_request_size, req, next)
        }))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors_layer())
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryCartRepository;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn server_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_seconds: 5,
            max_request_size: 1024,
        }
    }

    fn app() -> (Router, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        let components = AppComponents {
            metrics: metrics.clone(),
            cart_service: Arc::new(CartService::new(Arc::new(InMemoryCartRepository::new()))),
            table_manager: None,
            carts_table_name: "StorefrontCarts".to_string(),
        };
        (create_app(&server_config(), components), metrics)
    }

    #[tokio::test]
    async fn test_health_and_metrics_routes() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_routes_are_nested_and_observed() {
        let (app, metrics) = app();

        let body = serde_json::json!({
            "email": "a@x.com",
            "productId": "P1",
            "name": "Desk Lamp",
            "price": 19.99,
            "quantity": 1
        });
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/cart/add")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            metrics
                .http_requests_total
                .with_label_values(&["POST", "/api/cart/add", "201"])
                .get(),
            1.0
        );
    }

    #[tokio::test]
    async fn test_admin_routes_absent_for_memory_backend() {
        let (app, _) = app();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/setup-tables")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let (app, _) = app();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/cart/add")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!("{{\"name\":\"{}\"}}", "x".repeat(4096))))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(
            response.status() == StatusCode::PAYLOAD_TOO_LARGE
                || response.status() == StatusCode::BAD_REQUEST,
            "unexpected status {}",
            response.status()
        );
    }

    #[tokio::test]
    async fn test_cors_preflight_on_cart_routes() {
        let (app, _) = app();

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/cart/remove/a@x.com/P1")
            .header(header::ORIGIN, "https://shop.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .contains("DELETE"));
    }
}
