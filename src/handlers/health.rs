use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::instrument;

pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

/// Liveness probe; does not touch the cart store
#[instrument(name = "health_check")]
pub async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_reports_service() {
        let Json(body) = health_check().await.unwrap();

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "storefront-cart");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["timestamp"].is_string());
    }
}
