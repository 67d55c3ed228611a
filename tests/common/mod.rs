#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use storefront_cart::{
    config::ServerConfig,
    create_app,
    repositories::InMemoryCartRepository,
    services::CartService,
    AppComponents, Metrics,
};

/// A live server on an ephemeral port backed by the in-memory cart store
pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub repository: InMemoryCartRepository,
    pub metrics: Arc<Metrics>,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let repository = InMemoryCartRepository::new();
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));

        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_seconds: 10,
            max_request_size: 64 * 1024,
        };
        let app = create_app(
            &server,
            AppComponents {
                metrics: metrics.clone(),
                cart_service: Arc::new(CartService::new(Arc::new(repository.clone()))),
                table_manager: None,
                carts_table_name: "StorefrontCarts".to_string(),
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            client: Client::new(),
            base_url,
            repository,
            metrics,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/cart{}", self.base_url, path)
    }

    pub async fn add(&self, email: &str, product_id: &str, quantity: i64) -> Response {
        self.client
            .post(self.url("/add"))
            .json(&add_body(email, product_id, quantity))
            .send()
            .await
            .expect("Failed to send add request")
    }

    pub async fn increase(&self, email: &str, product_id: &str) -> Response {
        self.client
            .post(self.url("/increase"))
            .json(&json!({ "email": email, "productId": product_id }))
            .send()
            .await
            .expect("Failed to send increase request")
    }

    pub async fn decrease(&self, email: &str, product_id: &str) -> Response {
        self.client
            .post(self.url("/decrease"))
            .json(&json!({ "email": email, "productId": product_id }))
            .send()
            .await
            .expect("Failed to send decrease request")
    }

    pub async fn remove(&self, email: &str, product_id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/remove/{}/{}", email, product_id)))
            .send()
            .await
            .expect("Failed to send remove request")
    }

    pub async fn list(&self, email: &str) -> Vec<Value> {
        let response = self
            .client
            .get(self.url(&format!("/{}", email)))
            .send()
            .await
            .expect("Failed to send list request");
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Failed to parse cart items")
    }

    pub async fn quantity_of(&self, email: &str, product_id: &str) -> Option<u64> {
        self.list(email)
            .await
            .iter()
            .find(|item| item["productId"] == product_id)
            .and_then(|item| item["quantity"].as_u64())
    }
}

pub fn add_body(email: &str, product_id: &str, quantity: i64) -> Value {
    json!({
        "email": email,
        "username": "alice",
        "productId": product_id,
        "name": format!("Product {}", product_id),
        "price": 12.5,
        "imageUrl": format!("https://cdn.example.com/{}.jpg", product_id),
        "quantity": quantity,
    })
}
