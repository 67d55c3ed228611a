pub mod admin;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod middleware;

pub use admin::{create_admin_router, setup_tables, AdminState, SetupTablesResponse};
pub use cart::{create_cart_router, CartHandlerState};
pub use health::health_check;
pub use metrics::metrics_handler;
pub use middleware::{
    cors_layer, request_validation_middleware, security_headers_middleware,
};
