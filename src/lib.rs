pub mod app;
pub mod config;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;

pub use app::{create_app, AppComponents};
pub use config::{AwsConfig, Config, ConfigError, ParameterStoreConfig, StorageBackend};
pub use observability::{init_observability, shutdown_observability, Metrics};
