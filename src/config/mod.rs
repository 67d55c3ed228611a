use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_ssm::Client as SsmClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Prefix for every environment variable the service reads, e.g. `STOREFRONT_PORT`
pub const ENV_PREFIX: &str = "STOREFRONT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Parameter not found: {name}")]
    ParameterNotFound { name: String },

    #[error("AWS SDK error: {source}")]
    AwsSdk {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

/// Where cart line items are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    DynamoDb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_carts_table")]
    pub carts_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Override for DynamoDB Local or LocalStack
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub storage_backend: StorageBackend,
    #[serde(default)]
    pub auto_create_table: bool,
    /// SSM parameter holding the carts table name; falls back to `carts_table_name`
    #[serde(default)]
    pub carts_table_parameter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

/// AWS clients shared by the DynamoDB backend
#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub dynamodb_client: DynamoDbClient,
    pub ssm_client: SsmClient,
    pub parameter_store: Arc<ParameterStoreConfig>,
}

pub struct ParameterStoreConfig {
    ssm_client: SsmClient,
    cache: Arc<RwLock<HashMap<String, (String, Instant)>>>,
    cache_ttl: Duration,
}

impl std::fmt::Debug for ParameterStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStoreConfig")
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_size", &"<runtime>")
            .finish()
    }
}

impl Config {
    /// Load configuration from `STOREFRONT_*` environment variables
    pub fn from_environment() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Load configuration from an explicit variable map instead of the process environment
    pub fn from_source(source: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let config = Config {
            server: load_section(source.clone(), "server")?,
            database: load_section(source.clone(), "database")?,
            observability: load_section(source, "observability")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        if self.server.max_request_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "Max request size cannot be 0".to_string(),
            });
        }

        if self.database.carts_table_name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Carts table name cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn load_section<T: DeserializeOwned>(
    source: Option<HashMap<String, String>>,
    section: &str,
) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX).source(source))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    /// Table name from Parameter Store when `carts_table_parameter` is set, else the configured name
    pub async fn resolve_carts_table_name(&self, parameter_store: &ParameterStoreConfig) -> String {
        match &self.carts_table_parameter {
            Some(parameter) => {
                parameter_store
                    .get_parameter_with_default(parameter, &self.carts_table_name)
                    .await
            }
            None => self.carts_table_name.clone(),
        }
    }
}

impl AwsConfig {
    /// Build the SDK clients for the configured region and optional endpoint override
    pub async fn load(database: &DatabaseConfig) -> Self {
        info!("Initializing AWS clients for region {}", database.region);

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(database.region.clone()))
            .load()
            .await;

        let dynamodb_client = match &database.endpoint_url {
            Some(endpoint_url) => {
                info!("Using DynamoDB endpoint override: {}", endpoint_url);
                let dynamodb_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                    .endpoint_url(endpoint_url)
                    .build();
                DynamoDbClient::from_conf(dynamodb_config)
            }
            None => DynamoDbClient::new(&sdk_config),
        };

        let ssm_client = SsmClient::new(&sdk_config);
        let parameter_store = Arc::new(ParameterStoreConfig::new(
            ssm_client.clone(),
            Duration::from_secs(5 * 60),
        ));

        Self {
            region: database.region.clone(),
            dynamodb_client,
            ssm_client,
            parameter_store,
        }
    }
}

impl ParameterStoreConfig {
    pub fn new(ssm_client: SsmClient, cache_ttl: Duration) -> Self {
        Self {
            ssm_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl,
        }
    }

    pub async fn get_parameter(&self, name: &str) -> Result<String, ConfigError> {
        debug!("Getting parameter: {}", name);

        {
            let cache = self.cache.read().await;
            if let Some((value, fetched_at)) = cache.get(name) {
                if fetched_at.elapsed() < self.cache_ttl {
                    debug!("Parameter found in cache: {}", name);
                    return Ok(value.clone());
                }
                debug!("Parameter cache expired: {}", name);
            }
        }

        let result = self
            .ssm_client
            .get_parameter()
            .name(name)
            .with_decryption(false)
            .send()
            .await
            .map_err(|e| ConfigError::AwsSdk {
                source: Box::new(e),
            })?;

        let value = result
            .parameter()
            .and_then(|p| p.value())
            .ok_or_else(|| ConfigError::ParameterNotFound {
                name: name.to_string(),
            })?
            .to_string();

        self.cache
            .write()
            .await
            .insert(name.to_string(), (value.clone(), Instant::now()));

        debug!("Parameter retrieved and cached: {}", name);
        Ok(value)
    }

    pub async fn get_parameter_with_default(&self, name: &str, default: &str) -> String {
        match self.get_parameter(name).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to get parameter {}, using default: {}", name, e);
                default.to_string()
            }
        }
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
        info!("Parameter store cache cleared");
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.read().await.len()
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    64 * 1024
}

pub(crate) fn default_carts_table() -> String {
    "StorefrontCarts".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_service_name() -> String {
    "storefront-cart".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_metrics_port() -> u16 {
    9090
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests;
