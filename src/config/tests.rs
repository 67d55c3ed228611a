#[cfg(test)]
mod config_tests {
    use crate::config::{
        default_carts_table, default_host, default_log_level, default_max_request_size,
        default_metrics_port, default_port, default_region, default_service_name,
        default_timeout, Config, ConfigError, DatabaseConfig, ParameterStoreConfig,
        ServerConfig, StorageBackend,
    };
    use aws_sdk_ssm::config::{BehaviorVersion, Credentials, Region};
    use aws_sdk_ssm::Client as SsmClient;
    use std::collections::HashMap;
    use std::time::Duration;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn unreachable_ssm_client() -> SsmClient {
        let config = aws_sdk_ssm::Config::builder()
            .region(Region::new("us-west-2"))
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .endpoint_url("http://127.0.0.1:1")
            .build();
        SsmClient::from_conf(config)
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = Config::from_source(vars(&[])).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_seconds, 30);
        assert_eq!(config.database.carts_table_name, "StorefrontCarts");
        assert_eq!(config.database.storage_backend, StorageBackend::DynamoDb);
        assert!(!config.database.auto_create_table);
        assert!(config.database.endpoint_url.is_none());
        assert_eq!(config.observability.service_name, "storefront-cart");
        assert!(config.observability.otlp_endpoint.is_none());
        assert!(!config.observability.enable_json_logging);
    }

    #[test]
    fn test_database_config_from_variables() {
        let config = Config::from_source(vars(&[
            ("STOREFRONT_CARTS_TABLE_NAME", "TestCarts"),
            ("STOREFRONT_REGION", "eu-west-1"),
            ("STOREFRONT_ENDPOINT_URL", "http://localhost:8000"),
            ("STOREFRONT_STORAGE_BACKEND", "memory"),
            ("STOREFRONT_AUTO_CREATE_TABLE", "true"),
            ("STOREFRONT_CARTS_TABLE_PARAMETER", "/storefront/carts-table"),
        ]))
        .unwrap();

        assert_eq!(config.database.carts_table_name, "TestCarts");
        assert_eq!(config.database.region, "eu-west-1");
        assert_eq!(
            config.database.endpoint_url.as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(config.database.storage_backend, StorageBackend::Memory);
        assert!(config.database.auto_create_table);
        assert_eq!(
            config.database.carts_table_parameter.as_deref(),
            Some("/storefront/carts-table")
        );
    }

    #[test]
    fn test_observability_config_from_variables() {
        let config = Config::from_source(vars(&[
            ("STOREFRONT_SERVICE_NAME", "test-service"),
            ("STOREFRONT_SERVICE_VERSION", "1.0.0"),
            ("STOREFRONT_OTLP_ENDPOINT", "http://collector:4317"),
            ("STOREFRONT_METRICS_PORT", "9091"),
            ("STOREFRONT_LOG_LEVEL", "debug"),
            ("STOREFRONT_ENABLE_JSON_LOGGING", "true"),
        ]))
        .unwrap();

        let observability = config.observability;
        assert_eq!(observability.service_name, "test-service");
        assert_eq!(observability.service_version, "1.0.0");
        assert_eq!(
            observability.otlp_endpoint.as_deref(),
            Some("http://collector:4317")
        );
        assert_eq!(observability.metrics_port, 9091);
        assert_eq!(observability.log_level, "debug");
        assert!(observability.enable_json_logging);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for (key, value) in [
            ("STOREFRONT_PORT", "0"),
            ("STOREFRONT_REQUEST_TIMEOUT_SECONDS", "0"),
            ("STOREFRONT_CARTS_TABLE_NAME", "  "),
        ] {
            let result = Config::from_source(vars(&[(key, value)]));
            assert!(
                matches!(result, Err(ConfigError::ValidationError { .. })),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_unparseable_value_is_load_error() {
        let result = Config::from_source(vars(&[("STOREFRONT_PORT", "not-a-port")]));
        assert!(matches!(result, Err(ConfigError::LoadError { .. })));
    }

    #[test]
    fn test_server_config_helpers() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_seconds: 45,
            max_request_size: 1024,
        };

        assert_eq!(config.request_timeout(), Duration::from_secs(45));
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[tokio::test]
    async fn test_parameter_store_falls_back_to_default() {
        let parameter_store =
            ParameterStoreConfig::new(unreachable_ssm_client(), Duration::from_secs(60));

        assert_eq!(parameter_store.cache_size().await, 0);

        let value = parameter_store
            .get_parameter_with_default("/nonexistent/parameter", "default_value")
            .await;
        assert_eq!(value, "default_value");

        parameter_store.clear_cache().await;
        assert_eq!(parameter_store.cache_size().await, 0);
    }

    #[tokio::test]
    async fn test_resolve_carts_table_name() {
        let parameter_store =
            ParameterStoreConfig::new(unreachable_ssm_client(), Duration::from_secs(60));

        let mut database = DatabaseConfig {
            carts_table_name: "LocalCarts".to_string(),
            region: "us-west-2".to_string(),
            endpoint_url: None,
            storage_backend: StorageBackend::DynamoDb,
            auto_create_table: false,
            carts_table_parameter: None,
        };
        assert_eq!(
            database.resolve_carts_table_name(&parameter_store).await,
            "LocalCarts"
        );

        database.carts_table_parameter = Some("/storefront/missing".to_string());
        assert_eq!(
            database.resolve_carts_table_name(&parameter_store).await,
            "LocalCarts"
        );
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::ParameterNotFound {
            name: "test_param".to_string(),
        };
        assert_eq!(error.to_string(), "Parameter not found: test_param");

        let error = ConfigError::ValidationError {
            message: "Invalid configuration".to_string(),
        };
        assert_eq!(error.to_string(), "Validation error: Invalid configuration");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_host(), "0.0.0.0");
        assert_eq!(default_port(), 8080);
        assert_eq!(default_timeout(), 30);
        assert_eq!(default_max_request_size(), 64 * 1024);
        assert_eq!(default_carts_table(), "StorefrontCarts");
        assert_eq!(default_region(), "us-west-2");
        assert_eq!(default_service_name(), "storefront-cart");
        assert_eq!(default_metrics_port(), 9090);
        assert_eq!(default_log_level(), "info");
    }
}
