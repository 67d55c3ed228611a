use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use storefront_cart::{
    create_app, init_observability,
    observability::Metrics,
    repositories::{CartRepository, DynamoDbCartRepository, InMemoryCartRepository, TableManager},
    services::CartService,
    shutdown_observability, AppComponents, AwsConfig, Config, StorageBackend,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment().context("Failed to load configuration")?;

    init_observability(&config.observability).context("Failed to initialize observability")?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new()?);

    let (cart_repository, table_manager, carts_table_name): (
        Arc<dyn CartRepository>,
        Option<Arc<TableManager>>,
        String,
    ) = match config.database.storage_backend {
        StorageBackend::Memory => {
            warn!("Using in-memory cart storage; carts are lost on restart");
            (
                Arc::new(InMemoryCartRepository::new()),
                None,
                config.database.carts_table_name.clone(),
            )
        }
        StorageBackend::DynamoDb => {
            let aws = AwsConfig::load(&config.database).await;
            let carts_table_name = config
                .database
                .resolve_carts_table_name(&aws.parameter_store)
                .await;
            info!(
                "Using DynamoDB table {} in region {}",
                carts_table_name, aws.region
            );

            let dynamodb_client = Arc::new(aws.dynamodb_client.clone());
            let table_manager = Arc::new(TableManager::new(dynamodb_client.clone()));

            if config.database.auto_create_table {
                table_manager
                    .create_carts_table(&carts_table_name)
                    .await
                    .context("Failed to create carts table")?;
            }

            let repository = DynamoDbCartRepository::new(
                dynamodb_client,
                carts_table_name.clone(),
                aws.region.clone(),
            )
            .with_metrics(metrics.clone());

            (Arc::new(repository), Some(table_manager), carts_table_name)
        }
    };

    let cart_service = Arc::new(CartService::new(cart_repository));

    let app = create_app(
        &config.server,
        AppComponents {
            metrics,
            cart_service,
            table_manager,
            carts_table_name,
        },
    );

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_address()))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_observability().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
