use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::models::{RepositoryError, RepositoryResult};

/// Manages DynamoDB table creation and configuration
pub struct TableManager {
    client: Arc<DynamoDbClient>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl TableManager {
    /// Create a new table manager
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(10),
            max_poll_attempts: 30,
        }
    }

    /// Override how often and how long to wait for a new table to become active
    pub fn with_polling(mut self, poll_interval: Duration, max_poll_attempts: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_poll_attempts = max_poll_attempts;
        self
    }

    /// Create the carts table keyed by `email` (hash) and `product_id` (range)
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_carts_table(&self, table_name: &str) -> RepositoryResult<bool> {
        info!("Creating carts table");

        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(false);
        }

        let attribute_definitions = vec![
            Self::attribute_definition("email")?,
            Self::attribute_definition("product_id")?,
        ];

        let key_schema = vec![
            Self::key_schema_element("email", KeyType::Hash)?,
            Self::key_schema_element("product_id", KeyType::Range)?,
        ];

        self.client
            .create_table()
            .table_name(table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| self.map_dynamodb_error(e.into()))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await?;
        info!("Carts table created successfully");

        Ok(true)
    }

    fn attribute_definition(name: &str) -> RepositoryResult<AttributeDefinition> {
        AttributeDefinition::builder()
            .attribute_name(name)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build attribute definition: {}", e),
            })
    }

    fn key_schema_element(name: &str, key_type: KeyType) -> RepositoryResult<KeySchemaElement> {
        KeySchemaElement::builder()
            .attribute_name(name)
            .key_type(key_type)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build key schema: {}", e),
            })
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(DynamoDbError::from)
        {
            Ok(_) => Ok(true),
            Err(DynamoDbError::ResourceNotFoundException(_)) => {
                info!("Table {} does not exist", table_name);
                Ok(false)
            }
            Err(e) => {
                error!("Error checking table existence: {}", e);
                Err(RepositoryError::ConnectionFailed)
            }
        }
    }

    /// Wait for a table to become active
    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        let mut attempts = 0;

        loop {
            match self.client.describe_table().table_name(table_name).send().await {
                Ok(response) => match response.table.and_then(|table| table.table_status) {
                    Some(TableStatus::Active) => {
                        info!("Table {} is now active", table_name);
                        return Ok(());
                    }
                    Some(status) => {
                        info!("Table {} status: {:?}, waiting...", table_name, status);
                    }
                    None => {
                        warn!("Table {} status unknown, waiting...", table_name);
                    }
                },
                Err(e) => {
                    error!("Error checking table status: {}", e);
                    return Err(self.map_dynamodb_error(e.into()));
                }
            }

            attempts += 1;
            if attempts >= self.max_poll_attempts {
                error!("Timeout waiting for table {} to become active", table_name);
                return Err(RepositoryError::Timeout);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Convert DynamoDB error to RepositoryError
    fn map_dynamodb_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);
        RepositoryError::AwsSdk {
            message: error.to_string(),
        }
    }
}
