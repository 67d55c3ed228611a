use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue, ReturnValuesOnConditionCheckFailure};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, Instrument};

use crate::models::{CartItem, NewCartItem, QuantityChange, RepositoryError, RepositoryResult};
use crate::observability::Metrics;

/// Smallest quantity a persisted line item may hold
pub const FLOOR_QUANTITY: u32 = 1;

/// Trait defining the interface for cart line item storage.
///
/// Every mutating method is a single atomic operation against the store, so
/// concurrent callers on the same `(email, product_id)` never lose updates.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Create the line item, or add `quantity` to the existing one
    async fn upsert_item(&self, item: NewCartItem) -> RepositoryResult<CartItem>;

    /// All line items owned by `email`, ordered by product ID
    async fn find_items_by_email(&self, email: &str) -> RepositoryResult<Vec<CartItem>>;

    /// Add one to the quantity of an existing line item. `None` if absent.
    async fn increment_quantity(
        &self,
        email: &str,
        product_id: &str,
    ) -> RepositoryResult<Option<CartItem>>;

    /// Subtract one from the quantity unless it is already at the floor
    async fn decrement_quantity(
        &self,
        email: &str,
        product_id: &str,
    ) -> RepositoryResult<QuantityChange>;

    /// Delete a line item. Returns whether a record was removed.
    async fn delete_item(&self, email: &str, product_id: &str) -> RepositoryResult<bool>;
}

/// DynamoDB implementation of the CartRepository trait.
///
/// The table uses `email` as hash key and `product_id` as range key.
pub struct DynamoDbCartRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
    metrics: Option<Arc<Metrics>>,
}

impl DynamoDbCartRepository {
    /// Create a new DynamoDB cart repository
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
            metrics: None,
        }
    }

    /// Record database operation metrics on `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Create a DynamoDB subsegment span with proper X-Ray attributes
    fn create_dynamodb_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "aws.request_id" = tracing::field::Empty,
            "aws.remote.service" = "AWS::DynamoDB",
            "aws.remote.operation" = operation,
            "aws.remote.resource.type" = "AWS::DynamoDB::Table",
            "aws.remote.resource.identifier" = %self.table_name,
            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),
            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonDynamoDBv2",
            "rpc.method" = operation,
            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,
        )
    }

    /// Get the table name (for testing)
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn key(email: &str, product_id: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("email".to_string(), AttributeValue::S(email.to_string())),
            (
                "product_id".to_string(),
                AttributeValue::S(product_id.to_string()),
            ),
        ])
    }

    fn record_operation(&self, operation: &str, success: bool, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_database_operation(
                operation,
                &self.table_name,
                success,
                started.elapsed().as_secs_f64(),
            );
        }
    }

    /// Convert a DynamoDB item to a CartItem
    pub fn item_to_cart_item(
        &self,
        item: &HashMap<String, AttributeValue>,
    ) -> RepositoryResult<CartItem> {
        use chrono::DateTime;
        use rust_decimal::Decimal;
        use std::str::FromStr;

        let string_attr = |name: &str| -> RepositoryResult<String> {
            item.get(name)
                .and_then(|v| v.as_s().ok())
                .cloned()
                .ok_or_else(|| RepositoryError::InvalidQuery {
                    message: format!("Missing {} in cart item", name),
                })
        };

        let email = string_attr("email")?;
        let product_id = string_attr("product_id")?;
        let name = string_attr("name")?;
        let username = string_attr("username").unwrap_or_default();
        let image_url = string_attr("image_url").unwrap_or_default();

        let price = item
            .get("price")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| Decimal::from_str(s).ok())
            .ok_or_else(|| RepositoryError::InvalidQuery {
                message: "Invalid price in cart item".to_string(),
            })?;

        let quantity = item
            .get("quantity")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| RepositoryError::InvalidQuery {
                message: "Invalid quantity in cart item".to_string(),
            })?;

        let parse_timestamp = |name: &str| {
            item.get(name)
                .and_then(|v| v.as_s().ok())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc))
        };

        let created_at =
            parse_timestamp("created_at").ok_or_else(|| RepositoryError::InvalidQuery {
                message: "Invalid created_at in cart item".to_string(),
            })?;
        // Legacy records without updated_at fall back to created_at
        let updated_at = parse_timestamp("updated_at").unwrap_or(created_at);

        Ok(CartItem {
            email,
            username,
            product_id,
            name,
            price,
            image_url,
            quantity,
            created_at,
            updated_at,
        })
    }

    /// Convert DynamoDB error to RepositoryError
    fn map_dynamodb_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);
        match error {
            DynamoDbError::ResourceNotFoundException(_) => RepositoryError::TableNotFound {
                table_name: self.table_name.clone(),
            },
            DynamoDbError::ProvisionedThroughputExceededException(_)
            | DynamoDbError::RequestLimitExceeded(_) => RepositoryError::RateLimitExceeded,
            DynamoDbError::ConditionalCheckFailedException(_) => RepositoryError::ConditionFailed,
            other => RepositoryError::AwsSdk {
                message: other.to_string(),
            },
        }
    }

    fn updated_item(
        &self,
        attributes: Option<HashMap<String, AttributeValue>>,
    ) -> RepositoryResult<CartItem> {
        let attributes = attributes.ok_or_else(|| RepositoryError::InvalidQuery {
            message: "UpdateItem returned no attributes".to_string(),
        })?;
        self.item_to_cart_item(&attributes)
    }
}

#[async_trait]
impl CartRepository for DynamoDbCartRepository {
    #[instrument(skip(self, item), fields(table = %self.table_name, email = %item.email, product_id = %item.product_id, quantity = item.quantity))]
    async fn upsert_item(&self, item: NewCartItem) -> RepositoryResult<CartItem> {
        info!("Upserting cart item");

        let started = Instant::now();
        let now = chrono::Utc::now().to_rfc3339();
        let update_span = self.create_dynamodb_span("UpdateItem");

        // Snapshot fields are only written when absent; quantity is accumulated server-side
        let result = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .set_key(Some(Self::key(&item.email, &item.product_id)))
                .update_expression(
                    "SET username = if_not_exists(username, :username), \
                     #name = if_not_exists(#name, :name), \
                     price = if_not_exists(price, :price), \
                     image_url = if_not_exists(image_url, :image_url), \
                     created_at = if_not_exists(created_at, :now), \
                     updated_at = :now \
                     ADD quantity :quantity",
                )
                .expression_attribute_names("#name", "name")
                .expression_attribute_values(":username", AttributeValue::S(item.username.clone()))
                .expression_attribute_values(":name", AttributeValue::S(item.name.clone()))
                .expression_attribute_values(":price", AttributeValue::N(item.price.to_string()))
                .expression_attribute_values(
                    ":image_url",
                    AttributeValue::S(item.image_url.clone()),
                )
                .expression_attribute_values(":now", AttributeValue::S(now))
                .expression_attribute_values(
                    ":quantity",
                    AttributeValue::N(item.quantity.to_string()),
                )
                .return_values(ReturnValue::AllNew)
                .send()
                .await
                .map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(update_span)
        .await;

        self.record_operation("update_item", result.is_ok(), started);
        let cart_item = self.updated_item(result?.attributes)?;

        info!("Cart item now has quantity {}", cart_item.quantity);
        Ok(cart_item)
    }

    #[instrument(skip(self), fields(table = %self.table_name, email = %email))]
    async fn find_items_by_email(&self, email: &str) -> RepositoryResult<Vec<CartItem>> {
        info!("Querying cart items for user");

        let started = Instant::now();
        let mut items = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let query_span = self.create_dynamodb_span("Query");

            let result = async {
                self.client
                    .query()
                    .table_name(&self.table_name)
                    .key_condition_expression("email = :email")
                    .expression_attribute_values(":email", AttributeValue::S(email.to_string()))
                    .set_exclusive_start_key(exclusive_start_key.take())
                    .send()
                    .await
                    .map_err(|e| self.map_dynamodb_error(e.into()))
            }
            .instrument(query_span)
            .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    self.record_operation("query", false, started);
                    return Err(e);
                }
            };

            // Any unreadable record fails the whole listing
            for item in response.items.unwrap_or_default() {
                match self.item_to_cart_item(&item) {
                    Ok(cart_item) => items.push(cart_item),
                    Err(e) => {
                        error!("Unreadable cart record for user: {}", e);
                        self.record_operation("query", false, started);
                        return Err(e);
                    }
                }
            }

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        self.record_operation("query", true, started);
        info!("Found {} cart items", items.len());
        Ok(items)
    }

    #[instrument(skip(self), fields(table = %self.table_name, email = %email, product_id = %product_id))]
    async fn increment_quantity(
        &self,
        email: &str,
        product_id: &str,
    ) -> RepositoryResult<Option<CartItem>> {
        info!("Incrementing cart item quantity");

        let started = Instant::now();
        let update_span = self.create_dynamodb_span("UpdateItem");

        let result = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .set_key(Some(Self::key(email, product_id)))
                .update_expression("SET updated_at = :now ADD quantity :one")
                .condition_expression("attribute_exists(product_id)")
                .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
                .expression_attribute_values(
                    ":now",
                    AttributeValue::S(chrono::Utc::now().to_rfc3339()),
                )
                .return_values(ReturnValue::AllNew)
                .send()
                .await
                .map_err(DynamoDbError::from)
        }
        .instrument(update_span)
        .await;

        match result {
            Ok(output) => {
                self.record_operation("update_item", true, started);
                Ok(Some(self.updated_item(output.attributes)?))
            }
            Err(DynamoDbError::ConditionalCheckFailedException(_)) => {
                self.record_operation("update_item", true, started);
                info!("Cart item not found, nothing incremented");
                Ok(None)
            }
            Err(e) => {
                self.record_operation("update_item", false, started);
                Err(self.map_dynamodb_error(e))
            }
        }
    }

    #[instrument(skip(self), fields(table = %self.table_name, email = %email, product_id = %product_id))]
    async fn decrement_quantity(
        &self,
        email: &str,
        product_id: &str,
    ) -> RepositoryResult<QuantityChange> {
        info!("Decrementing cart item quantity");

        let started = Instant::now();
        let update_span = self.create_dynamodb_span("UpdateItem");

        let result = async {
            self.client
                .update_item()
                .table_name(&self.table_name)
                .set_key(Some(Self::key(email, product_id)))
                .update_expression("SET quantity = quantity - :one, updated_at = :now")
                .condition_expression("quantity > :floor")
                .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
                .expression_attribute_values(
                    ":floor",
                    AttributeValue::N(FLOOR_QUANTITY.to_string()),
                )
                .expression_attribute_values(
                    ":now",
                    AttributeValue::S(chrono::Utc::now().to_rfc3339()),
                )
                .return_values(ReturnValue::AllNew)
                .return_values_on_condition_check_failure(
                    ReturnValuesOnConditionCheckFailure::AllOld,
                )
                .send()
                .await
                .map_err(DynamoDbError::from)
        }
        .instrument(update_span)
        .await;

        match result {
            Ok(output) => {
                self.record_operation("update_item", true, started);
                Ok(QuantityChange::Applied(self.updated_item(output.attributes)?))
            }
            Err(DynamoDbError::ConditionalCheckFailedException(failure)) => {
                self.record_operation("update_item", true, started);
                // The old image is only returned when the record exists
                match failure.item() {
                    Some(item) if !item.is_empty() => {
                        info!("Cart item already at floor quantity");
                        Ok(QuantityChange::AtFloor(self.item_to_cart_item(item)?))
                    }
                    _ => {
                        info!("Cart item not found, nothing decremented");
                        Ok(QuantityChange::NotFound)
                    }
                }
            }
            Err(e) => {
                self.record_operation("update_item", false, started);
                Err(self.map_dynamodb_error(e))
            }
        }
    }

    #[instrument(skip(self), fields(table = %self.table_name, email = %email, product_id = %product_id))]
    async fn delete_item(&self, email: &str, product_id: &str) -> RepositoryResult<bool> {
        info!("Deleting cart item");

        let started = Instant::now();
        let delete_span = self.create_dynamodb_span("DeleteItem");

        let result = async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .set_key(Some(Self::key(email, product_id)))
                .return_values(ReturnValue::AllOld)
                .send()
                .await
                .map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(delete_span)
        .await;

        self.record_operation("delete_item", result.is_ok(), started);

        let deleted = result?
            .attributes
            .is_some_and(|attributes| !attributes.is_empty());
        info!("Cart item deleted: {}", deleted);
        Ok(deleted)
    }
}
