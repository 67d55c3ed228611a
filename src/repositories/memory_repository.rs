use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::cart_repository::{CartRepository, FLOOR_QUANTITY};
use crate::models::{CartItem, NewCartItem, QuantityChange, RepositoryResult};

type CartKey = (String, String);

/// In-process cart store for local development and tests.
///
/// Records live in a `BTreeMap` keyed by `(email, product_id)`, so listing a
/// user's cart is a range scan in product ID order, matching the DynamoDB
/// query order. Every mutation holds the write lock for its whole
/// read-modify-write.
#[derive(Clone, Default)]
pub struct InMemoryCartRepository {
    items: Arc<RwLock<BTreeMap<CartKey, CartItem>>>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of line items across all users
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    fn key(email: &str, product_id: &str) -> CartKey {
        (email.to_string(), product_id.to_string())
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    #[instrument(skip(self, item), fields(email = %item.email, product_id = %item.product_id))]
    async fn upsert_item(&self, item: NewCartItem) -> RepositoryResult<CartItem> {
        let mut items = self.items.write().await;
        let key = Self::key(&item.email, &item.product_id);

        let stored = match items.get_mut(&key) {
            Some(existing) => {
                existing.accumulate(item.quantity);
                existing.clone()
            }
            None => {
                let created = CartItem::from_new(item);
                items.insert(key, created.clone());
                created
            }
        };

        debug!("Cart item now has quantity {}", stored.quantity);
        Ok(stored)
    }

    async fn find_items_by_email(&self, email: &str) -> RepositoryResult<Vec<CartItem>> {
        let items = self.items.read().await;

        Ok(items
            .range(Self::key(email, "")..)
            .take_while(|((owner, _), _)| owner == email)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn increment_quantity(
        &self,
        email: &str,
        product_id: &str,
    ) -> RepositoryResult<Option<CartItem>> {
        let mut items = self.items.write().await;

        Ok(items.get_mut(&Self::key(email, product_id)).map(|item| {
            item.accumulate(1);
            item.clone()
        }))
    }

    async fn decrement_quantity(
        &self,
        email: &str,
        product_id: &str,
    ) -> RepositoryResult<QuantityChange> {
        let mut items = self.items.write().await;

        let change = match items.get_mut(&Self::key(email, product_id)) {
            Some(item) => {
                if item.decrement_above(FLOOR_QUANTITY) {
                    QuantityChange::Applied(item.clone())
                } else {
                    QuantityChange::AtFloor(item.clone())
                }
            }
            None => QuantityChange::NotFound,
        };

        Ok(change)
    }

    async fn delete_item(&self, email: &str, product_id: &str) -> RepositoryResult<bool> {
        let mut items = self.items.write().await;
        Ok(items.remove(&Self::key(email, product_id)).is_some())
    }
}
