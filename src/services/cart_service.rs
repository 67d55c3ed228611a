use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::{
    validate_email, AddCartItemRequest, CartItem, CartItemKeyRequest, NewCartItem,
    QuantityChange, ServiceError, ServiceResult, Validate,
};
use crate::repositories::CartRepository;

/// Service for managing cart line items
pub struct CartService {
    cart_repository: Arc<dyn CartRepository>,
}

impl CartService {
    /// Create a new CartService
    pub fn new(cart_repository: Arc<dyn CartRepository>) -> Self {
        Self { cart_repository }
    }

    /// Add a product to the user's cart, accumulating onto an existing line item
    #[instrument(skip(self, request), fields(email = %request.email, product_id = %request.product_id, quantity = request.quantity))]
    pub async fn add_item(&self, request: AddCartItemRequest) -> ServiceResult<CartItem> {
        info!("Adding item to cart");

        let new_item = NewCartItem::try_from(request)?;
        let item = self.cart_repository.upsert_item(new_item).await?;

        info!("Item added to cart, quantity is now {}", item.quantity);
        Ok(item)
    }

    /// List all line items in the user's cart
    #[instrument(skip(self), fields(email = %email))]
    pub async fn list_items(&self, email: &str) -> ServiceResult<Vec<CartItem>> {
        info!("Listing cart items");

        validate_email(email)?;
        let items = self.cart_repository.find_items_by_email(email.trim()).await?;

        info!("Cart has {} items", items.len());
        Ok(items)
    }

    /// Increase the quantity of an existing line item by one
    #[instrument(skip(self, request), fields(email = %request.email, product_id = %request.product_id))]
    pub async fn increase_quantity(&self, request: CartItemKeyRequest) -> ServiceResult<CartItem> {
        info!("Increasing cart item quantity");

        request.validate()?;
        let (email, product_id) = (request.email.trim(), request.product_id.trim());

        match self
            .cart_repository
            .increment_quantity(email, product_id)
            .await?
        {
            Some(item) => {
                info!("Cart item quantity increased to {}", item.quantity);
                Ok(item)
            }
            None => Err(ServiceError::CartItemNotFound {
                email: email.to_string(),
                product_id: product_id.to_string(),
            }),
        }
    }

    /// Decrease the quantity of an existing line item by one, never below the floor
    #[instrument(skip(self, request), fields(email = %request.email, product_id = %request.product_id))]
    pub async fn decrease_quantity(&self, request: CartItemKeyRequest) -> ServiceResult<CartItem> {
        info!("Decreasing cart item quantity");

        request.validate()?;
        let (email, product_id) = (request.email.trim(), request.product_id.trim());

        match self
            .cart_repository
            .decrement_quantity(email, product_id)
            .await?
        {
            QuantityChange::Applied(item) => {
                info!("Cart item quantity decreased to {}", item.quantity);
                Ok(item)
            }
            QuantityChange::AtFloor(_) => Err(ServiceError::QuantityAtFloor {
                email: email.to_string(),
                product_id: product_id.to_string(),
            }),
            QuantityChange::NotFound => Err(ServiceError::CartItemNotFound {
                email: email.to_string(),
                product_id: product_id.to_string(),
            }),
        }
    }

    /// Remove a line item from the user's cart
    #[instrument(skip(self), fields(email = %email, product_id = %product_id))]
    pub async fn remove_item(&self, email: &str, product_id: &str) -> ServiceResult<()> {
        info!("Removing item from cart");

        let request = CartItemKeyRequest {
            email: email.to_string(),
            product_id: product_id.to_string(),
        };
        request.validate()?;
        let (email, product_id) = (request.email.trim(), request.product_id.trim());

        if !self.cart_repository.delete_item(email, product_id).await? {
            return Err(ServiceError::CartItemNotFound {
                email: email.to_string(),
                product_id: product_id.to_string(),
            });
        }

        info!("Item removed from cart");
        Ok(())
    }
}
