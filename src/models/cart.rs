use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product line in a user's cart, keyed by `(email, product_id)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub email: String,
    pub username: String,
    pub product_id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image_url: String,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a product is added to a cart.
///
/// The product snapshot (`username`, `name`, `price`, `image_url`) is only
/// written when the line item is first created; later adds only accumulate
/// `quantity`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartItem {
    pub email: String,
    pub username: String,
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub image_url: String,
    pub quantity: u32,
}

/// Result of a conditional quantity decrement
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityChange {
    /// The quantity was decremented; holds the updated item
    Applied(CartItem),
    /// The item exists but is already at the floor quantity; holds it unchanged
    AtFloor(CartItem),
    NotFound,
}

/// Request body for `POST /add`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub email: String,
    #[serde(default)]
    pub username: String,
    pub product_id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: String,
    pub quantity: i64,
}

/// Request body for `POST /increase` and `POST /decrease`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemKeyRequest {
    pub email: String,
    pub product_id: String,
}

/// Envelope returned by the mutating cart endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CartItem {
    /// Create a fresh line item from an add request, stamped with the current time
    pub fn from_new(new_item: NewCartItem) -> Self {
        let now = Utc::now();
        Self {
            email: new_item.email,
            username: new_item.username,
            product_id: new_item.product_id,
            name: new_item.name,
            price: new_item.price,
            image_url: new_item.image_url,
            quantity: new_item.quantity,
            created_at: now,
            updated_at: now,
        }
    }

    /// Accumulate `quantity` onto this item. Snapshot fields are left untouched.
    pub fn accumulate(&mut self, quantity: u32) {
        self.quantity = self.quantity.saturating_add(quantity);
        self.updated_at = Utc::now();
    }

    /// Decrement by one unless already at `floor`. Returns whether it changed.
    pub fn decrement_above(&mut self, floor: u32) -> bool {
        if self.quantity > floor {
            self.quantity -= 1;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }
}

impl NewCartItem {
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        image_url: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            product_id: product_id.into(),
            name: name.into(),
            price,
            image_url: image_url.into(),
            quantity,
        }
    }
}

impl CartActionResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            reason: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
