use rust_decimal::Decimal;

use super::{AddCartItemRequest, CartItemKeyRequest, NewCartItem, ValidationError, ValidationResult};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_USERNAME_LENGTH: usize = 100;
pub const MAX_PRODUCT_ID_LENGTH: usize = 128;
pub const MAX_PRODUCT_NAME_LENGTH: usize = 200;
pub const MAX_IMAGE_URL_LENGTH: usize = 500;
pub const MAX_PRICE: Decimal = Decimal::from_parts(99999999, 0, 0, false, 2); // 999999.99
pub const MAX_CART_QUANTITY: u32 = 1000;
pub const MIN_CART_QUANTITY: u32 = 1;

impl Validate for AddCartItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_email(&self.email)?;
        validate_username(&self.username)?;
        validate_product_id(&self.product_id)?;
        validate_product_name(&self.name)?;
        validate_price(&self.price)?;
        validate_image_url(&self.image_url)?;
        validate_cart_quantity(self.quantity)?;
        Ok(())
    }
}

impl Validate for CartItemKeyRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_email(&self.email)?;
        validate_product_id(&self.product_id)?;
        Ok(())
    }
}

impl TryFrom<AddCartItemRequest> for NewCartItem {
    type Error = ValidationError;

    fn try_from(request: AddCartItemRequest) -> Result<Self, Self::Error> {
        request.validate()?;
        let quantity = validate_cart_quantity(request.quantity)?;

        Ok(NewCartItem {
            email: request.email.trim().to_string(),
            username: request.username.trim().to_string(),
            product_id: request.product_id.trim().to_string(),
            name: request.name.trim().to_string(),
            price: request.price,
            image_url: request.image_url.trim().to_string(),
            quantity,
        })
    }
}

/// Validate the cart owner key. Any non-empty string identifies a cart.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "email".to_string(),
        });
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max_length: MAX_EMAIL_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidValue {
            field: "email".to_string(),
            value: email.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate the denormalized display name. Empty is allowed.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let trimmed = username.trim();

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max_length: MAX_USERNAME_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    Ok(())
}

/// Validate product ID
pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    let trimmed = product_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "productId".to_string(),
        });
    }

    if trimmed.len() > MAX_PRODUCT_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: "productId".to_string(),
            max_length: MAX_PRODUCT_ID_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidValue {
            field: "productId".to_string(),
            value: product_id.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate product name snapshot
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "name".to_string(),
        });
    }

    if trimmed.len() > MAX_PRODUCT_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max_length: MAX_PRODUCT_NAME_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    Ok(())
}

/// Validate price snapshot. Stored with whatever precision the caller sent.
pub fn validate_price(price: &Decimal) -> ValidationResult<()> {
    if *price < Decimal::ZERO || *price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: "0".to_string(),
            max: MAX_PRICE.to_string(),
            value: price.to_string(),
        });
    }

    Ok(())
}

/// Validate image URL snapshot. Empty is allowed.
pub fn validate_image_url(image_url: &str) -> ValidationResult<()> {
    let trimmed = image_url.trim();

    if trimmed.len() > MAX_IMAGE_URL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "imageUrl".to_string(),
            max_length: MAX_IMAGE_URL_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    Ok(())
}

/// Validate the quantity of an add request and narrow it to `u32`
pub fn validate_cart_quantity(quantity: i64) -> ValidationResult<u32> {
    if quantity < i64::from(MIN_CART_QUANTITY) || quantity > i64::from(MAX_CART_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: MIN_CART_QUANTITY.to_string(),
            max: MAX_CART_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }

    Ok(quantity as u32)
}
