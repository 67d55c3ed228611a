use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{
    AddCartItemRequest, CartActionResponse, CartItem, CartItemKeyRequest, ServiceError,
};
use crate::observability::Metrics;
use crate::services::CartService;

/// State for cart handlers
#[derive(Clone)]
pub struct CartHandlerState {
    pub cart_service: Arc<CartService>,
    pub metrics: Arc<Metrics>,
}

type ActionResult = Result<(StatusCode, Json<CartActionResponse>), (StatusCode, Json<CartActionResponse>)>;

/// Cart routes, relative to the `/api/cart` mount point
pub fn create_cart_router(cart_service: Arc<CartService>, metrics: Arc<Metrics>) -> Router {
    let state = CartHandlerState {
        cart_service,
        metrics,
    };

    Router::new()
        .route("/add", post(add_item))
        .route("/increase", post(increase_quantity))
        .route("/decrease", post(decrease_quantity))
        .route("/remove/:email/:product_id", delete(remove_item))
        .route("/:email", get(list_items))
        .with_state(state)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CartOperation {
    Add,
    List,
    Increase,
    Decrease,
    Remove,
}

impl CartOperation {
    fn as_str(self) -> &'static str {
        match self {
            CartOperation::Add => "add",
            CartOperation::List => "list",
            CartOperation::Increase => "increase",
            CartOperation::Decrease => "decrease",
            CartOperation::Remove => "remove",
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            CartOperation::Add => "Item added to cart",
            CartOperation::List => "Cart items fetched",
            CartOperation::Increase => "Item quantity increased",
            CartOperation::Decrease => "Item quantity decreased",
            CartOperation::Remove => "Item removed from cart",
        }
    }

    fn not_found_message(self) -> &'static str {
        match self {
            CartOperation::Decrease => "Item not found or quantity is already 1",
            CartOperation::Remove => "Item not found in cart",
            _ => "Item not found",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            CartOperation::Add => "Failed to add item to cart",
            CartOperation::List => "Failed to fetch cart items",
            CartOperation::Increase => "Failed to increase quantity",
            CartOperation::Decrease => "Failed to decrease quantity",
            CartOperation::Remove => "Failed to remove item from cart",
        }
    }
}

/// Add a product to a cart, accumulating quantity on repeat adds
#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<CartHandlerState>,
    payload: Result<Json<AddCartItemRequest>, JsonRejection>,
) -> ActionResult {
    let operation = CartOperation::Add;
    let Json(request) = payload.map_err(|rejection| malformed_body(&state, operation, rejection))?;

    info!(
        "Adding product {} x{} to cart of {}",
        request.product_id, request.quantity, request.email
    );

    match state.cart_service.add_item(request).await {
        Ok(item) => {
            info!("Cart item {} now has quantity {}", item.product_id, item.quantity);
            Ok(success(&state, operation, StatusCode::CREATED))
        }
        Err(err) => Err(failure(&state, operation, err)),
    }
}

/// List every line item in a user's cart
#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<CartHandlerState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<CartItem>>, (StatusCode, Json<Value>)> {
    let operation = CartOperation::List;
    info!("Listing cart items for {}", email);

    match state.cart_service.list_items(&email).await {
        Ok(items) => {
            info!("Found {} cart items", items.len());
            state.metrics.record_cart_operation(operation.as_str(), "success");
            Ok(Json(items))
        }
        Err(err) => {
            let (status, Json(body)) = failure(&state, operation, err);
            Err((status, Json(json!({ "error": body.message }))))
        }
    }
}

/// Increase a line item's quantity by one
#[instrument(skip(state, payload))]
pub async fn increase_quantity(
    State(state): State<CartHandlerState>,
    payload: Result<Json<CartItemKeyRequest>, JsonRejection>,
) -> ActionResult {
    let operation = CartOperation::Increase;
    let Json(request) = payload.map_err(|rejection| malformed_body(&state, operation, rejection))?;

    info!(
        "Increasing quantity of {} in cart of {}",
        request.product_id, request.email
    );

    match state.cart_service.increase_quantity(request).await {
        Ok(item) => {
            info!("Cart item {} now has quantity {}", item.product_id, item.quantity);
            Ok(success(&state, operation, StatusCode::OK))
        }
        Err(err) => Err(failure(&state, operation, err)),
    }
}

/// Decrease a line item's quantity by one; never drops below 1
#[instrument(skip(state, payload))]
pub async fn decrease_quantity(
    State(state): State<CartHandlerState>,
    payload: Result<Json<CartItemKeyRequest>, JsonRejection>,
) -> ActionResult {
    let operation = CartOperation::Decrease;
    let Json(request) = payload.map_err(|rejection| malformed_body(&state, operation, rejection))?;

    info!(
        "Decreasing quantity of {} in cart of {}",
        request.product_id, request.email
    );

    match state.cart_service.decrease_quantity(request).await {
        Ok(item) => {
            info!("Cart item {} now has quantity {}", item.product_id, item.quantity);
            Ok(success(&state, operation, StatusCode::OK))
        }
        Err(err) => Err(failure(&state, operation, err)),
    }
}

/// Remove a line item from a cart
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<CartHandlerState>,
    Path((email, product_id)): Path<(String, String)>,
) -> ActionResult {
    let operation = CartOperation::Remove;
    info!("Removing product {} from cart of {}", product_id, email);

    match state.cart_service.remove_item(&email, &product_id).await {
        Ok(()) => Ok(success(&state, operation, StatusCode::OK)),
        Err(err) => Err(failure(&state, operation, err)),
    }
}

fn success(
    state: &CartHandlerState,
    operation: CartOperation,
    status: StatusCode,
) -> (StatusCode, Json<CartActionResponse>) {
    state.metrics.record_cart_operation(operation.as_str(), "success");
    (status, Json(CartActionResponse::success(operation.success_message())))
}

fn malformed_body(
    state: &CartHandlerState,
    operation: CartOperation,
    rejection: JsonRejection,
) -> (StatusCode, Json<CartActionResponse>) {
    crate::warn_with_trace!(
        "Rejected {} request body: {}",
        operation.as_str(),
        rejection.body_text()
    );
    state.metrics.record_cart_operation(operation.as_str(), "invalid");

    (
        StatusCode::BAD_REQUEST,
        Json(CartActionResponse::failure(format!(
            "Invalid request body: {}",
            rejection.body_text()
        ))),
    )
}

/// Translate a service error into the operation's status code and envelope
fn failure(
    state: &CartHandlerState,
    operation: CartOperation,
    err: ServiceError,
) -> (StatusCode, Json<CartActionResponse>) {
    let (status, outcome, response) = match &err {
        ServiceError::ValidationError { .. } => {
            warn!("Invalid {} request: {}", operation.as_str(), err);
            (
                StatusCode::BAD_REQUEST,
                "invalid",
                CartActionResponse::failure(err.to_string()),
            )
        }
        ServiceError::CartItemNotFound { .. } => {
            info!("{} rejected: {}", operation.as_str(), err);
            let response = CartActionResponse::failure(operation.not_found_message());
            let response = if operation == CartOperation::Decrease {
                response.with_reason("not_found")
            } else {
                response
            };
            (StatusCode::NOT_FOUND, "not_found", response)
        }
        ServiceError::QuantityAtFloor { .. } => {
            info!("{} rejected: {}", operation.as_str(), err);
            (
                StatusCode::NOT_FOUND,
                "at_floor",
                CartActionResponse::failure(operation.not_found_message()).with_reason("at_floor"),
            )
        }
        ServiceError::Repository { source } => {
            crate::error_with_trace!(
                error = %source,
                operation = operation.as_str(),
                "Cart store operation failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                CartActionResponse::failure(operation.failure_message()),
            )
        }
    };

    state.metrics.record_cart_operation(operation.as_str(), outcome);
    (status, Json(response))
}
