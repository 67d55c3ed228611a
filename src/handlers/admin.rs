use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::CartActionResponse;
use crate::repositories::TableManager;

/// Admin state for table provisioning
#[derive(Clone)]
pub struct AdminState {
    pub table_manager: Arc<TableManager>,
    pub carts_table_name: String,
}

/// Response for table setup operations
#[derive(Debug, Serialize)]
pub struct SetupTablesResponse {
    pub message: String,
    pub tables_created: Vec<String>,
    pub timestamp: String,
}

/// Admin routes, mounted only when carts are stored in DynamoDB
pub fn create_admin_router(table_manager: Arc<TableManager>, carts_table_name: String) -> Router {
    let state = AdminState {
        table_manager,
        carts_table_name,
    };

    Router::new()
        .route("/api/admin/setup-tables", post(setup_tables))
        .with_state(state)
}

/// Create the carts table if it does not exist yet
#[instrument(name = "setup_tables", skip(state), fields(carts_table = %state.carts_table_name))]
pub async fn setup_tables(
    State(state): State<AdminState>,
) -> Result<Json<SetupTablesResponse>, (StatusCode, Json<CartActionResponse>)> {
    info!("Setting up DynamoDB tables");

    match state
        .table_manager
        .create_carts_table(&state.carts_table_name)
        .await
    {
        Ok(created) => {
            let tables_created = if created {
                vec![state.carts_table_name.clone()]
            } else {
                Vec::new()
            };

            let message = if created {
                format!("Created table {}", state.carts_table_name)
            } else {
                format!("Table {} already exists", state.carts_table_name)
            };
            crate::info_with_trace!("{}", message);

            Ok(Json(SetupTablesResponse {
                message,
                tables_created,
                timestamp: chrono::Utc::now().to_rfc3339(),
            }))
        }
        Err(err) => {
            crate::error_with_trace!("Failed to create carts table: {}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CartActionResponse::failure(format!(
                    "Failed to create tables: {}",
                    err
                ))),
            ))
        }
    }
}
