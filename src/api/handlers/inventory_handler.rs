//! Warehouse and stock handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::require_permission;
use crate::api::AppState;
use crate::domain::{
    LedgerFilter, Permission, ReconcileReport, StockLevel, StockMovement, Warehouse,
};
use crate::errors::AppResult;
use crate::infra::repositories::WarehouseChanges;
use crate::services::{Actor, StockRequest, Transfer};
use crate::types::{Paginated, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWarehouseRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    #[schema(example = "Back room")]
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateWarehouseRequest {
    #[validate(length(min = 1, max = 120, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

/// Goods in (positive quantity) or correction (signed delta)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockMoveRequest {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    #[schema(example = 12)]
    pub quantity: i32,
    /// Required for adjustments
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    pub product_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReconcileQuery {
    /// Rewrite product totals to the sum of their levels
    #[serde(default)]
    pub fix: bool,
}

/// Inventory routes (requires the `inventory` permission)
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
        .route("/warehouses/:id", put(update_warehouse))
        .route("/warehouses/:id/default", post(set_default_warehouse))
        .route("/receive", post(receive))
        .route("/adjust", post(adjust))
        .route("/transfer", post(transfer))
        .route("/levels/:product_id", get(stock_levels))
        .route("/ledger", get(ledger))
        .route("/reconcile", post(reconcile))
}

/// List warehouses
#[utoipa::path(
    get,
    path = "/inventory/warehouses",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Warehouses", body = Vec<Warehouse>),
        (status = 403, description = "Missing inventory permission")
    )
)]
pub async fn list_warehouses(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Warehouse>>> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    Ok(Json(
        state.services.inventory().list_warehouses(store_id).await?,
    ))
}

/// Create a warehouse
#[utoipa::path(
    post,
    path = "/inventory/warehouses",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    request_body = CreateWarehouseRequest,
    responses(
        (status = 201, description = "Warehouse created", body = Warehouse),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn create_warehouse(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateWarehouseRequest>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    let warehouse = state
        .services
        .inventory()
        .create_warehouse(store_id, payload.name, payload.location)
        .await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// Rename, relocate or (de)activate a warehouse
#[utoipa::path(
    put,
    path = "/inventory/warehouses/{id}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = UpdateWarehouseRequest,
    responses(
        (status = 200, description = "Warehouse updated", body = Warehouse),
        (status = 404, description = "Warehouse not found"),
        (status = 409, description = "Default warehouse or warehouse holding stock")
    )
)]
pub async fn update_warehouse(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateWarehouseRequest>,
) -> AppResult<Json<Warehouse>> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    let warehouse = state
        .services
        .inventory()
        .update_warehouse(
            store_id,
            id,
            WarehouseChanges {
                name: payload.name,
                location: payload.location,
                is_active: payload.is_active,
            },
        )
        .await?;
    Ok(Json(warehouse))
}

/// Make a warehouse the store default
#[utoipa::path(
    post,
    path = "/inventory/warehouses/{id}/default",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Default warehouse changed", body = Warehouse),
        (status = 409, description = "Warehouse is inactive")
    )
)]
pub async fn set_default_warehouse(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Warehouse>> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    Ok(Json(
        state
            .services
            .inventory()
            .set_default_warehouse(store_id, id)
            .await?,
    ))
}

fn stock_request(actor: &Actor, payload: StockMoveRequest) -> StockRequest {
    StockRequest {
        product_id: payload.product_id,
        warehouse_id: payload.warehouse_id,
        quantity: payload.quantity,
        note: payload.note,
        actor: actor.user_id,
    }
}

/// Receive goods into a warehouse
#[utoipa::path(
    post,
    path = "/inventory/receive",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    request_body = StockMoveRequest,
    responses(
        (status = 201, description = "Stock received", body = StockMovement),
        (status = 400, description = "Quantity must be positive")
    )
)]
pub async fn receive(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<StockMoveRequest>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    let movement = state
        .services
        .inventory()
        .receive(store_id, stock_request(&actor, payload))
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Correct a stock level by a signed delta
#[utoipa::path(
    post,
    path = "/inventory/adjust",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    request_body = StockMoveRequest,
    responses(
        (status = 201, description = "Stock adjusted", body = StockMovement),
        (status = 400, description = "Zero delta or missing reason"),
        (status = 409, description = "Would drive stock negative")
    )
)]
pub async fn adjust(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<StockMoveRequest>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    let movement = state
        .services
        .inventory()
        .adjust(store_id, stock_request(&actor, payload))
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Move stock between warehouses
#[utoipa::path(
    post,
    path = "/inventory/transfer",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Stock transferred", body = Transfer),
        (status = 409, description = "Insufficient stock at the source")
    )
)]
pub async fn transfer(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<TransferRequest>,
) -> AppResult<(StatusCode, Json<Transfer>)> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    let result = state
        .services
        .inventory()
        .transfer(
            store_id,
            StockRequest {
                product_id: payload.product_id,
                warehouse_id: payload.from_warehouse_id,
                quantity: payload.quantity,
                note: payload.note,
                actor: actor.user_id,
            },
            payload.to_warehouse_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Per-warehouse stock for a product
#[utoipa::path(
    get,
    path = "/inventory/levels/{product_id}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Stock levels", body = Vec<StockLevel>),
        (status = 404, description = "Product not found")
    )
)]
pub async fn stock_levels(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockLevel>>> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    Ok(Json(
        state
            .services
            .inventory()
            .stock_levels(store_id, product_id)
            .await?,
    ))
}

/// Stock movement ledger, newest first
#[utoipa::path(
    get,
    path = "/inventory/ledger",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of movements", body = Vec<StockMovement>)
    )
)]
pub async fn ledger(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Query(filter): Query<LedgerFilter>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<Paginated<StockMovement>>> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    let (movements, total) = state
        .services
        .inventory()
        .ledger(store_id, filter, pagination.clone())
        .await?;
    Ok(Json(Paginated::from_params(movements, &pagination, total)))
}

/// Compare cached totals, levels and the ledger
#[utoipa::path(
    post,
    path = "/inventory/reconcile",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(ReconcileQuery),
    responses(
        (status = 200, description = "Drift report", body = ReconcileReport)
    )
)]
pub async fn reconcile(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Query(query): Query<ReconcileQuery>,
) -> AppResult<Json<ReconcileReport>> {
    let store_id = require_permission(&actor, Permission::Inventory)?;
    Ok(Json(
        state
            .services
            .inventory()
            .reconcile(store_id, query.fix)
            .await?,
    ))
}
