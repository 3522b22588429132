//! Online order handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::require_permission;
use crate::api::AppState;
use crate::domain::order::LineRequest;
use crate::domain::{Customer, Order, OrderFilter, OrderStatus, Permission, StatusChange};
use crate::errors::AppResult;
use crate::services::{Actor, PlaceOrder};
use crate::types::{Paginated, PaginationParams};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: Uuid,
    #[schema(example = 2)]
    pub quantity: i32,
}

impl From<OrderLine> for LineRequest {
    fn from(line: OrderLine) -> Self {
        LineRequest {
            product_id: line.product_id,
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    #[schema(example = "Alex Buyer")]
    pub customer_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    #[validate(length(min = 1, message = "Order needs at least one line"))]
    pub items: Vec<OrderLine>,
    /// Fulfilment warehouse; the store default when absent
    pub warehouse_id: Option<Uuid>,
    #[schema(example = "SUMMER10")]
    pub promotion_code: Option<String>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StatusChangeRequest {
    #[schema(example = "confirmed")]
    pub status: OrderStatus,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

/// Order routes (requires the `orders` permission)
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route("/:id", get(get_order))
        .route("/:id/status", post(change_status))
        .route("/:id/history", get(order_history))
}

/// List orders
#[utoipa::path(
    get,
    path = "/orders",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of orders, newest first", body = Vec<Order>),
        (status = 400, description = "Inverted date range"),
        (status = 403, description = "Missing orders permission")
    )
)]
pub async fn list_orders(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<Paginated<Order>>> {
    let store_id = require_permission(&actor, Permission::Orders)?;
    let (orders, total) = state
        .services
        .orders()
        .list(store_id, filter, pagination.clone())
        .await?;
    Ok(Json(Paginated::from_params(orders, &pagination, total)))
}

/// Place an online order, reserving stock
#[utoipa::path(
    post,
    path = "/orders",
    tag = "Orders",
    security(("bearer_auth" = [])),
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = Order),
        (status = 400, description = "Validation error or promotion not applicable"),
        (status = 409, description = "Insufficient stock")
    )
)]
pub async fn place_order(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PlaceOrderRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let store_id = require_permission(&actor, Permission::Orders)?;
    let request = PlaceOrder {
        customer: Customer {
            name: payload.customer_name,
            email: payload.customer_email,
            phone: payload.customer_phone,
            shipping_address: payload.shipping_address,
        },
        items: payload.items.into_iter().map(LineRequest::from).collect(),
        warehouse_id: payload.warehouse_id,
        promotion_code: payload.promotion_code,
        note: payload.note,
    };

    let order = state
        .services
        .orders()
        .place_order(store_id, actor.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get an order with its lines
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 404, description = "Order not found")
    )
)]
pub async fn get_order(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let store_id = require_permission(&actor, Permission::Orders)?;
    Ok(Json(state.services.orders().get(store_id, id).await?))
}

/// Move an order to its next status
#[utoipa::path(
    post,
    path = "/orders/{id}/status",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Status changed", body = Order),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn change_status(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<StatusChangeRequest>,
) -> AppResult<Json<Order>> {
    let store_id = require_permission(&actor, Permission::Orders)?;
    let order = state
        .services
        .orders()
        .transition(store_id, actor.user_id, id, payload.status, payload.note)
        .await?;
    Ok(Json(order))
}

/// Status history, oldest first
#[utoipa::path(
    get,
    path = "/orders/{id}/history",
    tag = "Orders",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Status changes", body = Vec<StatusChange>),
        (status = 404, description = "Order not found")
    )
)]
pub async fn order_history(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<StatusChange>>> {
    let store_id = require_permission(&actor, Permission::Orders)?;
    Ok(Json(state.services.orders().history(store_id, id).await?))
}
