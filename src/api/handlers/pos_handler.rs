//! Point-of-sale handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::order_handler::OrderLine;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::require_permission;
use crate::api::AppState;
use crate::domain::order::LineRequest;
use crate::domain::{DailySummary, Order, PaymentMethod, Permission};
use crate::errors::AppResult;
use crate::services::{Actor, Checkout};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Sale needs at least one line"))]
    pub items: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
    /// Cash handed over; required for cash sales
    #[schema(value_type = Option<String>, example = "20.00")]
    pub amount_tendered: Option<Decimal>,
    pub warehouse_id: Option<Uuid>,
    pub promotion_code: Option<String>,
    pub customer_name: Option<String>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefundRequest {
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// UTC day; today when absent
    #[param(value_type = Option<String>, example = "2024-06-01")]
    pub date: Option<NaiveDate>,
}

/// POS routes (requires the `pos` permission)
pub fn pos_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/sales/:id/refund", post(refund))
        .route("/summary", get(daily_summary))
}

/// Ring up a till sale
#[utoipa::path(
    post,
    path = "/pos/checkout",
    tag = "POS",
    security(("bearer_auth" = [])),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Sale completed", body = Order),
        (status = 400, description = "Validation error or insufficient tender"),
        (status = 409, description = "Insufficient stock")
    )
)]
pub async fn checkout(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let store_id = require_permission(&actor, Permission::Pos)?;
    let order = state
        .services
        .pos()
        .checkout(
            store_id,
            actor.user_id,
            Checkout {
                items: payload.items.into_iter().map(LineRequest::from).collect(),
                payment_method: payload.payment_method,
                amount_tendered: payload.amount_tendered,
                warehouse_id: payload.warehouse_id,
                promotion_code: payload.promotion_code,
                customer_name: payload.customer_name,
                note: payload.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Refund a completed till sale and restock it
#[utoipa::path(
    post,
    path = "/pos/sales/{id}/refund",
    tag = "POS",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = RefundRequest,
    responses(
        (status = 200, description = "Sale refunded", body = Order),
        (status = 404, description = "Sale not found"),
        (status = 409, description = "Not a completed POS sale")
    )
)]
pub async fn refund(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RefundRequest>,
) -> AppResult<Json<Order>> {
    let store_id = require_permission(&actor, Permission::Pos)?;
    let order = state
        .services
        .pos()
        .refund(store_id, actor.user_id, id, payload.note)
        .await?;
    Ok(Json(order))
}

/// Till totals for one day
#[utoipa::path(
    get,
    path = "/pos/summary",
    tag = "POS",
    security(("bearer_auth" = [])),
    params(SummaryQuery),
    responses(
        (status = 200, description = "Daily summary", body = DailySummary)
    )
)]
pub async fn daily_summary(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<DailySummary>> {
    let store_id = require_permission(&actor, Permission::Pos)?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(
        state.services.pos().daily_summary(store_id, date).await?,
    ))
}
