//! Promotion handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::require_permission;
use crate::api::AppState;
use crate::domain::{
    DiscountPreview, NewPromotion, Permission, Promotion, PromotionChanges, PromotionKind,
};
use crate::errors::AppResult;
use crate::services::Actor;
use crate::types::{NoContent, Paginated, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePromotionRequest {
    #[validate(length(min = 1, max = 40, message = "Code must be 1-40 characters"))]
    #[schema(example = "SUMMER10")]
    pub code: String,
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    #[schema(example = "Summer sale")]
    pub name: String,
    pub kind: PromotionKind,
    /// Percent (0-100] or fixed amount (> 0)
    #[schema(value_type = String, example = "10")]
    pub value: Decimal,
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    #[validate(range(min = 1, message = "max_uses must be at least 1"))]
    pub max_uses: Option<i32>,
    /// Now when absent
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePromotionRequest {
    #[validate(length(min = 1, max = 120, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub value: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    #[validate(range(min = 1, message = "max_uses must be at least 1"))]
    pub max_uses: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PreviewRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    #[schema(value_type = String, example = "49.90")]
    pub subtotal: Decimal,
}

/// Promotion routes (requires the `marketing` permission)
pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promotions).post(create_promotion))
        .route("/preview", post(preview))
        .route(
            "/:id",
            get(get_promotion)
                .put(update_promotion)
                .delete(delete_promotion),
        )
        .route("/:id/active", post(set_active))
}

/// List promotions
#[utoipa::path(
    get,
    path = "/promotions",
    tag = "Promotions",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of promotions", body = Vec<Promotion>),
        (status = 403, description = "Missing marketing permission")
    )
)]
pub async fn list_promotions(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<Paginated<Promotion>>> {
    let store_id = require_permission(&actor, Permission::Marketing)?;
    let (promotions, total) = state
        .services
        .promotions()
        .list(store_id, pagination.clone())
        .await?;
    Ok(Json(Paginated::from_params(promotions, &pagination, total)))
}

/// Create a promotion
#[utoipa::path(
    post,
    path = "/promotions",
    tag = "Promotions",
    security(("bearer_auth" = [])),
    request_body = CreatePromotionRequest,
    responses(
        (status = 201, description = "Promotion created", body = Promotion),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Code already in use")
    )
)]
pub async fn create_promotion(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePromotionRequest>,
) -> AppResult<(StatusCode, Json<Promotion>)> {
    let store_id = require_permission(&actor, Permission::Marketing)?;
    let promotion = state
        .services
        .promotions()
        .create(
            store_id,
            NewPromotion {
                code: payload.code,
                name: payload.name,
                kind: payload.kind,
                value: payload.value,
                min_order_amount: payload.min_order_amount,
                max_uses: payload.max_uses,
                starts_at: payload.starts_at.unwrap_or_else(Utc::now),
                ends_at: payload.ends_at,
                is_active: payload.is_active,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(promotion)))
}

/// Get a promotion
#[utoipa::path(
    get,
    path = "/promotions/{id}",
    tag = "Promotions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Promotion ID")),
    responses(
        (status = 200, description = "Promotion", body = Promotion),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn get_promotion(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Promotion>> {
    let store_id = require_permission(&actor, Permission::Marketing)?;
    Ok(Json(state.services.promotions().get(store_id, id).await?))
}

/// Update a promotion
#[utoipa::path(
    put,
    path = "/promotions/{id}",
    tag = "Promotions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Promotion ID")),
    request_body = UpdatePromotionRequest,
    responses(
        (status = 200, description = "Promotion updated", body = Promotion),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn update_promotion(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdatePromotionRequest>,
) -> AppResult<Json<Promotion>> {
    let store_id = require_permission(&actor, Permission::Marketing)?;
    let promotion = state
        .services
        .promotions()
        .update(
            store_id,
            id,
            PromotionChanges {
                name: payload.name,
                value: payload.value,
                min_order_amount: payload.min_order_amount,
                max_uses: payload.max_uses,
                starts_at: payload.starts_at,
                ends_at: payload.ends_at,
            },
        )
        .await?;
    Ok(Json(promotion))
}

/// Activate or deactivate a promotion
#[utoipa::path(
    post,
    path = "/promotions/{id}/active",
    tag = "Promotions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Promotion ID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Promotion toggled", body = Promotion),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn set_active(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> AppResult<Json<Promotion>> {
    let store_id = require_permission(&actor, Permission::Marketing)?;
    Ok(Json(
        state
            .services
            .promotions()
            .set_active(store_id, id, payload.active)
            .await?,
    ))
}

/// Delete a promotion that was never used
#[utoipa::path(
    delete,
    path = "/promotions/{id}",
    tag = "Promotions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Promotion ID")),
    responses(
        (status = 204, description = "Promotion deleted"),
        (status = 404, description = "Promotion not found"),
        (status = 409, description = "Promotion has been used")
    )
)]
pub async fn delete_promotion(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    let store_id = require_permission(&actor, Permission::Marketing)?;
    state.services.promotions().delete(store_id, id).await?;
    Ok(NoContent)
}

/// Price a subtotal against a code without using it
#[utoipa::path(
    post,
    path = "/promotions/preview",
    tag = "Promotions",
    security(("bearer_auth" = [])),
    request_body = PreviewRequest,
    responses(
        (status = 200, description = "Discount preview", body = DiscountPreview),
        (status = 400, description = "Promotion not applicable"),
        (status = 404, description = "Unknown code")
    )
)]
pub async fn preview(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PreviewRequest>,
) -> AppResult<Json<DiscountPreview>> {
    // Checkout screens preview codes too
    let store_id = require_permission(&actor, Permission::Marketing)
        .or_else(|_| require_permission(&actor, Permission::Pos))
        .or_else(|_| require_permission(&actor, Permission::Orders))?;
    Ok(Json(
        state
            .services
            .promotions()
            .preview(store_id, &payload.code, payload.subtotal)
            .await?,
    ))
}
