//! Account and staff handlers.

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
use crate::api::AppState;
use crate::domain::{StaffPermissions, UserResponse};
use crate::errors::AppResult;
use crate::services::{Actor, NewStaff};
use crate::types::NoContent;

/// New staff account
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStaffRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "clerk@shop.example")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Sam Clerk")]
    pub name: String,
    /// Flags left out default to `false`
    #[serde(default)]
    pub permissions: StaffPermissions,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStaffRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    /// Replaces the whole permission set
    pub permissions: Option<StaffPermissions>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StaffQuery {
    /// Include soft-deleted accounts
    #[serde(default)]
    pub include_deleted: bool,
}

/// Current account routes
pub fn account_routes() -> Router<AppState> {
    Router::new().route("/", get(me))
}

/// Staff management routes (store owner only)
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_staff).post(create_staff))
        .route("/:id", put(update_staff).delete(delete_staff))
        .route("/:id/restore", post(restore_staff))
}

/// Get the authenticated account
#[utoipa::path(
    get,
    path = "/me",
    tag = "Staff",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn me(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.staff().me(&actor).await?;
    Ok(Json(UserResponse::from(user)))
}

/// List the store's staff accounts
#[utoipa::path(
    get,
    path = "/staff",
    tag = "Staff",
    security(("bearer_auth" = [])),
    params(StaffQuery),
    responses(
        (status = 200, description = "Staff accounts", body = Vec<UserResponse>),
        (status = 403, description = "Owner only")
    )
)]
pub async fn list_staff(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Query(query): Query<StaffQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state
        .services
        .staff()
        .list_staff(&actor, query.include_deleted)
        .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Create a staff account
#[utoipa::path(
    post,
    path = "/staff",
    tag = "Staff",
    security(("bearer_auth" = [])),
    request_body = CreateStaffRequest,
    responses(
        (status = 201, description = "Staff account created", body = UserResponse),
        (status = 403, description = "Owner only"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_staff(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateStaffRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .services
        .staff()
        .create_staff(
            &actor,
            NewStaff {
                email: payload.email,
                password: payload.password,
                name: payload.name,
                permissions: payload.permissions,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Rename a staff member or replace their permissions
#[utoipa::path(
    put,
    path = "/staff/{id}",
    tag = "Staff",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Staff user ID")),
    request_body = UpdateStaffRequest,
    responses(
        (status = 200, description = "Staff account updated", body = UserResponse),
        (status = 403, description = "Owner only"),
        (status = 404, description = "Staff member not found")
    )
)]
pub async fn update_staff(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateStaffRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .services
        .staff()
        .update_staff(&actor, id, payload.name, payload.permissions)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// Soft delete a staff account
#[utoipa::path(
    delete,
    path = "/staff/{id}",
    tag = "Staff",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Staff user ID")),
    responses(
        (status = 204, description = "Staff account deleted"),
        (status = 403, description = "Owner only"),
        (status = 404, description = "Staff member not found")
    )
)]
pub async fn delete_staff(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.staff().delete_staff(&actor, id).await?;
    Ok(NoContent)
}

/// Restore a soft-deleted staff account
#[utoipa::path(
    post,
    path = "/staff/{id}/restore",
    tag = "Staff",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Staff user ID")),
    responses(
        (status = 200, description = "Staff account restored", body = UserResponse),
        (status = 403, description = "Owner only"),
        (status = 404, description = "Staff member not found")
    )
)]
pub async fn restore_staff(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.staff().restore_staff(&actor, id).await?;
    Ok(Json(UserResponse::from(user)))
}
