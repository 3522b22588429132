//! Authentication handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::post,
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::SessionId;
use crate::api::AppState;
use crate::domain::{Store, UserResponse};
use crate::errors::AppResult;
use crate::services::{SellerSignup, TokenResponse};
use crate::types::NoContent;

/// Seller sign-up request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Owner email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "owner@shop.example")]
    pub email: String,
    /// Owner password (minimum 8 characters)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,
    /// Owner display name
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Dana Seller")]
    pub name: String,
    #[validate(length(min = 1, max = 120, message = "Store name is required"))]
    #[schema(example = "Dana's Tees")]
    pub store_name: String,
    /// ISO 4217 code; defaults to USD
    #[schema(example = "EUR")]
    pub currency: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "owner@shop.example")]
    pub email: String,
    #[schema(example = "SecurePass123!")]
    pub password: String,
}

/// New store and its owner
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationResponse {
    pub store: Store,
    pub owner: UserResponse,
}

/// Public authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes that need a live session
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/logout", post(logout))
}

/// Register a store with its owner account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Store registered", body = RegistrationResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegistrationResponse>)> {
    let registration = state
        .services
        .auth()
        .register_seller(SellerSignup {
            email: payload.email,
            password: payload.password,
            name: payload.name,
            store_name: payload.store_name,
            currency: payload.currency,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            store: registration.store,
            owner: UserResponse::from(registration.owner),
        }),
    ))
}

/// Login and get JWT token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = state
        .services
        .auth()
        .login(payload.email, payload.password)
        .await?;

    Ok(Json(token))
}

/// End the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn logout(
    Extension(session): Extension<SessionId>,
    State(state): State<AppState>,
) -> AppResult<NoContent> {
    state.services.auth().logout(&session.0).await?;
    Ok(NoContent)
}
