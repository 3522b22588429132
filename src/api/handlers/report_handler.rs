//! Report handlers.

use axum::{extract::State, response::Json, routing::get, Extension, Router};

use crate::api::middleware::require_permission;
use crate::api::AppState;
use crate::domain::{Permission, Product};
use crate::errors::AppResult;
use crate::services::{Actor, Dashboard};

/// Report routes (requires the `reports` permission)
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/low-stock", get(low_stock))
}

/// Store dashboard, cached for up to a minute
#[utoipa::path(
    get,
    path = "/reports/dashboard",
    tag = "Reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard", body = Dashboard),
        (status = 403, description = "Missing reports permission")
    )
)]
pub async fn dashboard(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
) -> AppResult<Json<Dashboard>> {
    let store_id = require_permission(&actor, Permission::Reports)?;
    Ok(Json(state.services.reports().dashboard(store_id).await?))
}

/// Active products at or below their low-stock threshold
#[utoipa::path(
    get,
    path = "/reports/low-stock",
    tag = "Reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Low-stock products", body = Vec<Product>)
    )
)]
pub async fn low_stock(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Product>>> {
    let store_id = require_permission(&actor, Permission::Reports)?;
    Ok(Json(state.services.reports().low_stock(store_id).await?))
}
