//! Product catalogue handlers.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::require_permission;
use crate::api::AppState;
use crate::config::DEFAULT_LOW_STOCK_THRESHOLD;
use crate::domain::{
    NewProduct, Permission, Product, ProductChanges, ProductFilter, ProductStatus,
};
use crate::errors::AppResult;
use crate::services::Actor;
use crate::types::{NoContent, Paginated, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    /// Stored upper-case; unique per store
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    #[schema(example = "TEE-RED-M")]
    pub sku: String,
    /// EAN-13 or UPC-A
    #[schema(example = "4006381333931")]
    pub barcode: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    #[schema(example = "Red T-shirt (M)")]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
    /// `draft` or `active`; defaults to `active`
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub cost_price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
    pub status: Option<ProductStatus>,
}

/// Product routes (requires the `products` permission)
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/export", get(export_products))
        .route("/barcode/:code", get(find_by_barcode))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/archive", post(archive_product))
        .route("/:id/barcode", post(assign_barcode))
}

/// List products
#[utoipa::path(
    get,
    path = "/products",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of products", body = Vec<Product>),
        (status = 403, description = "Missing products permission")
    )
)]
pub async fn list_products(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<Paginated<Product>>> {
    let store_id = require_permission(&actor, Permission::Products)?;
    let (products, total) = state
        .services
        .products()
        .list(store_id, filter, pagination.clone())
        .await?;
    Ok(Json(Paginated::from_params(products, &pagination, total)))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/products",
    tag = "Products",
    security(("bearer_auth" = [])),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Validation error"),
        (status = 409, description = "SKU or barcode already in use")
    )
)]
pub async fn create_product(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let store_id = require_permission(&actor, Permission::Products)?;
    let product = state
        .services
        .products()
        .create(
            store_id,
            NewProduct {
                sku: payload.sku,
                barcode: payload.barcode,
                name: payload.name,
                description: payload.description,
                category: payload.category,
                price: payload.price,
                cost_price: payload.cost_price,
                low_stock_threshold: payload
                    .low_stock_threshold
                    .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
                status: payload.status.unwrap_or(ProductStatus::Active),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Get a product
#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let store_id = require_permission(&actor, Permission::Products)?;
    Ok(Json(state.services.products().get(store_id, id).await?))
}

/// Look a product up by scanned barcode
#[utoipa::path(
    get,
    path = "/products/barcode/{code}",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "EAN-13 or UPC-A")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 400, description = "Malformed barcode"),
        (status = 404, description = "No product with this barcode")
    )
)]
pub async fn find_by_barcode(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Product>> {
    // Till operators scan too
    let store_id = require_permission(&actor, Permission::Products)
        .or_else(|_| require_permission(&actor, Permission::Pos))?;
    Ok(Json(
        state
            .services
            .products()
            .find_by_barcode(store_id, &code)
            .await?,
    ))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Barcode already in use")
    )
)]
pub async fn update_product(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> AppResult<Json<Product>> {
    let store_id = require_permission(&actor, Permission::Products)?;
    let product = state
        .services
        .products()
        .update(
            store_id,
            id,
            ProductChanges {
                name: payload.name,
                barcode: payload.barcode,
                description: payload.description,
                category: payload.category,
                price: payload.price,
                cost_price: payload.cost_price,
                low_stock_threshold: payload.low_stock_threshold,
                status: payload.status,
            },
        )
        .await?;
    Ok(Json(product))
}

/// Archive a product
#[utoipa::path(
    post,
    path = "/products/{id}/archive",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product archived", body = Product),
        (status = 409, description = "Already archived")
    )
)]
pub async fn archive_product(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let store_id = require_permission(&actor, Permission::Products)?;
    Ok(Json(state.services.products().archive(store_id, id).await?))
}

/// Delete a product that was never sold and holds no stock
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product has stock or orders")
    )
)]
pub async fn delete_product(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    let store_id = require_permission(&actor, Permission::Products)?;
    state.services.products().delete(store_id, id).await?;
    Ok(NoContent)
}

/// Generate an in-store EAN-13 for a product without one
#[utoipa::path(
    post,
    path = "/products/{id}/barcode",
    tag = "Products",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Barcode assigned", body = Product),
        (status = 409, description = "Product already has a barcode")
    )
)]
pub async fn assign_barcode(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let store_id = require_permission(&actor, Permission::Products)?;
    Ok(Json(
        state
            .services
            .products()
            .assign_barcode(store_id, id)
            .await?,
    ))
}

/// Export the catalogue as CSV
#[utoipa::path(
    get,
    path = "/products/export",
    tag = "Products",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String)
    )
)]
pub async fn export_products(
    Extension(actor): Extension<Actor>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let store_id = require_permission(&actor, Permission::Products)?;
    let csv = state.services.products().export_csv(store_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"products.csv\"",
            ),
        ],
        csv,
    ))
}
