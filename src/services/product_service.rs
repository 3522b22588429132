//! Product service - Catalogue management, barcodes and CSV export.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{barcode, product, NewProduct, Product, ProductChanges, ProductFilter, ProductStatus};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::types::PaginationParams;
use crate::with_transaction;

/// Attempts at finding an unused in-store barcode before giving up
const BARCODE_ATTEMPTS: usize = 5;

#[async_trait]
pub trait ProductService: Send + Sync {
    async fn create(&self, store_id: Uuid, product: NewProduct) -> AppResult<Product>;

    async fn get(&self, store_id: Uuid, id: Uuid) -> AppResult<Product>;

    /// Scanner lookup by barcode
    async fn find_by_barcode(&self, store_id: Uuid, code: &str) -> AppResult<Product>;

    async fn list(
        &self,
        store_id: Uuid,
        filter: ProductFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Product>, u64)>;

    async fn update(&self, store_id: Uuid, id: Uuid, changes: ProductChanges)
        -> AppResult<Product>;

    async fn archive(&self, store_id: Uuid, id: Uuid) -> AppResult<Product>;

    /// Hard delete; only for products never ordered and holding no stock
    async fn delete(&self, store_id: Uuid, id: Uuid) -> AppResult<()>;

    /// Generate and attach an in-store EAN-13
    async fn assign_barcode(&self, store_id: Uuid, id: Uuid) -> AppResult<Product>;

    /// CSV of all non-archived products
    async fn export_csv(&self, store_id: Uuid) -> AppResult<String>;
}

pub struct ProductManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> ProductManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Reject a barcode already used by another product of the store.
    async fn ensure_barcode_free(
        &self,
        store_id: Uuid,
        code: &str,
        owner: Option<Uuid>,
    ) -> AppResult<()> {
        match self.uow.products().find_by_barcode(store_id, code).await? {
            Some(existing) if Some(existing.id) != owner => {
                Err(AppError::conflict("Product with this barcode"))
            }
            _ => Ok(()),
        }
    }
}

fn check_price(price: Decimal, field: &str) -> AppResult<()> {
    if price.is_sign_negative() {
        return Err(AppError::validation(format!("{} must not be negative", field)));
    }
    Ok(())
}

fn check_threshold(threshold: i32) -> AppResult<()> {
    if threshold < 0 {
        return Err(AppError::validation("Low-stock threshold must not be negative"));
    }
    Ok(())
}

#[async_trait]
impl<U: UnitOfWork> ProductService for ProductManager<U> {
    async fn create(&self, store_id: Uuid, mut product: NewProduct) -> AppResult<Product> {
        product.sku = product.sku.trim().to_uppercase();
        if product.sku.is_empty() {
            return Err(AppError::validation("SKU is required"));
        }
        check_price(product.price, "Price")?;
        if let Some(cost) = product.cost_price {
            check_price(cost, "Cost price")?;
        }
        check_threshold(product.low_stock_threshold)?;
        if product.status == ProductStatus::Archived {
            return Err(AppError::validation("New products cannot be archived"));
        }

        if self
            .uow
            .products()
            .find_by_sku(store_id, &product.sku)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Product with this SKU"));
        }
        if let Some(code) = product.barcode.take() {
            let code = barcode::normalize(&code)?;
            self.ensure_barcode_free(store_id, &code, None).await?;
            product.barcode = Some(code);
        }

        let created = self.uow.products().create(store_id, product).await?;
        tracing::info!(store_id = %store_id, sku = %created.sku, "Product created");
        Ok(created)
    }

    async fn get(&self, store_id: Uuid, id: Uuid) -> AppResult<Product> {
        self.uow
            .products()
            .find_by_id(store_id, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn find_by_barcode(&self, store_id: Uuid, code: &str) -> AppResult<Product> {
        let code = barcode::normalize(code)?;
        self.uow
            .products()
            .find_by_barcode(store_id, &code)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn list(
        &self,
        store_id: Uuid,
        filter: ProductFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<Product>, u64)> {
        self.uow.products().list(store_id, filter, pagination).await
    }

    async fn update(
        &self,
        store_id: Uuid,
        id: Uuid,
        mut changes: ProductChanges,
    ) -> AppResult<Product> {
        if let Some(price) = changes.price {
            check_price(price, "Price")?;
        }
        if let Some(cost) = changes.cost_price {
            check_price(cost, "Cost price")?;
        }
        if let Some(threshold) = changes.low_stock_threshold {
            check_threshold(threshold)?;
        }
        if let Some(code) = changes.barcode.take() {
            let code = barcode::normalize(&code)?;
            self.ensure_barcode_free(store_id, &code, Some(id)).await?;
            changes.barcode = Some(code);
        }

        self.uow.products().update(store_id, id, changes).await
    }

    async fn archive(&self, store_id: Uuid, id: Uuid) -> AppResult<Product> {
        let product = self.get(store_id, id).await?;
        if product.status == ProductStatus::Archived {
            return Err(AppError::invalid_state("Product is already archived"));
        }

        self.uow
            .products()
            .update(
                store_id,
                id,
                ProductChanges {
                    status: Some(ProductStatus::Archived),
                    ..Default::default()
                },
            )
            .await
    }

    async fn delete(&self, store_id: Uuid, id: Uuid) -> AppResult<()> {
        with_transaction!(self.uow, |ctx| {
            let products = ctx.products();
            let product = products.lock(store_id, id).await?.ok_or(AppError::NotFound)?;

            if product.stock_quantity != 0 {
                return Err(AppError::invalid_state(
                    "Product still holds stock; adjust it to zero or archive it instead",
                ));
            }
            if products.has_orders(id).await? {
                return Err(AppError::invalid_state(
                    "Product appears on orders; archive it instead",
                ));
            }

            products.delete(store_id, id).await
        })?;

        tracing::info!(store_id = %store_id, product_id = %id, "Product deleted");
        Ok(())
    }

    async fn assign_barcode(&self, store_id: Uuid, id: Uuid) -> AppResult<Product> {
        let product = self.get(store_id, id).await?;
        if product.barcode.is_some() {
            return Err(AppError::invalid_state("Product already has a barcode"));
        }

        for _ in 0..BARCODE_ATTEMPTS {
            let seed = (Uuid::new_v4().as_u128() % u64::MAX as u128) as u64;
            let code = barcode::generate_in_store(seed);
            if self
                .uow
                .products()
                .find_by_barcode(store_id, &code)
                .await?
                .is_none()
            {
                return self
                    .uow
                    .products()
                    .update(
                        store_id,
                        id,
                        ProductChanges {
                            barcode: Some(code),
                            ..Default::default()
                        },
                    )
                    .await;
            }
        }

        Err(AppError::internal("Could not find a free in-store barcode"))
    }

    async fn export_csv(&self, store_id: Uuid) -> AppResult<String> {
        let products = self.uow.products().list_for_export(store_id).await?;
        Ok(product::to_csv(&products))
    }
}
