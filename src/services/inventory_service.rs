//! Inventory service - Warehouses, stock moves and ledger reconciliation.
//!
//! Every quantity change runs in one transaction: the product row is locked
//! first, then the level row, so concurrent moves on the same product queue
//! up instead of interleaving.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::alerts::{self, LowStock};
use crate::domain::inventory::{balance_drift, level_drift, product_drift};
use crate::domain::{
    LedgerFilter, MovementKind, ReconcileReport, StockChange, StockLevel, StockMovement, Warehouse,
};
use crate::errors::{AppError, AppResult};
use crate::infra::repositories::WarehouseChanges;
use crate::infra::{TransactionContext, UnitOfWork};
use crate::jobs::Notifier;
use crate::types::PaginationParams;
use crate::with_transaction;

/// A stock movement requested by a user
#[derive(Debug, Clone)]
pub struct StockRequest {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub note: Option<String>,
    pub actor: Uuid,
}

/// Both legs of a transfer
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Transfer {
    pub outbound: StockMovement,
    pub inbound: StockMovement,
}

#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn list_warehouses(&self, store_id: Uuid) -> AppResult<Vec<Warehouse>>;

    async fn create_warehouse(
        &self,
        store_id: Uuid,
        name: String,
        location: Option<String>,
    ) -> AppResult<Warehouse>;

    /// The default warehouse cannot be deactivated; neither can one holding stock.
    async fn update_warehouse(
        &self,
        store_id: Uuid,
        id: Uuid,
        changes: WarehouseChanges,
    ) -> AppResult<Warehouse>;

    async fn set_default_warehouse(&self, store_id: Uuid, id: Uuid) -> AppResult<Warehouse>;

    /// Goods in; `quantity` must be positive
    async fn receive(&self, store_id: Uuid, request: StockRequest) -> AppResult<StockMovement>;

    /// Manual correction; `quantity` is a signed, non-zero delta
    async fn adjust(&self, store_id: Uuid, request: StockRequest) -> AppResult<StockMovement>;

    /// Move stock between two warehouses of the store
    async fn transfer(
        &self,
        store_id: Uuid,
        request: StockRequest,
        to_warehouse: Uuid,
    ) -> AppResult<Transfer>;

    async fn stock_levels(&self, store_id: Uuid, product_id: Uuid) -> AppResult<Vec<StockLevel>>;

    async fn ledger(
        &self,
        store_id: Uuid,
        filter: LedgerFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<StockMovement>, u64)>;

    /// Compare product totals with levels and levels with the ledger.
    /// With `fix`, product totals are rewritten to the sum of their levels.
    async fn reconcile(&self, store_id: Uuid, fix: bool) -> AppResult<ReconcileReport>;
}

pub struct InventoryManager<U: UnitOfWork> {
    uow: Arc<U>,
    notifier: Arc<dyn Notifier>,
}

impl<U: UnitOfWork> InventoryManager<U> {
    pub fn new(uow: Arc<U>, notifier: Arc<dyn Notifier>) -> Self {
        Self { uow, notifier }
    }

    /// Run one single-warehouse change and alert on a low-stock crossing.
    async fn single_change(
        &self,
        store_id: Uuid,
        request: StockRequest,
        kind: MovementKind,
    ) -> AppResult<StockMovement> {
        let (movement, low) = with_transaction!(self.uow, |ctx| {
            let product = ctx
                .products()
                .lock(store_id, request.product_id)
                .await?
                .ok_or(AppError::NotFound)?;
            active_warehouse(&ctx, store_id, request.warehouse_id).await?;

            let applied = ctx
                .stock()
                .apply(
                    store_id,
                    &product.sku,
                    StockChange {
                        product_id: product.id,
                        warehouse_id: request.warehouse_id,
                        delta: request.quantity,
                        kind,
                        reference: None,
                        note: request.note,
                        actor: Some(request.actor),
                    },
                )
                .await?;

            let low = LowStock::crossing(&product, product.stock_quantity, applied.product_total);
            Ok((applied.movement, low))
        })?;

        tracing::info!(
            store_id = %store_id,
            product_id = %movement.product_id,
            warehouse_id = %movement.warehouse_id,
            kind = %movement.kind,
            delta = movement.delta,
            balance = movement.balance_after,
            "Stock changed"
        );

        if let Some(low) = low {
            alerts::notify_owner(
                self.uow.as_ref(),
                self.notifier.as_ref(),
                store_id,
                alerts::low_stock(&[low]),
            )
            .await;
        }
        Ok(movement)
    }
}

/// Fetch a warehouse that can take stock moves.
pub(crate) async fn active_warehouse(
    ctx: &TransactionContext<'_>,
    store_id: Uuid,
    id: Uuid,
) -> AppResult<Warehouse> {
    let warehouse = ctx
        .warehouses()
        .find_by_id(store_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !warehouse.is_active {
        return Err(AppError::invalid_state(format!(
            "Warehouse '{}' is inactive",
            warehouse.name
        )));
    }
    Ok(warehouse)
}

#[async_trait]
impl<U: UnitOfWork> InventoryService for InventoryManager<U> {
    async fn list_warehouses(&self, store_id: Uuid) -> AppResult<Vec<Warehouse>> {
        self.uow.warehouses().list(store_id).await
    }

    async fn create_warehouse(
        &self,
        store_id: Uuid,
        name: String,
        location: Option<String>,
    ) -> AppResult<Warehouse> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Warehouse name is required"));
        }
        self.uow.warehouses().create(store_id, name, location).await
    }

    async fn update_warehouse(
        &self,
        store_id: Uuid,
        id: Uuid,
        changes: WarehouseChanges,
    ) -> AppResult<Warehouse> {
        if changes.is_active != Some(false) {
            return self.uow.warehouses().update(store_id, id, changes).await;
        }

        with_transaction!(self.uow, |ctx| {
            let warehouse = ctx
                .warehouses()
                .find_by_id(store_id, id)
                .await?
                .ok_or(AppError::NotFound)?;
            if warehouse.is_default {
                return Err(AppError::invalid_state(
                    "The default warehouse cannot be deactivated",
                ));
            }
            if ctx.stock().warehouse_has_stock(store_id, id).await? {
                return Err(AppError::invalid_state(
                    "Warehouse still holds stock; transfer it out first",
                ));
            }
            ctx.warehouses().update(store_id, id, changes).await
        })
    }

    async fn set_default_warehouse(&self, store_id: Uuid, id: Uuid) -> AppResult<Warehouse> {
        with_transaction!(self.uow, |ctx| {
            let warehouse = active_warehouse(&ctx, store_id, id).await?;
            if warehouse.is_default {
                return Ok(warehouse);
            }
            ctx.warehouses().set_default(store_id, id).await
        })
    }

    async fn receive(&self, store_id: Uuid, request: StockRequest) -> AppResult<StockMovement> {
        if request.quantity <= 0 {
            return Err(AppError::validation("Received quantity must be positive"));
        }
        self.single_change(store_id, request, MovementKind::Receive)
            .await
    }

    async fn adjust(&self, store_id: Uuid, request: StockRequest) -> AppResult<StockMovement> {
        if request.quantity == 0 {
            return Err(AppError::validation("Adjustment must not be zero"));
        }
        if request.note.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(AppError::validation("Adjustments require a reason"));
        }
        self.single_change(store_id, request, MovementKind::Adjust)
            .await
    }

    async fn transfer(
        &self,
        store_id: Uuid,
        request: StockRequest,
        to_warehouse: Uuid,
    ) -> AppResult<Transfer> {
        if request.quantity <= 0 {
            return Err(AppError::validation("Transfer quantity must be positive"));
        }
        if request.warehouse_id == to_warehouse {
            return Err(AppError::validation(
                "Source and destination warehouse must differ",
            ));
        }
        let (product_id, quantity) = (request.product_id, request.quantity);

        let transfer = with_transaction!(self.uow, |ctx| {
            let product = ctx
                .products()
                .lock(store_id, request.product_id)
                .await?
                .ok_or(AppError::NotFound)?;
            active_warehouse(&ctx, store_id, request.warehouse_id).await?;
            active_warehouse(&ctx, store_id, to_warehouse).await?;

            let reference = Some(format!("TRF-{}", Uuid::new_v4().simple()));
            let leg = |warehouse_id, delta, kind| StockChange {
                product_id: product.id,
                warehouse_id,
                delta,
                kind,
                reference: reference.clone(),
                note: request.note.clone(),
                actor: Some(request.actor),
            };

            // Lock levels in warehouse-id order
            let out_leg = leg(
                request.warehouse_id,
                -request.quantity,
                MovementKind::TransferOut,
            );
            let in_leg = leg(to_warehouse, request.quantity, MovementKind::TransferIn);
            let stock = ctx.stock();
            let (outbound, inbound) = if request.warehouse_id < to_warehouse {
                let outbound = stock.apply(store_id, &product.sku, out_leg).await?;
                let inbound = stock.apply(store_id, &product.sku, in_leg).await?;
                (outbound, inbound)
            } else {
                let inbound = stock.apply(store_id, &product.sku, in_leg).await?;
                let outbound = stock.apply(store_id, &product.sku, out_leg).await?;
                (outbound, inbound)
            };

            Ok(Transfer {
                outbound: outbound.movement,
                inbound: inbound.movement,
            })
        })?;

        tracing::info!(
            store_id = %store_id,
            product_id = %product_id,
            from = %transfer.outbound.warehouse_id,
            to = %transfer.inbound.warehouse_id,
            quantity = quantity,
            "Stock transferred"
        );
        Ok(transfer)
    }

    async fn stock_levels(&self, store_id: Uuid, product_id: Uuid) -> AppResult<Vec<StockLevel>> {
        if self
            .uow
            .products()
            .find_by_id(store_id, product_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound);
        }
        self.uow.stock().levels_for_product(store_id, product_id).await
    }

    async fn ledger(
        &self,
        store_id: Uuid,
        filter: LedgerFilter,
        pagination: PaginationParams,
    ) -> AppResult<(Vec<StockMovement>, u64)> {
        self.uow.stock().ledger(store_id, filter, pagination).await
    }

    async fn reconcile(&self, store_id: Uuid, fix: bool) -> AppResult<ReconcileReport> {
        let report = with_transaction!(self.uow, |ctx| {
            let totals = ctx.products().lock_totals(store_id).await?;
            let levels = ctx.stock().lock_levels(store_id).await?;
            let ledger = ctx.stock().ledger_totals(store_id).await?;
            let latest = ctx.stock().latest_balances(store_id).await?;

            let mut report = ReconcileReport {
                products_checked: totals.len(),
                product_drift: product_drift(&totals, &levels),
                level_drift: level_drift(&levels, &ledger),
                balance_drift: balance_drift(&levels, &latest),
                fixed: 0,
            };

            if fix {
                for drift in &report.product_drift {
                    ctx.products()
                        .set_stock_quantity(drift.product_id, drift.from_levels)
                        .await?;
                }
                report.fixed = report.product_drift.len();
            }
            Ok(report)
        })?;

        if report.is_clean() {
            tracing::info!(store_id = %store_id, products = report.products_checked, "Stock reconciled, no drift");
        } else {
            tracing::warn!(
                store_id = %store_id,
                product_drift = report.product_drift.len(),
                level_drift = report.level_drift.len(),
                balance_drift = report.balance_drift.len(),
                fixed = report.fixed,
                "Stock drift detected"
            );
        }
        Ok(report)
    }
}
