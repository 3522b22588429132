//! Warehouses, stock levels, and the stock movement ledger.
//!
//! Every change to a stock level is paired with exactly one ledger entry
//! carrying the signed delta and the resulting balance. Reconciliation
//! compares the three views of stock (product total, per-warehouse level,
//! ledger sum) and reports where they disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Warehouse (stock location) owned by a store
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Warehouse {
    pub id: Uuid,
    pub store_id: Uuid,
    #[schema(example = "Main warehouse")]
    pub name: String,
    pub location: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quantity of one product held in one warehouse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

/// Reason a ledger entry was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Receive,
    Adjust,
    TransferOut,
    TransferIn,
    OrderReserve,
    OrderCancel,
    OrderReturn,
    PosSale,
    PosRefund,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Receive => "receive",
            MovementKind::Adjust => "adjust",
            MovementKind::TransferOut => "transfer_out",
            MovementKind::TransferIn => "transfer_in",
            MovementKind::OrderReserve => "order_reserve",
            MovementKind::OrderCancel => "order_cancel",
            MovementKind::OrderReturn => "order_return",
            MovementKind::PosSale => "pos_sale",
            MovementKind::PosRefund => "pos_refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "receive" => MovementKind::Receive,
            "adjust" => MovementKind::Adjust,
            "transfer_out" => MovementKind::TransferOut,
            "transfer_in" => MovementKind::TransferIn,
            "order_reserve" => MovementKind::OrderReserve,
            "order_cancel" => MovementKind::OrderCancel,
            "order_return" => MovementKind::OrderReturn,
            "pos_sale" => MovementKind::PosSale,
            "pos_refund" => MovementKind::PosRefund,
            _ => return None,
        })
    }

    /// Sign the kind forces on its delta (`0` = either sign, adjustments).
    pub fn direction(&self) -> i32 {
        match self {
            MovementKind::Receive
            | MovementKind::TransferIn
            | MovementKind::OrderCancel
            | MovementKind::OrderReturn
            | MovementKind::PosRefund => 1,
            MovementKind::TransferOut | MovementKind::OrderReserve | MovementKind::PosSale => -1,
            MovementKind::Adjust => 0,
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockMovement {
    pub id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub delta: i32,
    pub balance_after: i32,
    pub kind: MovementKind,
    /// Order number or transfer id the entry belongs to
    pub reference: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Ledger query filter
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LedgerFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub kind: Option<MovementKind>,
    /// Exact order number or transfer reference
    pub reference: Option<String>,
}

/// A pending change to one stock level
#[derive(Debug, Clone)]
pub struct StockChange {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub delta: i32,
    pub kind: MovementKind,
    pub reference: Option<String>,
    pub note: Option<String>,
    pub actor: Option<Uuid>,
}

impl StockChange {
    /// Validate the delta against the kind and compute the new balance.
    pub fn apply_to(&self, current: i32) -> AppResult<i32> {
        if self.delta == 0 {
            return Err(AppError::validation("Stock change must not be zero"));
        }
        let direction = self.kind.direction();
        if direction != 0 && self.delta.signum() != direction {
            return Err(AppError::internal(format!(
                "{} movement with delta {}",
                self.kind, self.delta
            )));
        }
        let next = current
            .checked_add(self.delta)
            .ok_or_else(|| AppError::validation("Stock quantity out of range"))?;
        if next < 0 {
            return Err(AppError::InsufficientStock {
                sku: self.product_id.to_string(),
                requested: -self.delta,
                available: current,
            });
        }
        Ok(next)
    }
}

/// Ledger totals for one (product, warehouse) pair
#[derive(Debug, Clone)]
pub struct LedgerTotal {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub delta_sum: i64,
}

/// Balance written on the newest ledger entry of a (product, warehouse) pair
#[derive(Debug, Clone)]
pub struct LatestBalance {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub balance_after: i32,
}

/// Product-level disagreement between the cached total and its levels
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDrift {
    pub product_id: Uuid,
    pub sku: String,
    pub recorded: i32,
    pub from_levels: i32,
}

/// Level-level disagreement between the stored quantity and the ledger
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LevelDrift {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub recorded: i32,
    pub from_ledger: i64,
}

/// A level whose quantity differs from the balance on its newest ledger entry
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceDrift {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub recorded: i32,
    pub last_balance: i32,
}

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ReconcileReport {
    pub products_checked: usize,
    pub product_drift: Vec<ProductDrift>,
    pub level_drift: Vec<LevelDrift>,
    pub balance_drift: Vec<BalanceDrift>,
    /// Product totals rewritten from their levels
    pub fixed: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.product_drift.is_empty()
            && self.level_drift.is_empty()
            && self.balance_drift.is_empty()
    }
}

/// Compare product totals against level sums.
///
/// `products` is `(id, sku, recorded_total)`; levels missing for a product
/// count as zero.
pub fn product_drift(
    products: &[(Uuid, String, i32)],
    levels: &[StockLevel],
) -> Vec<ProductDrift> {
    products
        .iter()
        .filter_map(|(id, sku, recorded)| {
            let from_levels: i32 = levels
                .iter()
                .filter(|l| l.product_id == *id)
                .map(|l| l.quantity)
                .sum();
            (from_levels != *recorded).then(|| ProductDrift {
                product_id: *id,
                sku: sku.clone(),
                recorded: *recorded,
                from_levels,
            })
        })
        .collect()
}

/// Compare each stock level against the sum of its ledger deltas.
///
/// Ledger totals without a matching level are reported against a recorded
/// quantity of zero.
pub fn level_drift(levels: &[StockLevel], ledger: &[LedgerTotal]) -> Vec<LevelDrift> {
    let mut drift: Vec<LevelDrift> = levels
        .iter()
        .filter_map(|level| {
            let from_ledger = ledger
                .iter()
                .find(|t| t.product_id == level.product_id && t.warehouse_id == level.warehouse_id)
                .map(|t| t.delta_sum)
                .unwrap_or(0);
            (from_ledger != level.quantity as i64).then(|| LevelDrift {
                product_id: level.product_id,
                warehouse_id: level.warehouse_id,
                recorded: level.quantity,
                from_ledger,
            })
        })
        .collect();

    drift.extend(
        ledger
            .iter()
            .filter(|t| t.delta_sum != 0)
            .filter(|t| {
                !levels
                    .iter()
                    .any(|l| l.product_id == t.product_id && l.warehouse_id == t.warehouse_id)
            })
            .map(|t| LevelDrift {
                product_id: t.product_id,
                warehouse_id: t.warehouse_id,
                recorded: 0,
                from_ledger: t.delta_sum,
            }),
    );

    drift
}

/// Compare each level with the balance recorded by its newest ledger entry.
///
/// Pairs without ledger entries are left to [`level_drift`]; a missing level
/// counts as zero.
pub fn balance_drift(levels: &[StockLevel], latest: &[LatestBalance]) -> Vec<BalanceDrift> {
    latest
        .iter()
        .filter_map(|last| {
            let recorded = levels
                .iter()
                .find(|l| l.product_id == last.product_id && l.warehouse_id == last.warehouse_id)
                .map(|l| l.quantity)
                .unwrap_or(0);
            (recorded != last.balance_after).then(|| BalanceDrift {
                product_id: last.product_id,
                warehouse_id: last.warehouse_id,
                recorded,
                last_balance: last.balance_after,
            })
        })
        .collect()
}
