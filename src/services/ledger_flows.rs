//! Transactional stock and order flows run against a SeaORM mock database.
//!
//! Query results are consumed in the order the repositories issue them, so
//! each test lists the rows for every SELECT and RETURNING in sequence and
//! then inspects the statements the flow committed or rolled back.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use sea_orm::{
    DatabaseBackend, DatabaseConnection, IntoMockRow, MockDatabase, MockExecResult, MockRow,
    Statement, Value,
};
use uuid::Uuid;

use super::{
    InventoryManager, InventoryService, OrderManager, OrderService, PlaceOrder, StockRequest,
};
use crate::domain::order::LineRequest;
use crate::domain::{Customer, OrderStatus};
use crate::errors::AppError;
use crate::infra::repositories::entities::{
    order, order_item, order_status_history, product, promotion, stock_level, stock_movement,
    warehouse,
};
use crate::infra::Persistence;
use crate::jobs::MockNotifier;

const STORE: Uuid = Uuid::from_u128(0x5700);
const PRODUCT: Uuid = Uuid::from_u128(0x9900);
const WAREHOUSE_A: Uuid = Uuid::from_u128(1);
const WAREHOUSE_B: Uuid = Uuid::from_u128(2);

fn database(queries: Vec<Vec<MockRow>>, execs: Vec<MockExecResult>) -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(queries)
        .append_exec_results(execs)
        .into_connection()
}

fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

fn row(model: impl IntoMockRow) -> Vec<MockRow> {
    vec![model.into_mock_row()]
}

fn inventory(db: &DatabaseConnection) -> InventoryManager<Persistence> {
    InventoryManager::new(
        Arc::new(Persistence::new(db.clone())),
        Arc::new(MockNotifier::new()),
    )
}

fn orders(db: &DatabaseConnection) -> OrderManager<Persistence> {
    OrderManager::new(
        Arc::new(Persistence::new(db.clone())),
        Arc::new(MockNotifier::new()),
    )
}

fn product_model(stock_quantity: i32, low_stock_threshold: i32) -> product::Model {
    let now = Utc::now();
    product::Model {
        id: PRODUCT,
        store_id: STORE,
        sku: "MUG-01".to_string(),
        barcode: None,
        name: "Stoneware mug".to_string(),
        description: None,
        category: None,
        price: dec!(12.50),
        cost_price: None,
        stock_quantity,
        low_stock_threshold,
        status: "active".to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn warehouse_model(id: Uuid, is_default: bool) -> warehouse::Model {
    let now = Utc::now();
    warehouse::Model {
        id,
        store_id: STORE,
        name: format!("Warehouse {}", id.as_u128()),
        location: None,
        is_default,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn level(warehouse_id: Uuid, quantity: i32) -> stock_level::Model {
    stock_level::Model {
        id: Uuid::from_u128(0x1e00 + warehouse_id.as_u128()),
        store_id: STORE,
        product_id: PRODUCT,
        warehouse_id,
        quantity,
        updated_at: Utc::now(),
    }
}

fn movement(
    warehouse_id: Uuid,
    delta: i32,
    balance_after: i32,
    kind: &str,
) -> stock_movement::Model {
    stock_movement::Model {
        id: Uuid::new_v4(),
        store_id: STORE,
        product_id: PRODUCT,
        warehouse_id,
        delta,
        balance_after,
        kind: kind.to_string(),
        reference: None,
        note: None,
        created_by: None,
        created_at: Utc::now(),
    }
}

/// Single-column row for the product total read back after each change
fn total(stock_quantity: i32) -> Vec<MockRow> {
    let row = BTreeMap::from([("stock_quantity", Value::Int(Some(stock_quantity)))]);
    vec![row.into_mock_row()]
}

fn promotion_model() -> promotion::Model {
    let now = Utc::now();
    promotion::Model {
        id: Uuid::from_u128(0x7700),
        store_id: STORE,
        code: "SUMMER10".to_string(),
        name: "Summer".to_string(),
        kind: "percentage".to_string(),
        value: dec!(10),
        min_order_amount: None,
        max_uses: Some(100),
        used_count: 4,
        starts_at: now - Duration::days(1),
        ends_at: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn order_model(status: &str, promotion_id: Option<Uuid>) -> order::Model {
    let now = Utc::now();
    order::Model {
        id: Uuid::from_u128(0x0d00),
        store_id: STORE,
        order_number: "ORD-20240601-00000D00".to_string(),
        channel: "online".to_string(),
        status: status.to_string(),
        warehouse_id: WAREHOUSE_A,
        customer_name: "Alex Buyer".to_string(),
        customer_email: None,
        customer_phone: None,
        shipping_address: None,
        subtotal: dec!(25.00),
        discount_total: dec!(2.50),
        total: dec!(22.50),
        promotion_id,
        promotion_code: promotion_id.map(|_| "SUMMER10".to_string()),
        payment_method: None,
        amount_tendered: None,
        change_due: None,
        note: None,
        created_by: None,
        created_at: now,
        updated_at: now,
    }
}

fn item_model() -> order_item::Model {
    order_item::Model {
        id: Uuid::from_u128(0x1700),
        order_id: Uuid::from_u128(0x0d00),
        product_id: PRODUCT,
        sku: "MUG-01".to_string(),
        name: "Stoneware mug".to_string(),
        unit_price: dec!(12.50),
        quantity: 2,
        line_total: dec!(25.00),
    }
}

fn history_model(from: Option<&str>, to: &str) -> order_status_history::Model {
    order_status_history::Model {
        id: Uuid::new_v4(),
        order_id: Uuid::from_u128(0x0d00),
        from_status: from.map(String::from),
        to_status: to.to_string(),
        changed_by: None,
        note: None,
        created_at: Utc::now(),
    }
}

/// Every statement the mock saw, transaction markers included
fn logged(db: DatabaseConnection) -> Vec<Statement> {
    db.into_transaction_log()
        .iter()
        .flat_map(|t| t.statements().to_vec())
        .collect()
}

fn matching<'a>(log: &'a [Statement], prefix: &str) -> Vec<&'a Statement> {
    log.iter().filter(|s| s.sql.starts_with(prefix)).collect()
}

fn values(statement: &Statement) -> Vec<Value> {
    statement
        .values
        .as_ref()
        .map(|v| v.0.clone())
        .unwrap_or_default()
}

fn has(statement: &Statement, value: impl Into<Value>) -> bool {
    values(statement).contains(&value.into())
}

fn string_starting(statement: &Statement, prefix: &str) -> Option<String> {
    values(statement).into_iter().find_map(|v| match v {
        Value::String(Some(s)) if s.starts_with(prefix) => Some(s.to_string()),
        _ => None,
    })
}

const LEVEL_UPDATE: &str = "UPDATE \"stock_levels\"";
const PRODUCT_UPDATE: &str = "UPDATE \"products\"";
const MOVEMENT_INSERT: &str = "INSERT INTO \"stock_movements\"";
const PROMOTION_UPDATE: &str = "UPDATE \"promotions\"";

fn transfer_request(quantity: i32) -> StockRequest {
    StockRequest {
        product_id: PRODUCT,
        warehouse_id: WAREHOUSE_A,
        quantity,
        note: None,
        actor: Uuid::from_u128(0xacc),
    }
}

#[tokio::test]
async fn test_transfer_writes_both_legs_in_one_transaction() {
    let db = database(
        vec![
            row(product_model(9, 0)),
            row(warehouse_model(WAREHOUSE_A, true)),
            row(warehouse_model(WAREHOUSE_B, false)),
            row(level(WAREHOUSE_A, 5)),
            row(level(WAREHOUSE_A, 3)),
            total(7),
            row(movement(WAREHOUSE_A, -2, 3, "transfer_out")),
            row(level(WAREHOUSE_B, 4)),
            row(level(WAREHOUSE_B, 6)),
            total(9),
            row(movement(WAREHOUSE_B, 2, 6, "transfer_in")),
        ],
        vec![exec(1), exec(1)],
    );

    let transfer = inventory(&db)
        .transfer(STORE, transfer_request(2), WAREHOUSE_B)
        .await
        .unwrap();
    assert_eq!(transfer.outbound.balance_after, 3);
    assert_eq!(transfer.inbound.balance_after, 6);

    let log = logged(db);
    assert_eq!(log.first().map(|s| s.sql.as_str()), Some("BEGIN"));
    assert_eq!(log.last().map(|s| s.sql.as_str()), Some("COMMIT"));

    // Levels and the product total move by the same delta per leg
    let levels = matching(&log, LEVEL_UPDATE);
    assert_eq!(levels.len(), 2);
    assert!(has(levels[0], 3));
    assert!(has(levels[1], 6));

    let totals = matching(&log, PRODUCT_UPDATE);
    assert_eq!(totals.len(), 2);
    assert!(has(totals[0], -2));
    assert!(has(totals[1], 2));

    // One ledger row per leg, sharing the transfer reference
    let entries = matching(&log, MOVEMENT_INSERT);
    assert_eq!(entries.len(), 2);
    assert!(has(entries[0], -2) && has(entries[0], 3) && has(entries[0], "transfer_out"));
    assert!(has(entries[1], 2) && has(entries[1], 6) && has(entries[1], "transfer_in"));
    let reference = string_starting(entries[0], "TRF-");
    assert!(reference.is_some());
    assert_eq!(reference, string_starting(entries[1], "TRF-"));
}

#[tokio::test]
async fn test_transfer_short_of_stock_rolls_back_untouched() {
    let db = database(
        vec![
            row(product_model(1, 0)),
            row(warehouse_model(WAREHOUSE_A, true)),
            row(warehouse_model(WAREHOUSE_B, false)),
            row(level(WAREHOUSE_A, 1)),
        ],
        vec![],
    );

    let result = inventory(&db)
        .transfer(STORE, transfer_request(2), WAREHOUSE_B)
        .await;
    match result {
        Err(AppError::InsufficientStock {
            sku,
            requested,
            available,
        }) => {
            assert_eq!(sku, "MUG-01");
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("expected insufficient stock, got {:?}", other.map(|_| ())),
    }

    let log = logged(db);
    assert_eq!(log.last().map(|s| s.sql.as_str()), Some("ROLLBACK"));
    assert!(log
        .iter()
        .all(|s| !s.sql.starts_with("UPDATE") && !s.sql.starts_with("INSERT")));
}

#[tokio::test]
async fn test_receive_creates_missing_level_before_booking() {
    let db = database(
        vec![
            row(product_model(0, 0)),
            row(warehouse_model(WAREHOUSE_B, false)),
            Vec::new(),
            row(level(WAREHOUSE_B, 0)),
            row(level(WAREHOUSE_B, 5)),
            total(5),
            row(movement(WAREHOUSE_B, 5, 5, "receive")),
        ],
        vec![exec(1), exec(1)],
    );

    let movement = inventory(&db)
        .receive(
            STORE,
            StockRequest {
                warehouse_id: WAREHOUSE_B,
                ..transfer_request(5)
            },
        )
        .await
        .unwrap();
    assert_eq!(movement.balance_after, 5);

    let log = logged(db);
    assert_eq!(log.last().map(|s| s.sql.as_str()), Some("COMMIT"));
    let created = matching(&log, "INSERT INTO \"stock_levels\"");
    assert_eq!(created.len(), 1);
    assert!(created[0].sql.contains("ON CONFLICT"));
    assert!(has(created[0], 0));

    let entries = matching(&log, MOVEMENT_INSERT);
    assert_eq!(entries.len(), 1);
    assert!(has(entries[0], 5) && has(entries[0], "receive"));
    assert_eq!(matching(&log, PRODUCT_UPDATE).len(), 1);
}

#[tokio::test]
async fn test_place_order_reserves_stock_and_uses_promotion() {
    let db = database(
        vec![
            row(warehouse_model(WAREHOUSE_A, true)),
            row(warehouse_model(WAREHOUSE_A, true)),
            row(product_model(5, 1)),
            row(promotion_model()),
            row(order_model("pending", Some(promotion_model().id))),
            row(item_model()),
            row(level(WAREHOUSE_A, 5)),
            row(level(WAREHOUSE_A, 3)),
            total(3),
            row(movement(WAREHOUSE_A, -2, 3, "order_reserve")),
            row(history_model(None, "pending")),
            // Owner lookup for the new-order alert finds nobody
            Vec::new(),
        ],
        vec![exec(1), exec(1)],
    );

    let order = orders(&db)
        .place_order(
            STORE,
            Uuid::from_u128(0xacc),
            PlaceOrder {
                customer: Customer {
                    name: "Alex Buyer".to_string(),
                    ..Default::default()
                },
                items: vec![LineRequest {
                    product_id: PRODUCT,
                    quantity: 2,
                }],
                warehouse_id: None,
                promotion_code: Some("summer10".to_string()),
                note: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    let log = logged(db);
    assert!(log.iter().any(|s| s.sql == "COMMIT"));

    let promotions = matching(&log, PROMOTION_UPDATE);
    assert_eq!(promotions.len(), 1);
    assert!(promotions[0].sql.contains("\"used_count\" +"));

    let header = matching(&log, "INSERT INTO \"orders\"");
    assert_eq!(header.len(), 1);
    assert!(has(header[0], dec!(25.00)));
    assert!(has(header[0], dec!(2.50)));
    assert!(has(header[0], dec!(22.50)));
    assert!(has(header[0], "SUMMER10"));

    let entries = matching(&log, MOVEMENT_INSERT);
    assert_eq!(entries.len(), 1);
    assert!(has(entries[0], -2) && has(entries[0], 3) && has(entries[0], "order_reserve"));
    assert_eq!(
        string_starting(entries[0], "ORD-"),
        string_starting(header[0], "ORD-")
    );

    let history = matching(&log, "INSERT INTO \"order_status_history\"");
    assert_eq!(history.len(), 1);
    assert!(has(history[0], "pending"));
}

#[tokio::test]
async fn test_cancel_restocks_and_releases_one_promotion_use() {
    let promotion_id = Uuid::from_u128(0x7700);
    let db = database(
        vec![
            row(order_model("pending", Some(promotion_id))),
            row(item_model()),
            row(product_model(3, 1)),
            row(level(WAREHOUSE_A, 3)),
            row(level(WAREHOUSE_A, 5)),
            total(5),
            row(movement(WAREHOUSE_A, 2, 5, "order_cancel")),
            row(history_model(Some("pending"), "cancelled")),
        ],
        vec![exec(1), exec(1), exec(1)],
    );

    let order = orders(&db)
        .transition(
            STORE,
            Uuid::from_u128(0xacc),
            Uuid::from_u128(0x0d00),
            OrderStatus::Cancelled,
            Some("Customer changed their mind".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    let log = logged(db);
    assert_eq!(log.last().map(|s| s.sql.as_str()), Some("COMMIT"));

    let entries = matching(&log, MOVEMENT_INSERT);
    assert_eq!(entries.len(), 1);
    assert!(has(entries[0], 2) && has(entries[0], 5) && has(entries[0], "order_cancel"));
    assert!(has(entries[0], "ORD-20240601-00000D00"));

    let totals = matching(&log, PRODUCT_UPDATE);
    assert_eq!(totals.len(), 1);
    assert!(has(totals[0], 2));

    let promotions = matching(&log, PROMOTION_UPDATE);
    assert_eq!(promotions.len(), 1);
    assert!(promotions[0].sql.contains("GREATEST"));
    assert!(has(promotions[0], promotion_id));

    let status = matching(&log, "UPDATE \"orders\"");
    assert_eq!(status.len(), 1);
    assert!(has(status[0], "cancelled"));
}

#[tokio::test]
async fn test_cancel_of_shipped_order_is_refused_without_writes() {
    let db = database(
        vec![row(order_model("shipped", None)), row(item_model())],
        vec![],
    );

    let result = orders(&db)
        .transition(
            STORE,
            Uuid::from_u128(0xacc),
            Uuid::from_u128(0x0d00),
            OrderStatus::Cancelled,
            None,
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));

    let log = logged(db);
    assert_eq!(log.last().map(|s| s.sql.as_str()), Some("ROLLBACK"));
    assert!(matching(&log, MOVEMENT_INSERT).is_empty());
}

/// Aggregate rows are read by position, so keys sort in column order
fn ledger_sum(warehouse_id: Uuid, delta_sum: i64) -> MockRow {
    BTreeMap::from([
        ("a_product_id", Value::from(PRODUCT)),
        ("b_warehouse_id", Value::from(warehouse_id)),
        ("c_delta_sum", Value::BigInt(Some(delta_sum))),
    ])
    .into_mock_row()
}

fn latest(warehouse_id: Uuid, balance_after: i32) -> MockRow {
    BTreeMap::from([
        ("product_id", Value::from(PRODUCT)),
        ("warehouse_id", Value::from(warehouse_id)),
        ("balance_after", Value::Int(Some(balance_after))),
    ])
    .into_mock_row()
}

#[tokio::test]
async fn test_reconcile_rewrites_drifted_total_from_levels() {
    let db = database(
        vec![
            row(product_model(7, 0)),
            vec![
                level(WAREHOUSE_A, 5).into_mock_row(),
                level(WAREHOUSE_B, 3).into_mock_row(),
            ],
            vec![ledger_sum(WAREHOUSE_A, 5), ledger_sum(WAREHOUSE_B, 3)],
            vec![latest(WAREHOUSE_A, 5), latest(WAREHOUSE_B, 2)],
        ],
        vec![exec(1)],
    );

    let report = inventory(&db).reconcile(STORE, true).await.unwrap();
    assert_eq!(report.products_checked, 1);
    assert_eq!(report.product_drift.len(), 1);
    assert_eq!(report.product_drift[0].recorded, 7);
    assert_eq!(report.product_drift[0].from_levels, 8);
    assert!(report.level_drift.is_empty());
    assert_eq!(report.balance_drift.len(), 1);
    assert_eq!(report.balance_drift[0].warehouse_id, WAREHOUSE_B);
    assert_eq!(report.balance_drift[0].last_balance, 2);
    assert_eq!(report.fixed, 1);

    let log = logged(db);
    let rewrites = matching(&log, PRODUCT_UPDATE);
    assert_eq!(rewrites.len(), 1);
    assert!(has(rewrites[0], 8));
    assert!(has(rewrites[0], PRODUCT));
    assert_eq!(log.last().map(|s| s.sql.as_str()), Some("COMMIT"));
}
