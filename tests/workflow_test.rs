//! Order and stock workflow tests.
//!
//! Walks the pure business rules through realistic sequences: pricing,
//! discounting, reserving stock, cancelling and reconciling the ledger.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use seller_panel::domain::barcode;
use seller_panel::domain::inventory::{level_drift, product_drift, LedgerTotal};
use seller_panel::domain::order::{
    order_number, plan_transition, subtotal, validate_lines, LineRequest, PricedLine,
};
use seller_panel::domain::pos::settle;
use seller_panel::domain::{
    Channel, Customer, DailySummary, MovementKind, Order, OrderStatus, PaymentMethod, Promotion,
    PromotionKind, StockChange, StockLevel,
};
use seller_panel::errors::AppError;

fn promotion(kind: PromotionKind, value: Decimal) -> Promotion {
    let now = Utc::now();
    Promotion {
        id: Uuid::new_v4(),
        store_id: Uuid::new_v4(),
        code: "SUMMER10".to_string(),
        name: "Summer sale".to_string(),
        kind,
        value,
        min_order_amount: Some(dec!(30)),
        max_uses: Some(100),
        used_count: 0,
        starts_at: now - chrono::Duration::days(1),
        ends_at: Some(now + chrono::Duration::days(30)),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn change(product: Uuid, warehouse: Uuid, delta: i32, kind: MovementKind) -> StockChange {
    StockChange {
        product_id: product,
        warehouse_id: warehouse,
        delta,
        kind,
        reference: Some("ORD-20240601-1A2B3C4D".to_string()),
        note: None,
        actor: None,
    }
}

fn pos_order(total: Decimal, status: OrderStatus, method: PaymentMethod) -> Order {
    let now = Utc::now();
    Order {
        id: Uuid::new_v4(),
        store_id: Uuid::new_v4(),
        order_number: "POS-20240601-00000000".to_string(),
        channel: Channel::Pos,
        status,
        warehouse_id: Uuid::new_v4(),
        customer: Customer::default(),
        subtotal: total,
        discount_total: Decimal::ZERO,
        total,
        promotion_id: None,
        promotion_code: None,
        payment_method: Some(method),
        amount_tendered: Some(total),
        change_due: Some(Decimal::ZERO),
        note: None,
        created_by: None,
        items: vec![],
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_place_then_cancel_restores_stock_and_ledger() {
    let warehouse = Uuid::new_v4();
    let shirt = Uuid::new_v4();
    let mug = Uuid::new_v4();

    let lines = [
        LineRequest { product_id: shirt, quantity: 2 },
        LineRequest { product_id: mug, quantity: 1 },
    ];
    validate_lines(&lines).unwrap();

    let priced = vec![
        PricedLine {
            product_id: shirt,
            sku: "TEE-RED-M".to_string(),
            name: "Red tee".to_string(),
            unit_price: dec!(12.50),
            quantity: 2,
        },
        PricedLine {
            product_id: mug,
            sku: "MUG-01".to_string(),
            name: "Mug".to_string(),
            unit_price: dec!(15.00),
            quantity: 1,
        },
    ];
    let subtotal = subtotal(&priced);
    assert_eq!(subtotal, dec!(40.00));

    let promo = promotion(PromotionKind::Percentage, dec!(10));
    promo.check_applicable(subtotal, Utc::now()).unwrap();
    let discount = promo.discount_for(subtotal);
    assert_eq!(subtotal - discount, dec!(36.00));

    // Stock received, then reserved by the order
    let mut shirt_qty = change(shirt, warehouse, 5, MovementKind::Receive).apply_to(0).unwrap();
    let mut mug_qty = change(mug, warehouse, 1, MovementKind::Receive).apply_to(0).unwrap();
    let reserve = Channel::Online.sale_movement();
    shirt_qty = change(shirt, warehouse, -2, reserve).apply_to(shirt_qty).unwrap();
    mug_qty = change(mug, warehouse, -1, reserve).apply_to(mug_qty).unwrap();
    assert_eq!((shirt_qty, mug_qty), (3, 0));

    // Cancelling puts everything back and frees the promotion use
    let plan = plan_transition(OrderStatus::Pending, OrderStatus::Cancelled).unwrap();
    assert!(plan.release_promotion);
    let restock = plan.restock.unwrap();
    shirt_qty = change(shirt, warehouse, 2, restock).apply_to(shirt_qty).unwrap();
    mug_qty = change(mug, warehouse, 1, restock).apply_to(mug_qty).unwrap();
    assert_eq!((shirt_qty, mug_qty), (5, 1));

    let now = Utc::now();
    let levels = vec![
        StockLevel { product_id: shirt, warehouse_id: warehouse, quantity: shirt_qty, updated_at: now },
        StockLevel { product_id: mug, warehouse_id: warehouse, quantity: mug_qty, updated_at: now },
    ];
    let ledger = vec![
        LedgerTotal { product_id: shirt, warehouse_id: warehouse, delta_sum: 5 - 2 + 2 },
        LedgerTotal { product_id: mug, warehouse_id: warehouse, delta_sum: 1 - 1 + 1 },
    ];
    assert!(level_drift(&levels, &ledger).is_empty());

    let products = vec![
        (shirt, "TEE-RED-M".to_string(), 5),
        (mug, "MUG-01".to_string(), 1),
    ];
    assert!(product_drift(&products, &levels).is_empty());
}

#[test]
fn test_second_order_cannot_oversell() {
    let warehouse = Uuid::new_v4();
    let mug = Uuid::new_v4();

    let remaining = change(mug, warehouse, -1, MovementKind::OrderReserve)
        .apply_to(1)
        .unwrap();
    let result = change(mug, warehouse, -1, MovementKind::OrderReserve).apply_to(remaining);

    match result {
        Err(AppError::InsufficientStock { requested, available, .. }) => {
            assert_eq!(requested, 1);
            assert_eq!(available, 0);
        }
        other => panic!("expected insufficient stock, got {:?}", other),
    }
}

#[test]
fn test_drift_detected_when_level_edited_outside_ledger() {
    let warehouse = Uuid::new_v4();
    let product = Uuid::new_v4();
    let levels = vec![StockLevel {
        product_id: product,
        warehouse_id: warehouse,
        quantity: 7,
        updated_at: Utc::now(),
    }];
    let ledger = vec![LedgerTotal {
        product_id: product,
        warehouse_id: warehouse,
        delta_sum: 4,
    }];

    let drift = level_drift(&levels, &ledger);
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].recorded, 7);
    assert_eq!(drift[0].from_ledger, 4);
}

#[test]
fn test_full_online_lifecycle_then_return() {
    use OrderStatus::*;

    let steps = [
        (Pending, Confirmed),
        (Confirmed, Processing),
        (Processing, Shipped),
        (Shipped, Delivered),
    ];
    for (from, to) in steps {
        let plan = plan_transition(from, to).unwrap();
        assert!(plan.restock.is_none(), "{} -> {}", from, to);
    }

    let plan = plan_transition(Delivered, Returned).unwrap();
    assert_eq!(plan.restock, Some(MovementKind::OrderReturn));
    assert!(!plan.release_promotion);
    assert!(Returned.is_terminal());
    assert!(plan_transition(Returned, Pending).is_err());
}

#[test]
fn test_shipped_order_cannot_be_cancelled() {
    let err = plan_transition(OrderStatus::Shipped, OrderStatus::Cancelled).unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[test]
fn test_promotion_limits() {
    let promo = promotion(PromotionKind::Percentage, dec!(10));
    assert!(promo.check_applicable(dec!(20), Utc::now()).is_err());

    let exhausted = Promotion {
        used_count: 100,
        ..promotion(PromotionKind::Percentage, dec!(10))
    };
    assert!(exhausted.check_applicable(dec!(50), Utc::now()).is_err());

    let fixed = promotion(PromotionKind::FixedAmount, dec!(50));
    assert_eq!(fixed.discount_for(dec!(40)), dec!(40));
}

#[test]
fn test_pos_sale_and_daily_summary() {
    let settlement = settle(PaymentMethod::Cash, dec!(36.00), Some(dec!(50))).unwrap();
    assert_eq!(settlement.change, dec!(14.00));
    assert!(settle(PaymentMethod::Cash, dec!(36.00), Some(dec!(20))).is_err());

    let plan = plan_transition(OrderStatus::initial(Channel::Pos), OrderStatus::Refunded).unwrap();
    assert_eq!(plan.restock, Some(MovementKind::PosRefund));

    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let orders = vec![
        pos_order(dec!(36.00), OrderStatus::Completed, PaymentMethod::Cash),
        pos_order(dec!(10.00), OrderStatus::Refunded, PaymentMethod::Card),
        pos_order(dec!(4.00), OrderStatus::Completed, PaymentMethod::Cash),
    ];
    let summary = DailySummary::from_orders(date, &orders);

    assert_eq!(summary.sales_count, 3);
    assert_eq!(summary.gross, dec!(50.00));
    assert_eq!(summary.refund_count, 1);
    assert_eq!(summary.net, dec!(40.00));
    assert_eq!(summary.by_payment_method.len(), 2);
    assert_eq!(summary.by_payment_method[1].method, PaymentMethod::Cash);
    assert_eq!(summary.by_payment_method[1].total, dec!(40.00));
}

#[test]
fn test_order_number_and_in_store_barcode() {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
    let id = Uuid::parse_str("1a2b3c4d-0000-0000-0000-000000000000").unwrap();
    assert_eq!(order_number(Channel::Pos, at, id), "POS-20240601-1A2B3C4D");

    let code = barcode::generate_in_store(42);
    assert!(code.starts_with("200"));
    assert_eq!(code.len(), 13);
    assert!(barcode::is_valid(&code));
}
