//! Product catalogue entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalogue lifecycle of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ProductStatus::Draft),
            "active" => Some(ProductStatus::Active),
            "archived" => Some(ProductStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product domain entity
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub store_id: Uuid,
    #[schema(example = "TEE-RED-M")]
    pub sku: String,
    #[schema(example = "4006381333931")]
    pub barcode: Option<String>,
    #[schema(example = "Red T-shirt (M)")]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[schema(value_type = String, example = "19.90")]
    pub price: Decimal,
    #[schema(value_type = Option<String>, example = "7.25")]
    pub cost_price: Option<Decimal>,
    /// Sum of stock levels across all warehouses
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Only active products can be placed on orders or sold at the till
    pub fn is_sellable(&self) -> bool {
        self.status == ProductStatus::Active
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }
}

/// Fields accepted when creating a product
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    pub cost_price: Option<Decimal>,
    pub low_stock_threshold: i32,
    pub status: ProductStatus,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub low_stock_threshold: Option<i32>,
    pub status: Option<ProductStatus>,
}

/// Catalogue filter for list queries
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductFilter {
    /// Matches name, SKU or barcode (case-insensitive)
    pub search: Option<String>,
    pub status: Option<ProductStatus>,
    pub category: Option<String>,
    /// Only products at or below their low-stock threshold
    #[serde(default)]
    pub low_stock: bool,
}

/// Render products as CSV (header + one row per product).
pub fn to_csv(products: &[Product]) -> String {
    let mut out = String::from(
        "sku,barcode,name,category,price,cost_price,stock_quantity,low_stock_threshold,status\n",
    );
    for p in products {
        let row = [
            csv_field(&p.sku),
            csv_field(p.barcode.as_deref().unwrap_or("")),
            csv_field(&p.name),
            csv_field(p.category.as_deref().unwrap_or("")),
            p.price.to_string(),
            p.cost_price.map(|c| c.to_string()).unwrap_or_default(),
            p.stock_quantity.to_string(),
            p.low_stock_threshold.to_string(),
            p.status.to_string(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field when it holds a delimiter, quote, or line break.
/// Leading formula characters are prefixed so spreadsheets treat them as text.
fn csv_field(value: &str) -> String {
    let value = if value.starts_with(['=', '+', '-', '@']) {
        format!("'{}", value)
    } else {
        value.to_string()
    };
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}
