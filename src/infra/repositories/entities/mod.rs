//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.
//! Enum-like columns are stored as text; conversions to domain types fail
//! with an internal error when a row holds an unknown value.

pub mod conversation;
pub mod message;
pub mod order;
pub mod order_item;
pub mod order_status_history;
pub mod product;
pub mod promotion;
pub mod stock_level;
pub mod stock_movement;
pub mod store;
pub mod user;
pub mod warehouse;

use crate::errors::{AppError, AppResult};

/// Parse a text column into a domain enum.
pub(crate) fn parse_column<T>(
    value: &str,
    column: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> AppResult<T> {
    parse(value).ok_or_else(|| AppError::internal(format!("Unknown {} value '{}'", column, value)))
}
