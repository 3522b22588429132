//! HTTP request handlers.

pub mod auth_handler;
pub mod inventory_handler;
pub mod message_handler;
pub mod order_handler;
pub mod pos_handler;
pub mod product_handler;
pub mod promotion_handler;
pub mod report_handler;
pub mod staff_handler;

pub use auth_handler::{auth_routes, session_routes};
pub use inventory_handler::inventory_routes;
pub use message_handler::message_routes;
pub use order_handler::order_routes;
pub use pos_handler::pos_routes;
pub use product_handler::product_routes;
pub use promotion_handler::promotion_routes;
pub use report_handler::report_routes;
pub use staff_handler::{account_routes, staff_routes};
