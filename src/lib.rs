//! Seller Panel - multi-tenant back office for online and in-store sellers
//!
//! Each seller account owns one store. Owners and their staff manage the
//! catalogue, warehouse stock, online orders, the point-of-sale till,
//! promotion codes and support conversations with platform admins.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Entities and pure business rules (order workflow, stock math)
//! - **services**: Use cases, run inside Unit of Work transactions
//! - **infra**: Database, Redis cache, repositories
//! - **jobs**: Notification queue
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (pagination)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! seller-panel serve
//!
//! # Run migrations
//! seller-panel migrate up
//!
//! # Create a platform admin
//! seller-panel admin create --email ops@example.com
//!
//! # Drain the notification queue
//! seller-panel jobs work
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod jobs;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{OrderStatus, Password, User, UserRole};
pub use errors::{AppError, AppResult};
pub use infra::Cache;
