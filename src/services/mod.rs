//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.
//!
//! All services use Unit of Work pattern for centralized repository
//! access and transaction management.

mod actor;
mod alerts;
mod auth_service;
pub mod container;
mod inventory_service;
mod message_service;
mod order_service;
mod pos_service;
mod product_service;
mod promotion_service;
mod report_service;
mod staff_service;

#[cfg(test)]
mod ledger_flows;
#[cfg(test)]
pub(crate) mod test_support;

// Service Container
pub use container::{ServiceContainer, Services};

pub use actor::Actor;

// Service traits and implementations
pub use auth_service::{
    AuthService, Authenticator, Claims, Registration, SellerSignup, TokenResponse,
};
pub use inventory_service::{InventoryManager, InventoryService, StockRequest, Transfer};
pub use message_service::{MessageManager, MessageService};
pub use order_service::{OrderManager, OrderService, PlaceOrder};
pub use pos_service::{Checkout, PosManager, PosService};
pub use product_service::{ProductManager, ProductService};
pub use promotion_service::{PromotionManager, PromotionService};
pub use report_service::{Dashboard, ReportManager, ReportService, StatusCount};
pub use staff_service::{NewStaff, StaffManager, StaffService};

// Parallel execution utilities
pub use container::parallel;

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
