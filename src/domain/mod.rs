//! Domain layer - Core business entities and rules
//!
//! Entities, value objects and the pure rules of the panel: the order
//! status table, stock ledger arithmetic, discount and till math, barcode
//! check digits and staff permission flags. Nothing here touches the
//! database or Redis.

pub mod barcode;
pub mod inventory;
pub mod message;
pub mod order;
pub mod password;
pub mod permissions;
pub mod pos;
pub mod product;
pub mod promotion;
pub mod store;
pub mod user;

pub use inventory::{
    LedgerFilter, MovementKind, ReconcileReport, StockChange, StockLevel, StockMovement,
    Warehouse,
};
pub use message::{
    Conversation, ConversationStatus, ConversationSummary, ConversationThread, Message,
    SenderSide,
};
pub use order::{
    Channel, Customer, NewOrder, Order, OrderFilter, OrderItem, OrderStatus, StatusChange,
};
pub use password::Password;
pub use permissions::{Permission, StaffPermissions};
pub use pos::{DailySummary, PaymentMethod};
pub use product::{NewProduct, Product, ProductChanges, ProductFilter, ProductStatus};
pub use promotion::{DiscountPreview, NewPromotion, Promotion, PromotionChanges, PromotionKind};
pub use store::Store;
pub use user::{NewUser, User, UserResponse, UserRole};
