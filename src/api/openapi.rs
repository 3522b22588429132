//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    auth_handler, inventory_handler, message_handler, order_handler, pos_handler,
    product_handler, promotion_handler, report_handler, staff_handler,
};
use crate::domain::pos::TenderTotal;
use crate::domain::{
    Channel, Conversation, ConversationStatus, ConversationSummary, ConversationThread, Customer,
    DailySummary, DiscountPreview, Message, MovementKind, Order, OrderItem, OrderStatus,
    PaymentMethod, Permission, Product, ProductStatus, Promotion, PromotionKind, ReconcileReport,
    SenderSide, StaffPermissions, StatusChange, StockLevel, StockMovement, Store, UserResponse,
    UserRole, Warehouse,
};
use crate::domain::inventory::{BalanceDrift, LevelDrift, ProductDrift};
use crate::services::{Dashboard, StatusCount, TokenResponse, Transfer};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Seller Panel API",
        version = "0.1.0",
        description = "Multi-tenant seller panel: catalogue, orders, warehouse stock, point of sale, promotions and seller support messaging",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        auth_handler::register,
        auth_handler::login,
        auth_handler::logout,
        staff_handler::me,
        staff_handler::list_staff,
        staff_handler::create_staff,
        staff_handler::update_staff,
        staff_handler::delete_staff,
        staff_handler::restore_staff,
        product_handler::list_products,
        product_handler::create_product,
        product_handler::get_product,
        product_handler::find_by_barcode,
        product_handler::update_product,
        product_handler::archive_product,
        product_handler::delete_product,
        product_handler::assign_barcode,
        product_handler::export_products,
        inventory_handler::list_warehouses,
        inventory_handler::create_warehouse,
        inventory_handler::update_warehouse,
        inventory_handler::set_default_warehouse,
        inventory_handler::receive,
        inventory_handler::adjust,
        inventory_handler::transfer,
        inventory_handler::stock_levels,
        inventory_handler::ledger,
        inventory_handler::reconcile,
        order_handler::list_orders,
        order_handler::place_order,
        order_handler::get_order,
        order_handler::change_status,
        order_handler::order_history,
        pos_handler::checkout,
        pos_handler::refund,
        pos_handler::daily_summary,
        promotion_handler::list_promotions,
        promotion_handler::create_promotion,
        promotion_handler::get_promotion,
        promotion_handler::update_promotion,
        promotion_handler::set_active,
        promotion_handler::delete_promotion,
        promotion_handler::preview,
        message_handler::list_conversations,
        message_handler::start_conversation,
        message_handler::get_conversation,
        message_handler::post_message,
        message_handler::mark_read,
        message_handler::close_conversation,
        message_handler::reopen_conversation,
        report_handler::dashboard,
        report_handler::low_stock,
    ),
    components(
        schemas(
            // Accounts
            UserRole,
            UserResponse,
            Store,
            Permission,
            StaffPermissions,
            TokenResponse,
            auth_handler::RegisterRequest,
            auth_handler::LoginRequest,
            auth_handler::RegistrationResponse,
            staff_handler::CreateStaffRequest,
            staff_handler::UpdateStaffRequest,
            // Catalogue
            Product,
            ProductStatus,
            product_handler::CreateProductRequest,
            product_handler::UpdateProductRequest,
            // Inventory
            Warehouse,
            StockLevel,
            StockMovement,
            MovementKind,
            ReconcileReport,
            ProductDrift,
            LevelDrift,
            BalanceDrift,
            Transfer,
            inventory_handler::CreateWarehouseRequest,
            inventory_handler::UpdateWarehouseRequest,
            inventory_handler::StockMoveRequest,
            inventory_handler::TransferRequest,
            // Orders and till
            Order,
            OrderItem,
            OrderStatus,
            Channel,
            Customer,
            StatusChange,
            PaymentMethod,
            DailySummary,
            TenderTotal,
            order_handler::OrderLine,
            order_handler::PlaceOrderRequest,
            order_handler::StatusChangeRequest,
            pos_handler::CheckoutRequest,
            pos_handler::RefundRequest,
            // Promotions
            Promotion,
            PromotionKind,
            DiscountPreview,
            promotion_handler::CreatePromotionRequest,
            promotion_handler::UpdatePromotionRequest,
            promotion_handler::SetActiveRequest,
            promotion_handler::PreviewRequest,
            // Messaging
            Conversation,
            ConversationStatus,
            ConversationSummary,
            ConversationThread,
            Message,
            SenderSide,
            message_handler::StartConversationRequest,
            message_handler::PostMessageRequest,
            message_handler::MarkReadResponse,
            // Reports
            Dashboard,
            StatusCount,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Seller signup, login and logout"),
        (name = "Staff", description = "Store staff accounts and permissions"),
        (name = "Products", description = "Catalogue, barcodes and CSV export"),
        (name = "Inventory", description = "Warehouses, stock moves and the ledger"),
        (name = "Orders", description = "Online orders and the status workflow"),
        (name = "POS", description = "In-store checkout, refunds and daily summary"),
        (name = "Promotions", description = "Discount codes"),
        (name = "Messages", description = "Seller and platform support conversations"),
        (name = "Reports", description = "Dashboard and low-stock report")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_order_workflow() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/orders/{id}/status"));
        assert!(doc.paths.paths.contains_key("/pos/checkout"));
    }
}
