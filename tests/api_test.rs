//! Router tests.
//!
//! The full router runs against hand-written service stubs and an
//! in-memory cache, so no database or Redis is needed. The database
//! handle is a disconnected SeaORM connection.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use seller_panel::api::{create_router, AppState};
use seller_panel::domain::order::plan_transition;
use seller_panel::domain::{
    Channel, Customer, Order, OrderFilter, OrderStatus, StaffPermissions, StatusChange, User,
    UserRole,
};
use seller_panel::errors::{AppError, AppResult};
use seller_panel::infra::{CacheStore, Database};
use seller_panel::services::{
    AuthService, Claims, InventoryService, MessageService, OrderService, PlaceOrder, PosService,
    ProductService, PromotionService, Registration, ReportService, SellerSignup,
    ServiceContainer, StaffService, TokenResponse,
};
use seller_panel::types::PaginationParams;

const OWNER_TOKEN: &str = "owner-token";
const CLERK_TOKEN: &str = "clerk-token";

fn store_id() -> Uuid {
    Uuid::from_u128(0x5107e)
}

// =============================================================================
// Stubs
// =============================================================================

/// Accepts two fixed tokens: a store owner and a till-only clerk
struct StubAuth;

#[async_trait]
impl AuthService for StubAuth {
    async fn register_seller(&self, _signup: SellerSignup) -> AppResult<Registration> {
        Err(AppError::Forbidden)
    }

    async fn create_admin(&self, _email: String, _password: String, _name: String) -> AppResult<User> {
        Err(AppError::Forbidden)
    }

    async fn login(&self, _email: String, _password: String) -> AppResult<TokenResponse> {
        Err(AppError::InvalidCredentials)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let (role, permissions) = match token {
            OWNER_TOKEN => (UserRole::Owner, StaffPermissions::all()),
            CLERK_TOKEN => (
                UserRole::Staff,
                StaffPermissions {
                    pos: true,
                    ..Default::default()
                },
            ),
            _ => return Err(AppError::Unauthorized),
        };

        let now = Utc::now().timestamp();
        Ok(Claims {
            sub: Uuid::new_v4(),
            sid: format!("session-{}", token),
            store_id: Some(store_id()),
            email: format!("{}@shop.example", role),
            role: role.to_string(),
            permissions,
            exp: now + 3600,
            iat: now,
        })
    }

    async fn authenticate(&self, token: &str) -> AppResult<Claims> {
        self.verify_token(token)
    }

    async fn logout(&self, _session_id: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Every order is pending until someone moves it
struct StubOrders {
    order_id: Uuid,
}

impl StubOrders {
    fn order(&self, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: self.order_id,
            store_id: store_id(),
            order_number: "ORD-20240601-1A2B3C4D".to_string(),
            channel: Channel::Online,
            status,
            warehouse_id: Uuid::new_v4(),
            customer: Customer {
                name: "Alex Buyer".to_string(),
                ..Default::default()
            },
            subtotal: Decimal::new(4000, 2),
            discount_total: Decimal::ZERO,
            total: Decimal::new(4000, 2),
            promotion_id: None,
            promotion_code: None,
            payment_method: None,
            amount_tendered: None,
            change_due: None,
            note: None,
            created_by: None,
            items: vec![],
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl OrderService for StubOrders {
    async fn place_order(&self, _store_id: Uuid, _actor: Uuid, _request: PlaceOrder) -> AppResult<Order> {
        Err(AppError::validation("Order must contain at least one line"))
    }

    async fn get(&self, _store_id: Uuid, id: Uuid) -> AppResult<Order> {
        if id == self.order_id {
            Ok(self.order(OrderStatus::Pending))
        } else {
            Err(AppError::NotFound)
        }
    }

    async fn list(
        &self,
        _store_id: Uuid,
        _filter: OrderFilter,
        _pagination: PaginationParams,
    ) -> AppResult<(Vec<Order>, u64)> {
        Ok((vec![self.order(OrderStatus::Pending)], 1))
    }

    async fn transition(
        &self,
        store_id: Uuid,
        _actor: Uuid,
        id: Uuid,
        to: OrderStatus,
        _note: Option<String>,
    ) -> AppResult<Order> {
        let current = self.get(store_id, id).await?;
        plan_transition(current.status, to)?;
        Ok(self.order(to))
    }

    async fn history(&self, _store_id: Uuid, _id: Uuid) -> AppResult<Vec<StatusChange>> {
        Ok(vec![])
    }
}

/// Only auth and orders are wired; other areas are never reached here
struct TestServices {
    auth: Arc<dyn AuthService>,
    orders: Arc<dyn OrderService>,
}

impl ServiceContainer for TestServices {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    fn staff(&self) -> Arc<dyn StaffService> {
        unimplemented!("staff service not wired in router tests")
    }

    fn products(&self) -> Arc<dyn ProductService> {
        unimplemented!("product service not wired in router tests")
    }

    fn inventory(&self) -> Arc<dyn InventoryService> {
        unimplemented!("inventory service not wired in router tests")
    }

    fn orders(&self) -> Arc<dyn OrderService> {
        self.orders.clone()
    }

    fn pos(&self) -> Arc<dyn PosService> {
        unimplemented!("pos service not wired in router tests")
    }

    fn promotions(&self) -> Arc<dyn PromotionService> {
        unimplemented!("promotion service not wired in router tests")
    }

    fn messages(&self) -> Arc<dyn MessageService> {
        unimplemented!("message service not wired in router tests")
    }

    fn reports(&self) -> Arc<dyn ReportService> {
        unimplemented!("report service not wired in router tests")
    }
}

/// In-memory stand-in for Redis
#[derive(Default)]
struct MemoryCache {
    values: Mutex<HashMap<String, String>>,
    counters: Mutex<HashMap<String, u64>>,
}

impl MemoryCache {
    fn with_counter(key: &str, count: u64) -> Self {
        let cache = Self::default();
        cache
            .counters
            .lock()
            .unwrap()
            .insert(key.to_string(), count);
        cache
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: String, _ttl_seconds: u64) -> AppResult<()> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.values.lock().unwrap().contains_key(key))
    }

    async fn hit(&self, key: &str, _window_seconds: u64) -> AppResult<u64> {
        let mut counters = self.counters.lock().unwrap();
        let count = counters.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

// =============================================================================
// Helpers
// =============================================================================

const CLIENT_IP: [u8; 4] = [198, 51, 100, 7];
const PROXY_IP: [u8; 4] = [10, 0, 0, 1];

fn state(order_id: Uuid, cache: MemoryCache) -> AppState {
    let services = Arc::new(TestServices {
        auth: Arc::new(StubAuth),
        orders: Arc::new(StubOrders { order_id }),
    });
    let database = Arc::new(Database::from_connection(DatabaseConnection::default()));

    AppState::new(services, Arc::new(cache), database)
}

fn app_with_cache(order_id: Uuid, cache: MemoryCache) -> Router {
    create_router(state(order_id, cache))
}

fn app_behind_proxy(cache: MemoryCache) -> Router {
    create_router(
        state(Uuid::new_v4(), cache).with_trusted_proxies(vec![IpAddr::from(PROXY_IP)]),
    )
}

/// Attach the peer address the server would record for the connection
fn from_peer(mut request: Request<Body>, peer: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 40_000))));
    request
}

fn app(order_id: Uuid) -> Router {
    app_with_cache(order_id, MemoryCache::default())
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    from_peer(builder.body(Body::empty()).unwrap(), CLIENT_IP)
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    from_peer(request, CLIENT_IP)
}

fn login_attempt(forwarded_for: &str) -> Request<Body> {
    let mut request = post_json(
        "/auth/login",
        OWNER_TOKEN,
        json!({ "email": "owner@shop.example", "password": "wrong-password" }),
    );
    request
        .headers_mut()
        .insert("X-Forwarded-For", forwarded_for.parse().unwrap());
    request
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn test_root_endpoint() {
    let response = app(Uuid::new_v4()).oneshot(get("/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Seller Panel API");
}

#[tokio::test]
async fn test_health_degraded_without_database() {
    let response = app(Uuid::new_v4())
        .oneshot(get("/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["database"]["status"], "unhealthy");
    assert_eq!(body["services"]["redis"]["status"], "healthy");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let response = app(Uuid::new_v4())
        .oneshot(get("/api-docs/openapi.json", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "Seller Panel API");
    assert!(body["paths"]["/pos/checkout"].is_object());
}

// =============================================================================
// Authentication and permissions
// =============================================================================

#[tokio::test]
async fn test_orders_require_token() {
    let response = app(Uuid::new_v4())
        .oneshot(get("/orders", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_token_rejected() {
    let response = app(Uuid::new_v4())
        .oneshot(get("/orders", Some("forged")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_clerk_without_orders_flag_forbidden() {
    let response = app(Uuid::new_v4())
        .oneshot(get("/orders", Some(CLERK_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_lists_orders_with_rate_limit_headers() {
    let response = app(Uuid::new_v4())
        .oneshot(get("/orders?per_page=10", Some(OWNER_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["X-RateLimit-Limit"], "300");
    assert_eq!(response.headers()["X-RateLimit-Remaining"], "299");

    let body = json_body(response).await;
    assert_eq!(body["meta"]["per_page"], 10);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["status"], "pending");
}

// =============================================================================
// Order workflow over HTTP
// =============================================================================

#[tokio::test]
async fn test_confirm_pending_order() {
    let order_id = Uuid::new_v4();
    let response = app(order_id)
        .oneshot(post_json(
            &format!("/orders/{}/status", order_id),
            OWNER_TOKEN,
            json!({ "status": "confirmed", "note": "paid by card" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["total"], "40.00");
}

#[tokio::test]
async fn test_skipping_a_step_conflicts() {
    let order_id = Uuid::new_v4();
    let response = app(order_id)
        .oneshot(post_json(
            &format!("/orders/{}/status", order_id),
            OWNER_TOKEN,
            json!({ "status": "shipped" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_STATE");
    assert_eq!(body["error"]["message"], "Cannot move order from pending to shipped");
}

#[tokio::test]
async fn test_unknown_status_rejected() {
    let order_id = Uuid::new_v4();
    let response = app(order_id)
        .oneshot(post_json(
            &format!("/orders/{}/status", order_id),
            OWNER_TOKEN,
            json!({ "status": "teleported" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_order_not_found() {
    let response = app(Uuid::new_v4())
        .oneshot(get(&format!("/orders/{}", Uuid::new_v4()), Some(OWNER_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn test_general_budget_exhausted() {
    let cache = MemoryCache::with_counter("rate_limit:general:198.51.100.7", 300);
    let response = app_with_cache(Uuid::new_v4(), cache)
        .oneshot(get("/orders", Some(OWNER_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["Retry-After"], "60");
}

#[tokio::test]
async fn test_auth_budget_is_separate() {
    let cache = MemoryCache::with_counter("rate_limit:general:198.51.100.7", 300);
    let response = app_with_cache(Uuid::new_v4(), cache)
        .oneshot(post_json(
            "/auth/login",
            OWNER_TOKEN,
            json!({ "email": "owner@shop.example", "password": "wrong-password" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_reset_auth_budget() {
    let cache = MemoryCache::with_counter("rate_limit:auth:198.51.100.7", 10);
    let app = app_with_cache(Uuid::new_v4(), cache);

    for spoofed in ["203.0.113.1", "203.0.113.2", "203.0.113.3"] {
        let response = app.clone().oneshot(login_attempt(spoofed)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS, "{}", spoofed);
    }
}

#[tokio::test]
async fn test_trusted_proxy_counts_forwarded_client() {
    let cache = MemoryCache::with_counter("rate_limit:auth:203.0.113.9", 10);
    let app = app_behind_proxy(cache);

    let blocked = from_peer(login_attempt("203.0.113.9"), PROXY_IP);
    let response = app.clone().oneshot(blocked).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = from_peer(login_attempt("203.0.113.20"), PROXY_IP);
    let response = app.oneshot(other).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
