//! Authentication service - Seller sign-up, login sessions and token checks.
//!
//! A request is authenticated only when its JWT verifies AND the session id
//! it carries still exists in Redis, so logout takes effect immediately.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Actor;
use crate::config::{Config, DEFAULT_CURRENCY, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::store::normalize_currency;
use crate::domain::{NewUser, Password, StaffPermissions, Store, User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::cache::{session_key, CacheStore};
use crate::infra::UnitOfWork;
use crate::with_transaction;

/// Name given to the warehouse every new store starts with
const DEFAULT_WAREHOUSE_NAME: &str = "Main warehouse";

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    /// Session id; must exist in the cache for the token to be accepted
    pub sid: String,
    pub store_id: Option<Uuid>,
    pub email: String,
    pub role: String,
    pub permissions: StaffPermissions,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn into_actor(self) -> Actor {
        Actor {
            user_id: self.sub,
            store_id: self.store_id,
            email: self.email,
            role: UserRole::from(self.role.as_str()),
            permissions: self.permissions,
        }
    }
}

/// Token response returned after successful authentication
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token expiration time in seconds
    #[schema(example = 43200)]
    pub expires_in: i64,
}

/// Seller sign-up input
#[derive(Debug, Clone)]
pub struct SellerSignup {
    pub email: String,
    pub password: String,
    pub name: String,
    pub store_name: String,
    pub currency: Option<String>,
}

/// Result of a seller sign-up
#[derive(Debug, Clone)]
pub struct Registration {
    pub store: Store,
    pub owner: User,
}

/// Session record kept in Redis for the lifetime of a token
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    user_id: Uuid,
    store_id: Option<Uuid>,
    created_at: i64,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a store with its owner account and default warehouse
    async fn register_seller(&self, signup: SellerSignup) -> AppResult<Registration>;

    /// Create a platform admin account (CLI only)
    async fn create_admin(&self, email: String, password: String, name: String)
        -> AppResult<User>;

    /// Login, open a session and return a JWT
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Verify JWT signature and expiry
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Verify the token, check its session is still live and its account not deleted
    async fn authenticate(&self, token: &str) -> AppResult<Claims>;

    /// Drop a session; tokens carrying it stop working
    async fn logout(&self, session_id: &str) -> AppResult<()>;
}

/// Normalize an email for storage and lookup
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Generate JWT token for a user bound to a session
fn generate_token(user: &User, session_id: &str, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        sid: session_id.to_string(),
        store_id: user.store_id,
        email: user.email.clone(),
        role: user.role.to_string(),
        permissions: user.effective_permissions(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
    })
}

/// Verify JWT token and extract claims
fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Arc<dyn CacheStore>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, cache: Arc<dyn CacheStore>, config: Config) -> Self {
        Self { uow, cache, config }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn register_seller(&self, signup: SellerSignup) -> AppResult<Registration> {
        let email = normalize_email(&signup.email);
        let currency =
            normalize_currency(signup.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))?;
        let store_name = signup.store_name.trim().to_string();
        if store_name.is_empty() {
            return Err(AppError::validation("Store name is required"));
        }
        let password_hash = Password::new(&signup.password)?.into_string();
        let name = signup.name;

        let registration = with_transaction!(self.uow, |ctx| {
            // Soft-deleted accounts keep their email reserved
            if ctx
                .users()
                .find_by_email_with_deleted(&email)
                .await?
                .is_some()
            {
                return Err(AppError::conflict("User"));
            }

            let store = ctx.stores().create(store_name, currency).await?;
            let owner = ctx
                .users()
                .create(NewUser {
                    store_id: Some(store.id),
                    email,
                    password_hash,
                    name,
                    role: UserRole::Owner,
                    permissions: StaffPermissions::all(),
                })
                .await?;
            ctx.warehouses()
                .create_default(store.id, DEFAULT_WAREHOUSE_NAME.to_string())
                .await?;

            Ok(Registration { store, owner })
        })?;

        tracing::info!(
            store_id = %registration.store.id,
            owner_id = %registration.owner.id,
            "Seller registered"
        );
        Ok(registration)
    }

    async fn create_admin(
        &self,
        email: String,
        password: String,
        name: String,
    ) -> AppResult<User> {
        let email = normalize_email(&email);
        let users = self.uow.users();
        if users.find_by_email_with_deleted(&email).await?.is_some() {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(&password)?.into_string();
        users
            .create(NewUser {
                store_id: None,
                email,
                password_hash,
                name,
                role: UserRole::Admin,
                permissions: StaffPermissions::default(),
            })
            .await
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let user = self.uow.users().find_by_email(&normalize_email(&email)).await?;

        // Verify against a dummy hash when the user is unknown so both
        // paths cost the same
        let stored = match &user {
            Some(user) => Password::from_hash(user.password_hash.clone()),
            None => Password::dummy(),
        };
        let password_valid = stored.verify(&password);

        let user = match user {
            Some(user) if password_valid => user,
            _ => return Err(AppError::InvalidCredentials),
        };

        if let Some(store_id) = user.store_id {
            if self.uow.stores().find_by_id(store_id).await?.is_none() {
                tracing::warn!(user_id = %user.id, store_id = %store_id, "Login to inactive store");
                return Err(AppError::InvalidCredentials);
            }
        }

        let session_id = Uuid::new_v4().simple().to_string();
        let record = SessionRecord {
            user_id: user.id,
            store_id: user.store_id,
            created_at: Utc::now().timestamp(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| AppError::internal(format!("Session serialization error: {}", e)))?;
        self.cache
            .set_raw(&session_key(&session_id), json, self.config.token_ttl_seconds())
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        generate_token(&user, &session_id, &self.config)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }

    async fn authenticate(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;
        let key = session_key(&claims.sid);
        if !self.cache.exists(&key).await? {
            return Err(AppError::Unauthorized);
        }

        // Soft-deleted accounts are invisible to find_by_id
        if self.uow.users().find_by_id(claims.sub).await?.is_none() {
            self.cache.delete(&key).await?;
            tracing::info!(user_id = %claims.sub, "Session dropped for removed account");
            return Err(AppError::Unauthorized);
        }
        Ok(claims)
    }

    async fn logout(&self, session_id: &str) -> AppResult<()> {
        self.cache.delete(&session_key(session_id)).await
    }
}
