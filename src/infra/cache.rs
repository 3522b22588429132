//! Redis cache implementation.
//!
//! Backs login sessions, request rate limiting and the short-lived
//! dashboard cache. Services depend on the [`CacheStore`] trait so they can
//! be tested without Redis.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError, Script};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::config::{
    Config, CACHE_PREFIX_DASHBOARD, CACHE_PREFIX_RATE_LIMIT, CACHE_PREFIX_SESSION,
};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Key-value operations services rely on
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Increment a counter, starting its expiry window on the first hit.
    async fn hit(&self, key: &str, window_seconds: u64) -> AppResult<u64>;
}

/// Increment and arm the expiry in one round trip. A counter left without
/// a TTL is re-armed too, so a window can never outlive its length.
const HIT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('TTL', KEYS[1]) == -1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

static HIT: Lazy<Script> = Lazy::new(|| Script::new(HIT_SCRIPT));

/// Session key for a token's `sid`
pub fn session_key(session_id: &str) -> String {
    format!("{}{}", CACHE_PREFIX_SESSION, session_id)
}

/// Dashboard key for a store
pub fn dashboard_key(store_id: Uuid) -> String {
    format!("{}{}", CACHE_PREFIX_DASHBOARD, store_id)
}

/// Read and decode a JSON value.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheStore,
    key: &str,
) -> AppResult<Option<T>> {
    match cache.get_raw(key).await? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| AppError::internal(format!("Cache deserialization error: {}", e))),
        None => Ok(None),
    }
}

/// Check and increment a fixed-window rate limit counter.
/// Returns `(current_count, is_allowed)`.
pub async fn check_rate_limit(
    cache: &dyn CacheStore,
    identifier: &str,
    max_requests: u64,
    window_seconds: u64,
) -> AppResult<(u64, bool)> {
    let key = format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier);
    let count = cache.hit(&key, window_seconds).await?;
    Ok((count, count <= max_requests))
}

/// Encode and store a JSON value with a TTL.
pub async fn set_json<T: Serialize + Sync>(
    cache: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl_seconds: u64,
) -> AppResult<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))?;
    cache.set_raw(key, json, ttl_seconds).await
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Connect to Redis.
    pub async fn connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for Cache {
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(cache_error)
    }

    async fn set_raw(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(cache_error)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await.map_err(cache_error)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        conn.exists(key).await.map_err(cache_error)
    }

    async fn hit(&self, key: &str, window_seconds: u64) -> AppResult<u64> {
        let mut conn = self.connection.clone();

        let count: i64 = HIT
            .key(key)
            .arg(window_seconds)
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(count.max(0) as u64)
    }
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::internal(format!("Cache error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_cache_key_prefixes() {
        assert_eq!(session_key("abc"), "session:abc");
        let store = Uuid::nil();
        assert_eq!(
            dashboard_key(store),
            "dashboard:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_hit_script_arms_expiry_with_increment() {
        let incr = HIT_SCRIPT.find("INCR").unwrap();
        let expire = HIT_SCRIPT.find("EXPIRE").unwrap();
        assert!(incr < expire);
        // a counter stranded without TTL gets one on the next hit
        assert!(HIT_SCRIPT.contains("TTL', KEYS[1]) == -1"));
    }

    #[tokio::test]
    async fn test_get_json_decodes() {
        let mut cache = MockCacheStore::new();
        cache
            .expect_get_raw()
            .with(eq("k"))
            .returning(|_| Ok(Some("[1,2,3]".to_string())));

        let value: Option<Vec<u8>> = get_json(&cache, "k").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_rate_limit_over_budget() {
        let mut cache = MockCacheStore::new();
        cache
            .expect_hit()
            .with(eq("rate_limit:auth:10.0.0.1"), eq(60))
            .returning(|_, _| Ok(11));

        let (count, allowed) = check_rate_limit(&cache, "auth:10.0.0.1", 10, 60)
            .await
            .unwrap();
        assert_eq!(count, 11);
        assert!(!allowed);
    }

    #[tokio::test]
    async fn test_get_json_rejects_garbage() {
        let mut cache = MockCacheStore::new();
        cache
            .expect_get_raw()
            .returning(|_| Ok(Some("not json".to_string())));

        let result: AppResult<Option<Vec<u8>>> = get_json(&cache, "k").await;
        assert!(result.is_err());
    }
}
