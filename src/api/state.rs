//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::net::IpAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::infra::{CacheStore, Database};
use crate::jobs::Notifier;
use crate::services::{ServiceContainer, Services};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Every use case, behind its trait
    pub services: Arc<dyn ServiceContainer>,
    /// Redis cache (sessions, rate limits, dashboard)
    pub cache: Arc<dyn CacheStore>,
    /// Database connection
    pub database: Arc<Database>,
    /// Peers allowed to name the client through forwarding headers
    pub trusted_proxies: Arc<[IpAddr]>,
}

impl AppState {
    /// Wire the full service container over a live database and cache.
    pub fn from_config(
        database: Arc<Database>,
        cache: Arc<dyn CacheStore>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        let trusted_proxies = config.trusted_proxies.clone();
        let services = Arc::new(Services::from_connection(
            database.get_connection(),
            cache.clone(),
            notifier,
            config,
        ));

        Self::new(services, cache, database).with_trusted_proxies(trusted_proxies)
    }

    /// Create application state with manually injected services.
    pub fn new(
        services: Arc<dyn ServiceContainer>,
        cache: Arc<dyn CacheStore>,
        database: Arc<Database>,
    ) -> Self {
        Self {
            services,
            cache,
            database,
            trusted_proxies: Arc::from(Vec::new()),
        }
    }

    /// Believe forwarding headers only on connections from these peers.
    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = Arc::from(proxies);
        self
    }
}
