use std::sync::Arc;
use std::time::Duration;

use folio_core::clock::{Clock, SystemClock};
use folio_events::{
    CacheCoordinator, CacheInvalidator, DispatcherConfig, HttpPurgeInvalidator, LogInvalidator,
    ReqwestTransport, WebhookDispatcher, WebhookTransport,
};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: folio_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Time source for lock expiry, presence windows, and version timestamps.
    pub clock: Arc<dyn Clock>,
    /// Read-cache invalidation after post writes.
    pub cache: CacheCoordinator,
    /// Outbound webhook fan-out and delivery.
    pub webhooks: WebhookDispatcher,
}

impl AppState {
    /// Assemble state from explicit collaborators. Tests use this to plug in
    /// a manual clock and scripted backends.
    pub fn new(
        pool: folio_db::DbPool,
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        transport: Arc<dyn WebhookTransport>,
        cache_backend: Arc<dyn CacheInvalidator>,
    ) -> Self {
        let dispatcher_config = DispatcherConfig {
            max_attempts: config.webhook_max_attempts,
            attempt_timeout: Duration::from_secs(config.webhook_timeout_secs),
            ..DispatcherConfig::default()
        };
        Self {
            cache: CacheCoordinator::new(cache_backend, Arc::clone(&clock)),
            webhooks: WebhookDispatcher::new(
                pool.clone(),
                transport,
                Arc::clone(&clock),
                dispatcher_config,
            ),
            pool,
            config: Arc::new(config),
            clock,
        }
    }

    /// Production wiring: wall clock, reqwest transport, and either the HTTP
    /// purge backend or the log-only backend depending on `CACHE_PURGE_URL`.
    pub fn from_config(pool: folio_db::DbPool, config: ServerConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(
            config.webhook_timeout_secs,
        )));
        let cache_backend: Arc<dyn CacheInvalidator> = match &config.cache_purge_url {
            Some(url) => {
                tracing::info!(url = %url, "Cache invalidation via HTTP purge endpoint");
                Arc::new(HttpPurgeInvalidator::new(url.clone()))
            }
            None => {
                tracing::info!("No CACHE_PURGE_URL set, cache invalidation is log-only");
                Arc::new(LogInvalidator)
            }
        };
        Self::new(pool, config, Arc::new(SystemClock), transport, cache_backend)
    }
}
