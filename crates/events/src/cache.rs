//! Cache invalidation after post and taxonomy writes.
//!
//! The coordinator builds [`CacheInvalidationSignal`]s and passes them to a
//! [`CacheInvalidator`]. Backend failures are logged and swallowed: a stale
//! cache entry expires on its own, a failed write does not.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use folio_core::cache::{post_signals, taxonomy_signals, CacheInvalidationSignal};
use folio_core::clock::Clock;
use tokio::task::JoinHandle;

/// Timeout for a purge request to the external cache.
const PURGE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache purge request failed: {0}")]
    Http(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Receives invalidation signals for the public read cache.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, signals: &[CacheInvalidationSignal]) -> Result<(), CacheError>;
}

/// Backend that only records signals in the log. Used when no purge endpoint
/// is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogInvalidator;

#[async_trait]
impl CacheInvalidator for LogInvalidator {
    async fn invalidate(&self, signals: &[CacheInvalidationSignal]) -> Result<(), CacheError> {
        for signal in signals {
            tracing::info!(
                key = %signal.key,
                scope = %signal.scope,
                organization_slug = %signal.organization_slug,
                timestamp = signal.timestamp,
                "Cache invalidation signal"
            );
        }
        Ok(())
    }
}

/// Backend that POSTs `{ "signals": [...] }` to an external purge endpoint.
pub struct HttpPurgeInvalidator {
    client: reqwest::Client,
    url: String,
}

impl HttpPurgeInvalidator {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PURGE_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CacheInvalidator for HttpPurgeInvalidator {
    async fn invalidate(&self, signals: &[CacheInvalidationSignal]) -> Result<(), CacheError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "signals": signals }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CacheError::Backend(format!(
                "purge endpoint returned HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Turns content changes into invalidation signals.
#[derive(Clone)]
pub struct CacheCoordinator {
    backend: Arc<dyn CacheInvalidator>,
    clock: Arc<dyn Clock>,
}

impl CacheCoordinator {
    pub fn new(backend: Arc<dyn CacheInvalidator>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Invalidate a post and its organization's post list.
    pub async fn invalidate_post_cache(&self, organization_slug: &str, post_slug: &str) {
        let signals = post_signals(organization_slug, post_slug, self.clock.now());
        self.send(&signals).await;
    }

    /// Invalidate an organization's taxonomy views and post list.
    pub async fn invalidate_taxonomy_cache(&self, organization_slug: &str) {
        let signals = taxonomy_signals(organization_slug, self.clock.now());
        self.send(&signals).await;
    }

    /// [`Self::invalidate_post_cache`] on a detached task.
    pub fn spawn_post_invalidation(
        &self,
        organization_slug: String,
        post_slug: String,
    ) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator
                .invalidate_post_cache(&organization_slug, &post_slug)
                .await;
        })
    }

    /// [`Self::invalidate_taxonomy_cache`] on a detached task.
    pub fn spawn_taxonomy_invalidation(&self, organization_slug: String) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.invalidate_taxonomy_cache(&organization_slug).await;
        })
    }

    async fn send(&self, signals: &[CacheInvalidationSignal]) {
        if let Err(e) = self.backend.invalidate(signals).await {
            tracing::warn!(
                error = %e,
                keys = ?signals.iter().map(|s| s.key.as_str()).collect::<Vec<_>>(),
                "Cache invalidation failed"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
