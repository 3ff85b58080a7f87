//! Persisted webhook delivery with scheduled retries.
//!
//! [`WebhookDispatcher::dispatch`] turns an event into one `pending`
//! delivery per subscribed endpoint. Each delivery is then attempted by
//! [`WebhookDispatcher::attempt`] (right away, from a detached task) and, if
//! it fails, again by the background worker through
//! [`WebhookDispatcher::process_due`] once its backoff has elapsed. Because
//! every state change is stored, retries survive a restart.
//!
//! Delivery is at-least-once: a worker that dies mid-attempt leaves its lease
//! to run out and the delivery is sent again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use folio_core::clock::Clock;
use folio_core::types::DbId;
use folio_core::webhooks::{
    classify_status, compute_signature, events, next_transition, truncate_snippet,
    AttemptOutcome, DeliveryStatus, WebhookPayload, CLAIM_LEASE_SECS,
    DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, HEADER_DELIVERY, HEADER_EVENT,
    HEADER_SIGNATURE, RESPONSE_SNIPPET_MAX_BYTES,
};
use folio_db::models::webhook::{
    AttemptRecord, DeliveryWithAttempts, WebhookDelivery, WebhookEndpoint,
};
use folio_db::repositories::{WebhookDeliveryRepo, WebhookRepo};
use folio_db::DbPool;
use tokio::task::JoinHandle;

use super::transport::{OutboundRequest, WebhookTransport};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook dispatch and delivery.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// No response, a timeout, or a status worth retrying.
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// The receiver rejected the request with a non-retryable status.
    #[error("Webhook rejected with HTTP {0}")]
    Permanent(u16),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Webhook endpoint {0} not found")]
    EndpointNotFound(DbId),
}

// ---------------------------------------------------------------------------
// Event & config
// ---------------------------------------------------------------------------

/// An event to fan out to an organization's subscribers.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub event_type: String,
    pub data: serde_json::Value,
}

impl WebhookEvent {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }
}

/// Tunables for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Attempts per delivery before it is exhausted.
    pub max_attempts: i32,
    /// Per-attempt HTTP timeout, used to build the production transport.
    pub attempt_timeout: Duration,
    /// How long a claim hides a delivery from other workers. Raised to
    /// outlast `attempt_timeout` when it is shorter; see [`Self::lease_secs`].
    pub claim_lease_secs: i64,
    /// Deliveries claimed per `process_due` call.
    pub batch_size: i64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
            claim_lease_secs: CLAIM_LEASE_SECS,
            batch_size: 50,
        }
    }
}

impl DispatcherConfig {
    /// Lease actually taken on a claim: `claim_lease_secs`, but never less
    /// than one second past the attempt timeout, so an in-flight attempt is
    /// not reclaimed and sent again.
    pub fn lease_secs(&self) -> i64 {
        let timeout_secs = i64::try_from(self.attempt_timeout.as_secs()).unwrap_or(i64::MAX);
        self.claim_lease_secs.max(timeout_secs.saturating_add(1))
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Fans events out to webhook endpoints and drives their deliveries.
#[derive(Clone)]
pub struct WebhookDispatcher {
    pool: DbPool,
    transport: Arc<dyn WebhookTransport>,
    clock: Arc<dyn Clock>,
    config: DispatcherConfig,
}

impl WebhookDispatcher {
    pub fn new(
        pool: DbPool,
        transport: Arc<dyn WebhookTransport>,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            pool,
            transport,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Create a `pending` delivery for every active endpoint of the
    /// organization that subscribes to the event (or to `*`).
    pub async fn dispatch(
        &self,
        organization_id: DbId,
        event: &WebhookEvent,
    ) -> Result<Vec<WebhookDelivery>, WebhookError> {
        let endpoints = WebhookRepo::list_active(&self.pool, organization_id).await?;
        let now = self.clock.now();
        let payload = serde_json::to_value(WebhookPayload {
            event: event.event_type.clone(),
            data: event.data.clone(),
            timestamp: now,
        })?;

        let mut deliveries = Vec::new();
        for endpoint in endpoints
            .iter()
            .filter(|e| e.subscribes_to(&event.event_type))
        {
            let delivery = WebhookDeliveryRepo::create(
                &self.pool,
                endpoint.id,
                &event.event_type,
                &payload,
                self.config.max_attempts,
                now,
            )
            .await?;
            deliveries.push(delivery);
        }

        tracing::debug!(
            organization_id,
            event_type = %event.event_type,
            deliveries = deliveries.len(),
            "Webhook event dispatched"
        );
        Ok(deliveries)
    }

    /// Dispatch and attempt every resulting delivery on a detached task.
    ///
    /// The caller does not wait for it; failures are logged and left for the
    /// background worker to retry.
    pub fn spawn_dispatch(&self, organization_id: DbId, event: WebhookEvent) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let deliveries = match dispatcher.dispatch(organization_id, &event).await {
                Ok(deliveries) => deliveries,
                Err(e) => {
                    tracing::error!(
                        organization_id,
                        event_type = %event.event_type,
                        error = %e,
                        "Failed to dispatch webhook event"
                    );
                    return;
                }
            };
            for delivery in deliveries {
                if let Err(e) = dispatcher.attempt(delivery.id).await {
                    tracing::warn!(
                        delivery_id = delivery.id,
                        error = %e,
                        "Immediate webhook attempt failed"
                    );
                }
            }
        })
    }

    /// Claim and attempt a single delivery.
    ///
    /// Returns `None` without sending anything if the delivery is not due,
    /// is already terminal, or is leased by another worker.
    pub async fn attempt(
        &self,
        delivery_id: DbId,
    ) -> Result<Option<WebhookDelivery>, WebhookError> {
        let claimed = WebhookDeliveryRepo::claim(
            &self.pool,
            delivery_id,
            self.clock.now(),
            self.config.lease_secs(),
        )
        .await?;
        match claimed {
            Some(delivery) => self.run_attempt(delivery, false).await.map(Some),
            None => Ok(None),
        }
    }

    /// Claim up to `batch_size` due deliveries and attempt them concurrently.
    /// Returns how many were attempted.
    pub async fn process_due(&self) -> Result<usize, WebhookError> {
        let claimed = WebhookDeliveryRepo::claim_due(
            &self.pool,
            self.clock.now(),
            self.config.lease_secs(),
            self.config.batch_size,
        )
        .await?;
        let count = claimed.len();

        let results =
            futures::future::join_all(claimed.into_iter().map(|d| self.run_attempt(d, false)))
                .await;
        for result in results {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Webhook retry attempt failed");
            }
        }
        Ok(count)
    }

    /// Send a synthetic `webhook.test` delivery to one endpoint and wait for
    /// the attempt. Inactive endpoints can still be tested.
    pub async fn send_test(
        &self,
        organization_id: DbId,
        endpoint_id: DbId,
    ) -> Result<DeliveryWithAttempts, WebhookError> {
        let endpoint = WebhookRepo::find_by_id(&self.pool, organization_id, endpoint_id)
            .await?
            .ok_or(WebhookError::EndpointNotFound(endpoint_id))?;

        let now = self.clock.now();
        let payload = serde_json::to_value(WebhookPayload {
            event: events::WEBHOOK_TEST.to_string(),
            data: serde_json::json!({
                "endpoint_id": endpoint.id,
                "message": "This is a test delivery",
            }),
            timestamp: now,
        })?;
        let created = WebhookDeliveryRepo::create(
            &self.pool,
            endpoint.id,
            events::WEBHOOK_TEST,
            &payload,
            self.config.max_attempts,
            now,
        )
        .await?;

        let delivery = match WebhookDeliveryRepo::claim(
            &self.pool,
            created.id,
            now,
            self.config.lease_secs(),
        )
        .await?
        {
            Some(claimed) => self.run_attempt(claimed, true).await?,
            None => created,
        };
        let attempts = WebhookDeliveryRepo::list_attempts(&self.pool, delivery.id).await?;
        Ok(DeliveryWithAttempts { delivery, attempts })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Send a claimed delivery once and store the outcome.
    async fn run_attempt(
        &self,
        delivery: WebhookDelivery,
        allow_inactive: bool,
    ) -> Result<WebhookDelivery, WebhookError> {
        let endpoint = match WebhookRepo::find_for_delivery(&self.pool, delivery.endpoint_id)
            .await?
        {
            Some(endpoint) if endpoint.active || allow_inactive => endpoint,
            _ => {
                tracing::info!(
                    delivery_id = delivery.id,
                    endpoint_id = delivery.endpoint_id,
                    "Endpoint deleted or disabled, abandoning delivery"
                );
                let abandoned = WebhookDeliveryRepo::mark_exhausted(
                    &self.pool,
                    delivery.id,
                    "endpoint deleted or disabled",
                    self.clock.now(),
                )
                .await?;
                return Ok(abandoned.unwrap_or(delivery));
            }
        };

        let request = build_request(&endpoint, &delivery)?;
        let attempt_number = delivery.attempt_count + 1;

        let started = Instant::now();
        let result = self.transport.send(&request).await;
        let latency_ms = started.elapsed().as_millis() as i64;

        let (outcome, record) = match result {
            Ok(response) => {
                let outcome = classify_status(response.status);
                let error = match outcome {
                    AttemptOutcome::Success => None,
                    AttemptOutcome::Permanent => {
                        Some(WebhookError::Permanent(response.status).to_string())
                    }
                    AttemptOutcome::Retryable => Some(
                        WebhookError::Transient(format!("HTTP {}", response.status)).to_string(),
                    ),
                };
                let record = AttemptRecord {
                    response_status: Some(i32::from(response.status)),
                    latency_ms,
                    response_snippet: Some(truncate_snippet(
                        &response.body,
                        RESPONSE_SNIPPET_MAX_BYTES,
                    )),
                    error,
                };
                (outcome, record)
            }
            Err(e) => {
                let record = AttemptRecord {
                    response_status: None,
                    latency_ms,
                    response_snippet: None,
                    error: Some(e.to_string()),
                };
                (AttemptOutcome::Retryable, record)
            }
        };

        let now = self.clock.now();
        let transition = next_transition(outcome, attempt_number, delivery.max_attempts, now);
        let updated = WebhookDeliveryRepo::finish_attempt(
            &self.pool,
            delivery.id,
            attempt_number,
            &record,
            transition,
            now,
        )
        .await?;

        match transition.status {
            DeliveryStatus::Delivered => tracing::info!(
                delivery_id = updated.id,
                endpoint_id = endpoint.id,
                attempt = attempt_number,
                latency_ms,
                "Webhook delivered"
            ),
            DeliveryStatus::RetryScheduled => tracing::warn!(
                delivery_id = updated.id,
                endpoint_id = endpoint.id,
                attempt = attempt_number,
                next_retry_at = ?transition.next_retry_at,
                error = record.error.as_deref().unwrap_or_default(),
                "Webhook attempt failed, retry scheduled"
            ),
            DeliveryStatus::Exhausted => tracing::error!(
                delivery_id = updated.id,
                endpoint_id = endpoint.id,
                attempt = attempt_number,
                error = record.error.as_deref().unwrap_or_default(),
                "Webhook delivery exhausted"
            ),
            DeliveryStatus::Pending => {}
        }

        Ok(updated)
    }
}

/// Serialize the stored payload once and sign those exact bytes.
fn build_request(
    endpoint: &WebhookEndpoint,
    delivery: &WebhookDelivery,
) -> Result<OutboundRequest, WebhookError> {
    let body = serde_json::to_vec(&delivery.payload)?;
    let signature = compute_signature(&endpoint.secret, &body);
    Ok(OutboundRequest {
        url: endpoint.url.clone(),
        body,
        headers: vec![
            (HEADER_SIGNATURE, signature),
            (HEADER_EVENT, delivery.event_type.clone()),
            (HEADER_DELIVERY, delivery.id.to_string()),
        ],
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
