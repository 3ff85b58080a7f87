//! Webhook endpoint, delivery, and attempt models.

use folio_core::types::{DbId, EpochSecs};
use folio_core::webhooks::{subscribes_to, DeliveryStatus};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A row from the `webhook_endpoints` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookEndpoint {
    pub id: DbId,
    pub organization_id: DbId,
    pub name: String,
    pub url: String,
    pub subscribed_events: Json<Vec<String>>,
    #[serde(skip_serializing)]
    pub secret: String,
    pub active: bool,
    pub created_at: EpochSecs,
    pub updated_at: EpochSecs,
}

impl WebhookEndpoint {
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        subscribes_to(&self.subscribed_events, event_type)
    }
}

/// DTO for creating an endpoint. A secret is generated when none is given.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWebhookEndpoint {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(url)]
    pub url: String,
    pub subscribed_events: Vec<String>,
    #[validate(length(min = 16, max = 256))]
    pub secret: Option<String>,
    pub active: Option<bool>,
}

/// DTO for updating an endpoint. Only non-`None` fields are applied.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateWebhookEndpoint {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
    pub subscribed_events: Option<Vec<String>>,
    #[validate(length(min = 16, max = 256))]
    pub secret: Option<String>,
    pub active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// A row from the `webhook_deliveries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookDelivery {
    pub id: DbId,
    pub endpoint_id: DbId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub status: String,
    pub next_retry_at: Option<EpochSecs>,
    pub last_response_status: Option<i32>,
    pub last_error: Option<String>,
    pub delivered_at: Option<EpochSecs>,
    pub created_at: EpochSecs,
    pub updated_at: EpochSecs,
}

impl WebhookDelivery {
    /// Parsed status. Rows are constrained by a CHECK, so unknown values
    /// only occur if the schema drifts.
    pub fn delivery_status(&self) -> Option<DeliveryStatus> {
        self.status.parse().ok()
    }
}

/// A row from the `webhook_delivery_attempts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookDeliveryAttempt {
    pub id: DbId,
    pub delivery_id: DbId,
    pub attempt_number: i32,
    pub response_status: Option<i32>,
    pub latency_ms: i64,
    pub response_snippet: Option<String>,
    pub error: Option<String>,
    pub created_at: EpochSecs,
}

/// What one HTTP attempt produced, ready to be recorded.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub response_status: Option<i32>,
    pub latency_ms: i64,
    pub response_snippet: Option<String>,
    pub error: Option<String>,
}

/// A delivery together with its attempt log, newest attempt last.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryWithAttempts {
    #[serde(flatten)]
    pub delivery: WebhookDelivery,
    pub attempts: Vec<WebhookDeliveryAttempt>,
}
