//! Repository for the `webhook_deliveries` and `webhook_delivery_attempts`
//! tables.
//!
//! Deliveries are never deleted. A delivery is *due* when it is `pending` or
//! `retry_scheduled` and its `next_retry_at` has passed. Claiming a delivery
//! pushes `next_retry_at` forward by a lease, which hides it from every other
//! claimer until the attempt is finished or the lease runs out.

use folio_core::types::{DbId, EpochSecs};
use folio_core::webhooks::{DeliveryStatus, Transition};
use sqlx::PgPool;

use crate::models::webhook::{AttemptRecord, WebhookDelivery, WebhookDeliveryAttempt};

const COLUMNS: &str = "\
    id, endpoint_id, event_type, payload, attempt_count, max_attempts, status, \
    next_retry_at, last_response_status, last_error, delivered_at, created_at, updated_at";

const ATTEMPT_COLUMNS: &str = "\
    id, delivery_id, attempt_number, response_status, latency_ms, response_snippet, \
    error, created_at";

/// Provides the webhook dispatcher's persistence.
pub struct WebhookDeliveryRepo;

impl WebhookDeliveryRepo {
    /// Create a `pending` delivery that is due immediately.
    pub async fn create(
        pool: &PgPool,
        endpoint_id: DbId,
        event_type: &str,
        payload: &serde_json::Value,
        max_attempts: i32,
        now: EpochSecs,
    ) -> Result<WebhookDelivery, sqlx::Error> {
        let query = format!(
            "INSERT INTO webhook_deliveries \
                (endpoint_id, event_type, payload, max_attempts, status, next_retry_at, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 'pending', $5, $5, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebhookDelivery>(&query)
            .bind(endpoint_id)
            .bind(event_type)
            .bind(payload)
            .bind(max_attempts)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WebhookDelivery>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM webhook_deliveries WHERE id = $1");
        sqlx::query_as::<_, WebhookDelivery>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Claim one delivery if it is due. Returns `None` if it is not due,
    /// already terminal, or held by another claimer's lease.
    pub async fn claim(
        pool: &PgPool,
        id: DbId,
        now: EpochSecs,
        lease_secs: i64,
    ) -> Result<Option<WebhookDelivery>, sqlx::Error> {
        let query = format!(
            "UPDATE webhook_deliveries SET next_retry_at = $3, updated_at = $2 \
             WHERE id = $1 \
               AND status IN ('pending', 'retry_scheduled') \
               AND next_retry_at <= $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebhookDelivery>(&query)
            .bind(id)
            .bind(now)
            .bind(now + lease_secs)
            .fetch_optional(pool)
            .await
    }

    /// Claim up to `limit` due deliveries, oldest due first.
    ///
    /// Rows locked by a concurrent claimer are skipped rather than waited on.
    pub async fn claim_due(
        pool: &PgPool,
        now: EpochSecs,
        lease_secs: i64,
        limit: i64,
    ) -> Result<Vec<WebhookDelivery>, sqlx::Error> {
        let query = format!(
            "UPDATE webhook_deliveries SET next_retry_at = $2, updated_at = $1 \
             WHERE id IN ( \
                SELECT id FROM webhook_deliveries \
                WHERE status IN ('pending', 'retry_scheduled') AND next_retry_at <= $1 \
                ORDER BY next_retry_at ASC, id ASC \
                LIMIT $3 \
                FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebhookDelivery>(&query)
            .bind(now)
            .bind(now + lease_secs)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Record one attempt and move the delivery to its next state, atomically.
    pub async fn finish_attempt(
        pool: &PgPool,
        delivery_id: DbId,
        attempt_number: i32,
        record: &AttemptRecord,
        transition: Transition,
        now: EpochSecs,
    ) -> Result<WebhookDelivery, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO webhook_delivery_attempts \
                (delivery_id, attempt_number, response_status, latency_ms, \
                 response_snippet, error, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(delivery_id)
        .bind(attempt_number)
        .bind(record.response_status)
        .bind(record.latency_ms)
        .bind(&record.response_snippet)
        .bind(&record.error)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let delivered_at = (transition.status == DeliveryStatus::Delivered).then_some(now);
        let query = format!(
            "UPDATE webhook_deliveries SET \
                attempt_count = $2, \
                status = $3, \
                next_retry_at = $4, \
                last_response_status = $5, \
                last_error = $6, \
                delivered_at = COALESCE($7, delivered_at), \
                updated_at = $8 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let delivery = sqlx::query_as::<_, WebhookDelivery>(&query)
            .bind(delivery_id)
            .bind(attempt_number)
            .bind(transition.status.as_str())
            .bind(transition.next_retry_at)
            .bind(record.response_status)
            .bind(&record.error)
            .bind(delivered_at)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(delivery)
    }

    /// Give up on a delivery without an HTTP attempt, e.g. because its
    /// endpoint was deleted or disabled after it was queued.
    pub async fn mark_exhausted(
        pool: &PgPool,
        id: DbId,
        reason: &str,
        now: EpochSecs,
    ) -> Result<Option<WebhookDelivery>, sqlx::Error> {
        let query = format!(
            "UPDATE webhook_deliveries SET \
                status = 'exhausted', next_retry_at = NULL, last_error = $2, updated_at = $3 \
             WHERE id = $1 AND status IN ('pending', 'retry_scheduled') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebhookDelivery>(&query)
            .bind(id)
            .bind(reason)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Deliveries for an endpoint, newest first.
    pub async fn list_for_endpoint(
        pool: &PgPool,
        endpoint_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WebhookDelivery>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM webhook_deliveries \
             WHERE endpoint_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, WebhookDelivery>(&query)
            .bind(endpoint_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_endpoint(pool: &PgPool, endpoint_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM webhook_deliveries WHERE endpoint_id = $1")
                .bind(endpoint_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Attempt log of one delivery, in attempt order.
    pub async fn list_attempts(
        pool: &PgPool,
        delivery_id: DbId,
    ) -> Result<Vec<WebhookDeliveryAttempt>, sqlx::Error> {
        let query = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM webhook_delivery_attempts \
             WHERE delivery_id = $1 ORDER BY attempt_number ASC"
        );
        sqlx::query_as::<_, WebhookDeliveryAttempt>(&query)
            .bind(delivery_id)
            .fetch_all(pool)
            .await
    }

    /// Attempt logs of several deliveries in one round trip.
    pub async fn list_attempts_for(
        pool: &PgPool,
        delivery_ids: &[DbId],
    ) -> Result<Vec<WebhookDeliveryAttempt>, sqlx::Error> {
        let query = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM webhook_delivery_attempts \
             WHERE delivery_id = ANY($1) ORDER BY delivery_id ASC, attempt_number ASC"
        );
        sqlx::query_as::<_, WebhookDeliveryAttempt>(&query)
            .bind(delivery_ids)
            .fetch_all(pool)
            .await
    }
}
