//! Repository for the `webhook_endpoints` table.
//!
//! Endpoints are soft-deleted; every read here excludes deleted rows.

use folio_core::types::{DbId, EpochSecs};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::webhook::{CreateWebhookEndpoint, UpdateWebhookEndpoint, WebhookEndpoint};

const COLUMNS: &str = "\
    id, organization_id, name, url, subscribed_events, secret, active, \
    created_at, updated_at";

/// Provides CRUD operations for webhook endpoints.
pub struct WebhookRepo;

impl WebhookRepo {
    /// Create an endpoint. `secret` is the resolved signing secret.
    pub async fn create(
        pool: &PgPool,
        organization_id: DbId,
        input: &CreateWebhookEndpoint,
        secret: &str,
        now: EpochSecs,
    ) -> Result<WebhookEndpoint, sqlx::Error> {
        let query = format!(
            "INSERT INTO webhook_endpoints \
                (organization_id, name, url, subscribed_events, secret, active, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, true), $7, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebhookEndpoint>(&query)
            .bind(organization_id)
            .bind(&input.name)
            .bind(&input.url)
            .bind(Json(&input.subscribed_events))
            .bind(secret)
            .bind(input.active)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// List an organization's endpoints, newest first.
    pub async fn list(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Vec<WebhookEndpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM webhook_endpoints \
             WHERE organization_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, WebhookEndpoint>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await
    }

    /// Active endpoints of an organization. Event filtering happens in the
    /// caller against `subscribed_events`.
    pub async fn list_active(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Vec<WebhookEndpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM webhook_endpoints \
             WHERE organization_id = $1 AND active = true AND deleted_at IS NULL \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, WebhookEndpoint>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await
    }

    /// Find an endpoint within an organization.
    pub async fn find_by_id(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<WebhookEndpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM webhook_endpoints \
             WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, WebhookEndpoint>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// Find an endpoint by id regardless of organization. Used by the
    /// delivery worker, which only knows the delivery's `endpoint_id`.
    pub async fn find_for_delivery(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WebhookEndpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM webhook_endpoints WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, WebhookEndpoint>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update an endpoint. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
        input: &UpdateWebhookEndpoint,
        now: EpochSecs,
    ) -> Result<Option<WebhookEndpoint>, sqlx::Error> {
        let query = format!(
            "UPDATE webhook_endpoints SET \
                name = COALESCE($3, name), \
                url = COALESCE($4, url), \
                subscribed_events = COALESCE($5, subscribed_events), \
                secret = COALESCE($6, secret), \
                active = COALESCE($7, active), \
                updated_at = $8 \
             WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WebhookEndpoint>(&query)
            .bind(id)
            .bind(organization_id)
            .bind(&input.name)
            .bind(&input.url)
            .bind(input.subscribed_events.as_ref().map(Json))
            .bind(&input.secret)
            .bind(input.active)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete an endpoint. Its deliveries are kept for audit.
    /// Returns `true` if a row was marked deleted.
    pub async fn soft_delete(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
        now: EpochSecs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE webhook_endpoints SET deleted_at = $3, active = false, updated_at = $3 \
             WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(organization_id)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
