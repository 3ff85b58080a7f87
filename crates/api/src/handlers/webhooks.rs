//! Handlers for an organization's webhook endpoints and their delivery log.
//!
//! Provides CRUD for endpoints, paginated delivery history with per-attempt
//! detail, and a synchronous test delivery.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use folio_core::error::CoreError;
use folio_core::pagination::{clamp_limit, clamp_offset};
use folio_core::types::DbId;
use folio_core::webhooks::{generate_secret, validate_event_types, validate_webhook_url};
use folio_db::models::webhook::{
    CreateWebhookEndpoint, DeliveryWithAttempts, UpdateWebhookEndpoint, WebhookDeliveryAttempt,
    WebhookEndpoint,
};
use folio_db::repositories::{WebhookDeliveryRepo, WebhookRepo};
use serde::Serialize;
use validator::Validate;

use crate::editing::load_organization;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// A newly created endpoint. The signing secret is only ever returned here.
#[derive(Debug, Serialize)]
pub struct CreatedWebhookEndpoint {
    #[serde(flatten)]
    pub endpoint: WebhookEndpoint,
    pub secret: String,
}

/// One page of an endpoint's delivery log.
#[derive(Debug, Serialize)]
pub struct DeliveryPage {
    pub items: Vec<DeliveryWithAttempts>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn not_found(webhook_id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "WebhookEndpoint",
        id: webhook_id,
    })
}

// ---------------------------------------------------------------------------
// Endpoint CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/organizations/{org_id}/webhooks
///
/// Create an endpoint. A signing secret is generated when none is supplied.
pub async fn create_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Json(input): Json<CreateWebhookEndpoint>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    validate_webhook_url(&input.url).map_err(CoreError::Validation)?;
    validate_event_types(&input.subscribed_events).map_err(CoreError::Validation)?;
    load_organization(&state.pool, org_id).await?;

    let secret = input.secret.clone().unwrap_or_else(generate_secret);
    let endpoint =
        WebhookRepo::create(&state.pool, org_id, &input, &secret, state.clock.now()).await?;

    tracing::info!(
        webhook_id = endpoint.id,
        organization_id = org_id,
        url = %endpoint.url,
        user_id = auth.user_id,
        "Webhook endpoint created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedWebhookEndpoint { endpoint, secret },
        }),
    ))
}

/// GET /api/v1/organizations/{org_id}/webhooks
pub async fn list_webhooks(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let endpoints = WebhookRepo::list(&state.pool, org_id).await?;
    Ok(Json(DataResponse { data: endpoints }))
}

/// GET /api/v1/organizations/{org_id}/webhooks/{webhook_id}
pub async fn get_webhook(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, webhook_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let endpoint = WebhookRepo::find_by_id(&state.pool, org_id, webhook_id)
        .await?
        .ok_or_else(|| not_found(webhook_id))?;
    Ok(Json(DataResponse { data: endpoint }))
}

/// PUT /api/v1/organizations/{org_id}/webhooks/{webhook_id}
pub async fn update_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, webhook_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateWebhookEndpoint>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(url) = &input.url {
        validate_webhook_url(url).map_err(CoreError::Validation)?;
    }
    if let Some(events) = &input.subscribed_events {
        validate_event_types(events).map_err(CoreError::Validation)?;
    }

    let endpoint =
        WebhookRepo::update(&state.pool, org_id, webhook_id, &input, state.clock.now())
            .await?
            .ok_or_else(|| not_found(webhook_id))?;

    tracing::info!(webhook_id, user_id = auth.user_id, "Webhook endpoint updated");

    Ok(Json(DataResponse { data: endpoint }))
}

/// DELETE /api/v1/organizations/{org_id}/webhooks/{webhook_id}
///
/// Soft delete: the delivery log is kept and pending retries are abandoned.
pub async fn delete_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, webhook_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let deleted =
        WebhookRepo::soft_delete(&state.pool, org_id, webhook_id, state.clock.now()).await?;
    if !deleted {
        return Err(not_found(webhook_id));
    }

    tracing::info!(webhook_id, user_id = auth.user_id, "Webhook endpoint deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Deliveries
// ---------------------------------------------------------------------------

/// GET /api/v1/organizations/{org_id}/webhooks/{webhook_id}/deliveries
///
/// Newest first, each with its attempt log.
pub async fn list_deliveries(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, webhook_id)): Path<(DbId, DbId)>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    WebhookRepo::find_by_id(&state.pool, org_id, webhook_id)
        .await?
        .ok_or_else(|| not_found(webhook_id))?;

    let limit = clamp_limit(params.limit, 20, 100);
    let offset = clamp_offset(params.offset);

    let deliveries =
        WebhookDeliveryRepo::list_for_endpoint(&state.pool, webhook_id, limit, offset).await?;
    let total = WebhookDeliveryRepo::count_for_endpoint(&state.pool, webhook_id).await?;

    let ids: Vec<DbId> = deliveries.iter().map(|d| d.id).collect();
    let mut attempts_by_delivery: HashMap<DbId, Vec<WebhookDeliveryAttempt>> = HashMap::new();
    for attempt in WebhookDeliveryRepo::list_attempts_for(&state.pool, &ids).await? {
        attempts_by_delivery
            .entry(attempt.delivery_id)
            .or_default()
            .push(attempt);
    }

    let items = deliveries
        .into_iter()
        .map(|delivery| DeliveryWithAttempts {
            attempts: attempts_by_delivery.remove(&delivery.id).unwrap_or_default(),
            delivery,
        })
        .collect();

    Ok(Json(DataResponse {
        data: DeliveryPage {
            items,
            total,
            limit,
            offset,
        },
    }))
}

/// POST /api/v1/organizations/{org_id}/webhooks/{webhook_id}/test
///
/// Send a `webhook.test` delivery now and return its outcome. Works on
/// disabled endpoints too.
pub async fn test_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, webhook_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let result = state.webhooks.send_test(org_id, webhook_id).await?;

    tracing::info!(
        webhook_id,
        delivery_id = result.delivery.id,
        status = %result.delivery.status,
        user_id = auth.user_id,
        "Webhook test delivery sent"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}
