//! Route definitions for webhook endpoints.
//!
//! All endpoints require authentication via the `AuthUser` extractor.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Webhook routes mounted at `/organizations/{org_id}/webhooks`.
///
/// ```text
/// GET    /                              -> list_webhooks
/// POST   /                              -> create_webhook
/// GET    /{webhook_id}                  -> get_webhook
/// PUT    /{webhook_id}                  -> update_webhook
/// DELETE /{webhook_id}                  -> delete_webhook
/// GET    /{webhook_id}/deliveries       -> list_deliveries
/// POST   /{webhook_id}/test             -> test_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(webhooks::list_webhooks).post(webhooks::create_webhook),
        )
        .route(
            "/{webhook_id}",
            get(webhooks::get_webhook)
                .put(webhooks::update_webhook)
                .delete(webhooks::delete_webhook),
        )
        .route(
            "/{webhook_id}/deliveries",
            get(webhooks::list_deliveries),
        )
        .route("/{webhook_id}/test", post(webhooks::test_webhook))
}
