pub mod health;
pub mod posts;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /organizations/{org_id}/posts                                   list, create
/// /organizations/{org_id}/posts/{post_id}                         get, update, delete
///
/// /organizations/{org_id}/posts/{post_id}/lock                    lock state (GET)
/// /organizations/{org_id}/posts/{post_id}/lock/acquire            acquire (POST)
/// /organizations/{org_id}/posts/{post_id}/lock/refresh            refresh (POST)
/// /organizations/{org_id}/posts/{post_id}/lock/release            release (POST)
/// /organizations/{org_id}/posts/{post_id}/lock/takeover           takeover (POST)
///
/// /organizations/{org_id}/posts/{post_id}/presence                live viewers (GET)
/// /organizations/{org_id}/posts/{post_id}/presence/heartbeat      heartbeat (POST)
///
/// /organizations/{org_id}/posts/{post_id}/versions                list (GET)
/// /organizations/{org_id}/posts/{post_id}/versions/{id}           get (GET)
/// /organizations/{org_id}/posts/{post_id}/versions/{id}/restore   restore (POST)
///
/// /organizations/{org_id}/webhooks                                list, create
/// /organizations/{org_id}/webhooks/{id}                           get, update, delete
/// /organizations/{org_id}/webhooks/{id}/deliveries                delivery log (GET)
/// /organizations/{org_id}/webhooks/{id}/test                      test delivery (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/organizations/{org_id}/posts", posts::router())
        .nest("/organizations/{org_id}/webhooks", webhooks::router())
}
