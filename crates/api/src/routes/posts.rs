//! Route definitions for posts and their collaborative editing state.
//!
//! All endpoints require authentication via the `AuthUser` extractor.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{locks, posts, presence, versions};
use crate::state::AppState;

/// Post routes mounted at `/organizations/{org_id}/posts`.
///
/// ```text
/// GET    /                                     -> list_posts
/// POST   /                                     -> create_post
/// GET    /{post_id}                            -> get_post
/// PUT    /{post_id}                            -> update_post
/// DELETE /{post_id}                            -> delete_post
/// GET    /{post_id}/lock                       -> get_lock
/// POST   /{post_id}/lock/acquire               -> acquire_lock
/// POST   /{post_id}/lock/refresh               -> refresh_lock
/// POST   /{post_id}/lock/release               -> release_lock
/// POST   /{post_id}/lock/takeover              -> takeover_lock
/// GET    /{post_id}/presence                   -> list_presence
/// POST   /{post_id}/presence/heartbeat         -> heartbeat
/// GET    /{post_id}/versions                   -> list_versions
/// GET    /{post_id}/versions/{version_id}      -> get_version
/// POST   /{post_id}/versions/{version_id}/restore -> restore_version
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/{post_id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        // Edit lock
        .route("/{post_id}/lock", get(locks::get_lock))
        .route("/{post_id}/lock/acquire", post(locks::acquire_lock))
        .route("/{post_id}/lock/refresh", post(locks::refresh_lock))
        .route("/{post_id}/lock/release", post(locks::release_lock))
        .route("/{post_id}/lock/takeover", post(locks::takeover_lock))
        // Presence
        .route("/{post_id}/presence", get(presence::list_presence))
        .route("/{post_id}/presence/heartbeat", post(presence::heartbeat))
        // Versions
        .route("/{post_id}/versions", get(versions::list_versions))
        .route(
            "/{post_id}/versions/{version_id}",
            get(versions::get_version),
        )
        .route(
            "/{post_id}/versions/{version_id}/restore",
            post(versions::restore_version),
        )
}
