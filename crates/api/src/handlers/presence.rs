//! Handlers for "who is viewing this post".

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use folio_core::types::DbId;
use folio_db::repositories::PresenceRepo;

use crate::editing::load_post;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/organizations/{org_id}/posts/{post_id}/presence/heartbeat
///
/// Mark the caller as present. Clients call this periodically while the
/// editor is open.
pub async fn heartbeat(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_post(&state.pool, org_id, post_id).await?;

    let entry = PresenceRepo::upsert(&state.pool, post_id, auth.user_id, state.clock.now()).await?;
    Ok(Json(DataResponse { data: entry }))
}

/// GET /api/v1/organizations/{org_id}/posts/{post_id}/presence
///
/// Users seen within the presence window, most recent first.
pub async fn list_presence(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_post(&state.pool, org_id, post_id).await?;

    let users = PresenceRepo::list_live(
        &state.pool,
        post_id,
        state.clock.now(),
        state.config.presence_ttl_secs,
    )
    .await?;
    Ok(Json(DataResponse { data: users }))
}
