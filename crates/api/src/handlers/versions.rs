//! Handlers for post version history.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use folio_core::error::CoreError;
use folio_core::types::DbId;
use folio_db::repositories::PostVersionRepo;

use crate::editing::{self, load_post};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/organizations/{org_id}/posts/{post_id}/versions
///
/// Version summaries, newest first.
pub async fn list_versions(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_post(&state.pool, org_id, post_id).await?;

    let versions = PostVersionRepo::list_by_post(&state.pool, post_id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// GET /api/v1/organizations/{org_id}/posts/{post_id}/versions/{version_id}
pub async fn get_version(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id, version_id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_post(&state.pool, org_id, post_id).await?;

    let version = PostVersionRepo::find(&state.pool, post_id, version_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "PostVersion",
            id: version_id,
        }))?;
    Ok(Json(DataResponse { data: version }))
}

/// POST /api/v1/organizations/{org_id}/posts/{post_id}/versions/{version_id}/restore
pub async fn restore_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id, version_id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let post =
        editing::restore_version(&state, auth.user_id, org_id, post_id, version_id).await?;
    Ok(Json(DataResponse { data: post }))
}
