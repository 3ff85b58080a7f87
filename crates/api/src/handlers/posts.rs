//! Handlers for post CRUD.
//!
//! Writes go through [`crate::editing`], which applies the edit-lock rule,
//! versioning, and post-commit side effects.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use folio_core::pagination::{clamp_limit, clamp_offset};
use folio_core::types::DbId;
use folio_db::models::post::{CreatePost, UpdatePost};
use folio_db::repositories::PostRepo;

use crate::editing::{self, load_organization, load_post};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/organizations/{org_id}/posts
pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Json(input): Json<CreatePost>,
) -> AppResult<impl IntoResponse> {
    let post = editing::create_post(&state, auth.user_id, org_id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: post })))
}

/// GET /api/v1/organizations/{org_id}/posts
pub async fn list_posts(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    load_organization(&state.pool, org_id).await?;

    let limit = clamp_limit(params.limit, 20, 100);
    let offset = clamp_offset(params.offset);
    let posts = PostRepo::list(&state.pool, org_id, limit, offset).await?;
    Ok(Json(DataResponse { data: posts }))
}

/// GET /api/v1/organizations/{org_id}/posts/{post_id}
pub async fn get_post(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let post = load_post(&state.pool, org_id, post_id).await?;
    Ok(Json(DataResponse { data: post }))
}

/// PUT /api/v1/organizations/{org_id}/posts/{post_id}
///
/// Accepts `auto_save: true` for background saves, which skip versioning
/// and ignore `status`.
pub async fn update_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdatePost>,
) -> AppResult<impl IntoResponse> {
    let post = editing::update_post(&state, auth.user_id, org_id, post_id, input).await?;
    Ok(Json(DataResponse { data: post }))
}

/// DELETE /api/v1/organizations/{org_id}/posts/{post_id}
pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    editing::delete_post(&state, auth.user_id, org_id, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
