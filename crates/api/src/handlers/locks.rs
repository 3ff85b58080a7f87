//! Handlers for per-post edit locks.
//!
//! A lock is advisory towards readers but enforced on writes: while another
//! user holds a live lock, post updates, restores, and deletes are refused
//! with `LOCK_CONFLICT`. Expired locks are treated as absent everywhere.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use folio_core::collaboration::LockState;
use folio_core::error::CoreError;
use folio_core::types::DbId;
use folio_db::models::edit_lock::EditLock;
use folio_db::repositories::{EditLockRepo, LockAttempt};

use crate::editing::load_post;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn conflict(lock: &EditLock) -> AppError {
    AppError::Core(CoreError::LockConflict {
        post_id: lock.post_id,
        holder_user_id: lock.holder_user_id,
        acquired_at: lock.acquired_at,
        expires_at: lock.expires_at,
    })
}

/// GET /api/v1/organizations/{org_id}/posts/{post_id}/lock
pub async fn get_lock(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_post(&state.pool, org_id, post_id).await?;

    let now = state.clock.now();
    let lock_state = EditLockRepo::get(&state.pool, post_id)
        .await?
        .map_or(LockState::Unlocked, |lock| lock.state(now));
    Ok(Json(DataResponse { data: lock_state }))
}

/// POST /api/v1/organizations/{org_id}/posts/{post_id}/lock/acquire
///
/// Returns 409 with the holder's details if someone else holds a live lock.
/// Re-acquiring a lock you already hold extends it.
pub async fn acquire_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_post(&state.pool, org_id, post_id).await?;

    let attempt = EditLockRepo::acquire(
        &state.pool,
        post_id,
        auth.user_id,
        state.clock.now(),
        state.config.lock_ttl_secs,
    )
    .await?;

    match attempt {
        LockAttempt::Granted(lock) => {
            tracing::info!(
                post_id,
                user_id = auth.user_id,
                expires_at = lock.expires_at,
                "Edit lock acquired"
            );
            Ok(Json(DataResponse { data: lock }))
        }
        LockAttempt::Held(lock) => {
            tracing::debug!(
                post_id,
                user_id = auth.user_id,
                holder_user_id = lock.holder_user_id,
                "Edit lock acquire refused"
            );
            Err(conflict(&lock))
        }
    }
}

/// POST /api/v1/organizations/{org_id}/posts/{post_id}/lock/refresh
///
/// Extend a lock the caller holds. An expiry is never moved backwards.
pub async fn refresh_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_post(&state.pool, org_id, post_id).await?;

    let now = state.clock.now();
    let refreshed = EditLockRepo::refresh(
        &state.pool,
        post_id,
        auth.user_id,
        now,
        state.config.lock_ttl_secs,
    )
    .await?;

    match refreshed {
        Some(lock) => {
            tracing::debug!(
                post_id,
                user_id = auth.user_id,
                expires_at = lock.expires_at,
                "Edit lock refreshed"
            );
            Ok(Json(DataResponse { data: lock }))
        }
        // Either someone took the lock over or it lapsed.
        None => match EditLockRepo::get_live(&state.pool, post_id, now).await? {
            Some(lock) => Err(conflict(&lock)),
            None => Err(AppError::Core(CoreError::Conflict(
                "You do not hold a live lock on this post".into(),
            ))),
        },
    }
}

/// POST /api/v1/organizations/{org_id}/posts/{post_id}/lock/release
///
/// Idempotent: releasing a lock you do not hold reports `released: false`.
pub async fn release_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_post(&state.pool, org_id, post_id).await?;

    let released = EditLockRepo::release(&state.pool, post_id, auth.user_id).await?;
    if released {
        tracing::info!(post_id, user_id = auth.user_id, "Edit lock released");
    }

    Ok(Json(DataResponse {
        data: serde_json::json!({ "released": released }),
    }))
}

/// POST /api/v1/organizations/{org_id}/posts/{post_id}/lock/takeover
///
/// Forcibly take the lock. The evicted holder, if any, is returned and finds
/// out on their next refresh.
pub async fn takeover_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((org_id, post_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    load_post(&state.pool, org_id, post_id).await?;

    let takeover = EditLockRepo::takeover(
        &state.pool,
        post_id,
        auth.user_id,
        state.clock.now(),
        state.config.lock_ttl_secs,
    )
    .await?;

    match &takeover.evicted {
        Some(evicted) => tracing::warn!(
            post_id,
            user_id = auth.user_id,
            evicted_user_id = evicted.holder_user_id,
            evicted_acquired_at = evicted.acquired_at,
            "Edit lock taken over"
        ),
        None => tracing::info!(
            post_id,
            user_id = auth.user_id,
            "Edit lock taken over with no live holder"
        ),
    }

    Ok(Json(DataResponse { data: takeover }))
}
