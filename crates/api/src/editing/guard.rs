//! Preconditions shared by post handlers.

use folio_core::collaboration::LockState;
use folio_core::error::CoreError;
use folio_core::types::{DbId, EpochSecs};
use folio_db::models::organization::Organization;
use folio_db::models::post::Post;
use folio_db::repositories::{EditLockRepo, OrganizationRepo, PostRepo};
use folio_db::DbPool;

use crate::error::AppResult;

/// Load an organization or fail with 404.
pub async fn load_organization(pool: &DbPool, organization_id: DbId) -> AppResult<Organization> {
    OrganizationRepo::find_by_id(pool, organization_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "Organization",
                id: organization_id,
            }
            .into()
        })
}

/// Load a post within an organization or fail with 404.
pub async fn load_post(pool: &DbPool, organization_id: DbId, post_id: DbId) -> AppResult<Post> {
    PostRepo::find_by_id(pool, organization_id, post_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "Post",
                id: post_id,
            }
            .into()
        })
}

/// Fail with a lock conflict if someone other than `user_id` holds a live
/// lock on the post. An unlocked post is editable by anyone.
pub async fn ensure_editable(
    pool: &DbPool,
    post_id: DbId,
    user_id: DbId,
    now: EpochSecs,
) -> AppResult<()> {
    let state = match EditLockRepo::get(pool, post_id).await? {
        Some(lock) => lock.state(now),
        None => LockState::Unlocked,
    };
    match state {
        LockState::Locked {
            holder_user_id,
            acquired_at,
            expires_at,
        } if !state.permits_write_by(user_id) => Err(CoreError::LockConflict {
            post_id,
            holder_user_id,
            acquired_at,
            expires_at,
        }
        .into()),
        _ => Ok(()),
    }
}
