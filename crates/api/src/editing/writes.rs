//! Transactional post writes.

use folio_core::error::CoreError;
use folio_core::post::{
    effective_status, validate_custom_fields, validate_excerpt, validate_slug, validate_title,
};
use folio_core::types::{DbId, EpochSecs};
use folio_core::versioning::should_snapshot;
use folio_core::webhooks::events;
use folio_db::models::post::{CreatePost, Post, UpdatePost};
use folio_db::repositories::{PostRepo, PostVersionRepo};
use sqlx::{Connection, PgConnection};
use validator::Validate;

use super::effects::{lifecycle_events, AfterCommit};
use super::guard::{ensure_editable, load_organization};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Create / update / delete
// ---------------------------------------------------------------------------

pub async fn create_post(
    state: &AppState,
    user_id: DbId,
    organization_id: DbId,
    input: CreatePost,
) -> AppResult<Post> {
    input.validate()?;
    validate_title(&input.title).map_err(CoreError::Validation)?;
    validate_slug(&input.slug).map_err(CoreError::Validation)?;
    if let Some(fields) = &input.custom_fields {
        validate_custom_fields(fields).map_err(CoreError::Validation)?;
    }

    let org = load_organization(&state.pool, organization_id).await?;
    let post = PostRepo::create(&state.pool, org.id, user_id, &input, state.clock.now()).await?;

    tracing::info!(post_id = post.id, organization_id = org.id, user_id, "Post created");

    AfterCommit::new(state, &org, &post)
        .events([events::POST_CREATED])
        .events(lifecycle_events(None, &post))
        .run()
        .await;
    Ok(post)
}

/// Apply a partial update under the edit-lock rule.
///
/// A regular save records the pre-update state as a new version in the same
/// transaction. An autosave (`auto_save: true`) records no version and keeps
/// the current status.
pub async fn update_post(
    state: &AppState,
    user_id: DbId,
    organization_id: DbId,
    post_id: DbId,
    input: UpdatePost,
) -> AppResult<Post> {
    validate_update(&input)?;

    let org = load_organization(&state.pool, organization_id).await?;
    let now = state.clock.now();
    ensure_editable(&state.pool, post_id, user_id, now).await?;

    let mut tx = state.pool.begin().await?;
    let current = PostRepo::find_for_update(&mut *tx, org.id, post_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Post",
            id: post_id,
        })?;

    if should_snapshot(input.auto_save) {
        snapshot_in_savepoint(&mut tx, &current, user_id, now).await?;
    }

    let status = effective_status(input.status, input.auto_save);
    let updated = PostRepo::update(&mut *tx, post_id, &input, status, now).await?;
    tx.commit().await?;

    tracing::info!(
        post_id,
        user_id,
        auto_save = input.auto_save,
        status = %updated.status,
        "Post updated"
    );

    let mut effects = AfterCommit::new(state, &org, &updated)
        .events([events::POST_UPDATED])
        .events(lifecycle_events(Some(&current), &updated))
        .previous_slug(&current.slug);
    if !input.auto_save {
        effects = effects.trim_versions();
    }
    effects.run().await;
    Ok(updated)
}

pub async fn delete_post(
    state: &AppState,
    user_id: DbId,
    organization_id: DbId,
    post_id: DbId,
) -> AppResult<Post> {
    let org = load_organization(&state.pool, organization_id).await?;
    ensure_editable(&state.pool, post_id, user_id, state.clock.now()).await?;

    let deleted = PostRepo::delete(&state.pool, org.id, post_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Post",
            id: post_id,
        })?;

    tracing::info!(post_id, user_id, "Post deleted");

    AfterCommit::new(state, &org, &deleted)
        .events([events::POST_DELETED])
        .run()
        .await;
    Ok(deleted)
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// Roll a post back to a stored version.
///
/// The current state is versioned first, so a restore can itself be undone.
/// Status is not part of a version and is left as is.
pub async fn restore_version(
    state: &AppState,
    user_id: DbId,
    organization_id: DbId,
    post_id: DbId,
    version_id: DbId,
) -> AppResult<Post> {
    let org = load_organization(&state.pool, organization_id).await?;
    let now = state.clock.now();
    ensure_editable(&state.pool, post_id, user_id, now).await?;

    let version = PostVersionRepo::find(&state.pool, post_id, version_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "PostVersion",
            id: version_id,
        })?;

    let mut tx = state.pool.begin().await?;
    let current = PostRepo::find_for_update(&mut *tx, org.id, post_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Post",
            id: post_id,
        })?;
    PostVersionRepo::create(&mut *tx, post_id, user_id, &current.snapshot(), now).await?;
    let restored = PostRepo::apply_snapshot(&mut *tx, post_id, &version.snapshot(), now).await?;
    tx.commit().await?;

    tracing::info!(
        post_id,
        user_id,
        version_id,
        sequence = version.sequence,
        "Post restored from version"
    );

    AfterCommit::new(state, &org, &restored)
        .events([events::POST_RESTORED])
        .previous_slug(&current.slug)
        .trim_versions()
        .run()
        .await;
    Ok(restored)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_update(input: &UpdatePost) -> AppResult<()> {
    input.validate()?;
    if let Some(title) = &input.title {
        validate_title(title).map_err(CoreError::Validation)?;
    }
    if let Some(slug) = &input.slug {
        validate_slug(slug).map_err(CoreError::Validation)?;
    }
    if let Some(excerpt) = &input.excerpt {
        validate_excerpt(excerpt).map_err(CoreError::Validation)?;
    }
    if let Some(fields) = &input.custom_fields {
        validate_custom_fields(fields).map_err(CoreError::Validation)?;
    }
    Ok(())
}

/// Record the pre-update state as a version inside a savepoint.
///
/// A failed snapshot is rolled back to the savepoint and logged; the update
/// itself still goes through. Only errors that leave the outer transaction
/// unusable are returned.
async fn snapshot_in_savepoint(
    conn: &mut PgConnection,
    post: &Post,
    author_user_id: DbId,
    now: EpochSecs,
) -> Result<(), AppError> {
    let mut savepoint = conn.begin().await?;
    match PostVersionRepo::create(&mut *savepoint, post.id, author_user_id, &post.snapshot(), now)
        .await
    {
        Ok(version) => {
            savepoint.commit().await?;
            tracing::debug!(
                post_id = post.id,
                version_id = version.id,
                sequence = version.sequence,
                "Version recorded"
            );
        }
        Err(e) => {
            savepoint.rollback().await?;
            tracing::warn!(
                post_id = post.id,
                error = %e,
                "Version snapshot failed, continuing with update"
            );
        }
    }
    Ok(())
}
