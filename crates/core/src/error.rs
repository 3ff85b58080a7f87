use crate::types::{DbId, EpochSecs};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The post is held by another editor. Carries the holder so the caller
    /// can present it and offer a takeover.
    #[error("Conflict: post {post_id} is being edited by user {holder_user_id}")]
    LockConflict {
        post_id: DbId,
        holder_user_id: DbId,
        acquired_at: EpochSecs,
        expires_at: EpochSecs,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
