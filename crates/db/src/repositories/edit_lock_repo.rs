//! Repository for the `post_edit_locks` table.
//!
//! Every contended write is a single conditional statement. An expired row
//! is treated exactly like a missing one.

use folio_core::collaboration::lock_is_live;
use folio_core::types::{DbId, EpochSecs};
use sqlx::PgPool;

use crate::models::edit_lock::{EditLock, LockTakeover};

/// Column list for `post_edit_locks` queries.
const COLUMNS: &str = "post_id, holder_user_id, acquired_at, expires_at";

/// How many times `acquire` re-reads when the lock disappears between the
/// failed upsert and the follow-up read.
const ACQUIRE_ATTEMPTS: usize = 3;

/// Outcome of an acquire attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAttempt {
    /// The caller now holds the lock.
    Granted(EditLock),
    /// Someone else holds a live lock.
    Held(EditLock),
}

/// Provides the lock manager's storage operations.
pub struct EditLockRepo;

impl EditLockRepo {
    /// Try to take the lock on a post.
    ///
    /// Succeeds when there is no row, the row is expired, or the caller
    /// already holds it. In the last case the call acts as a refresh and the
    /// existing `acquired_at` is kept.
    pub async fn acquire(
        pool: &PgPool,
        post_id: DbId,
        user_id: DbId,
        now: EpochSecs,
        ttl_secs: i64,
    ) -> Result<LockAttempt, sqlx::Error> {
        let query = format!(
            "INSERT INTO post_edit_locks ({COLUMNS}) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (post_id) DO UPDATE SET \
                holder_user_id = EXCLUDED.holder_user_id, \
                acquired_at = CASE \
                    WHEN post_edit_locks.holder_user_id = EXCLUDED.holder_user_id \
                     AND post_edit_locks.expires_at >= EXCLUDED.acquired_at \
                    THEN post_edit_locks.acquired_at \
                    ELSE EXCLUDED.acquired_at END, \
                expires_at = GREATEST(post_edit_locks.expires_at, EXCLUDED.expires_at) \
             WHERE post_edit_locks.expires_at < EXCLUDED.acquired_at \
                OR post_edit_locks.holder_user_id = EXCLUDED.holder_user_id \
             RETURNING {COLUMNS}"
        );
        let expires_at = folio_core::collaboration::lock_expiry(now, ttl_secs);

        for _ in 0..ACQUIRE_ATTEMPTS {
            let granted = sqlx::query_as::<_, EditLock>(&query)
                .bind(post_id)
                .bind(user_id)
                .bind(now)
                .bind(expires_at)
                .fetch_optional(pool)
                .await?;
            if let Some(lock) = granted {
                return Ok(LockAttempt::Granted(lock));
            }
            // The upsert was rejected, so a live lock existed. It may have been
            // released since; only report it if it is still there.
            if let Some(current) = Self::get_live(pool, post_id, now).await? {
                return Ok(LockAttempt::Held(current));
            }
        }
        Err(sqlx::Error::Protocol(format!(
            "edit lock on post {post_id} kept changing during acquire"
        )))
    }

    /// Extend the caller's live lock to `max(expires_at, now + ttl)`.
    ///
    /// Returns `None` when the caller does not hold a live lock.
    pub async fn refresh(
        pool: &PgPool,
        post_id: DbId,
        user_id: DbId,
        now: EpochSecs,
        ttl_secs: i64,
    ) -> Result<Option<EditLock>, sqlx::Error> {
        let query = format!(
            "UPDATE post_edit_locks SET expires_at = GREATEST(expires_at, $4) \
             WHERE post_id = $1 AND holder_user_id = $2 AND expires_at >= $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EditLock>(&query)
            .bind(post_id)
            .bind(user_id)
            .bind(now)
            .bind(folio_core::collaboration::lock_expiry(now, ttl_secs))
            .fetch_optional(pool)
            .await
    }

    /// Release the caller's lock. Returns `true` if a row was removed.
    ///
    /// Releasing a lock the caller does not hold is a no-op.
    pub async fn release(pool: &PgPool, post_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM post_edit_locks WHERE post_id = $1 AND holder_user_id = $2")
                .bind(post_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace whatever lock exists with a fresh one held by `user_id`.
    ///
    /// The prior holder is reported only if their lock was still live.
    pub async fn takeover(
        pool: &PgPool,
        post_id: DbId,
        user_id: DbId,
        now: EpochSecs,
        ttl_secs: i64,
    ) -> Result<LockTakeover, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let select = format!("SELECT {COLUMNS} FROM post_edit_locks WHERE post_id = $1 FOR UPDATE");
        let prior = sqlx::query_as::<_, EditLock>(&select)
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;

        let upsert = format!(
            "INSERT INTO post_edit_locks ({COLUMNS}) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (post_id) DO UPDATE SET \
                holder_user_id = EXCLUDED.holder_user_id, \
                acquired_at = EXCLUDED.acquired_at, \
                expires_at = EXCLUDED.expires_at \
             RETURNING {COLUMNS}"
        );
        let lock = sqlx::query_as::<_, EditLock>(&upsert)
            .bind(post_id)
            .bind(user_id)
            .bind(now)
            .bind(folio_core::collaboration::lock_expiry(now, ttl_secs))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let evicted =
            prior.filter(|p| p.holder_user_id != user_id && lock_is_live(p.expires_at, now));
        Ok(LockTakeover { lock, evicted })
    }

    /// The stored row for a post, expired or not.
    pub async fn get(pool: &PgPool, post_id: DbId) -> Result<Option<EditLock>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM post_edit_locks WHERE post_id = $1");
        sqlx::query_as::<_, EditLock>(&query)
            .bind(post_id)
            .fetch_optional(pool)
            .await
    }

    /// The lock on a post if it is live at `now`.
    pub async fn get_live(
        pool: &PgPool,
        post_id: DbId,
        now: EpochSecs,
    ) -> Result<Option<EditLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM post_edit_locks WHERE post_id = $1 AND expires_at >= $2"
        );
        sqlx::query_as::<_, EditLock>(&query)
            .bind(post_id)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Delete rows that expired before `now`. Returns the number removed.
    pub async fn cleanup_expired(pool: &PgPool, now: EpochSecs) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM post_edit_locks WHERE expires_at < $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
