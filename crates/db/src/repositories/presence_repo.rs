//! Repository for the `post_presence` table.

use folio_core::collaboration::presence_cutoff;
use folio_core::types::{DbId, EpochSecs};
use sqlx::PgPool;

use crate::models::presence::PresenceEntry;

const COLUMNS: &str = "post_id, user_id, last_seen_at";

/// Provides heartbeat storage for the presence tracker.
pub struct PresenceRepo;

impl PresenceRepo {
    /// Record a heartbeat. One row per (post, user); `last_seen_at` never
    /// moves backwards.
    pub async fn upsert(
        pool: &PgPool,
        post_id: DbId,
        user_id: DbId,
        now: EpochSecs,
    ) -> Result<PresenceEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO post_presence ({COLUMNS}) VALUES ($1, $2, $3) \
             ON CONFLICT (post_id, user_id) DO UPDATE \
             SET last_seen_at = GREATEST(post_presence.last_seen_at, EXCLUDED.last_seen_at) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PresenceEntry>(&query)
            .bind(post_id)
            .bind(user_id)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Users seen within the last `ttl_secs`, most recent first.
    pub async fn list_live(
        pool: &PgPool,
        post_id: DbId,
        now: EpochSecs,
        ttl_secs: i64,
    ) -> Result<Vec<PresenceEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM post_presence \
             WHERE post_id = $1 AND last_seen_at > $2 \
             ORDER BY last_seen_at DESC, user_id ASC"
        );
        sqlx::query_as::<_, PresenceEntry>(&query)
            .bind(post_id)
            .bind(presence_cutoff(now, ttl_secs))
            .fetch_all(pool)
            .await
    }

    /// Delete rows last seen before `cutoff`. Returns the number removed.
    pub async fn purge_older_than(pool: &PgPool, cutoff: EpochSecs) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM post_presence WHERE last_seen_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
