//! Repository for the `post_versions` table.

use folio_core::types::{DbId, EpochSecs};
use folio_core::versioning::VersionSnapshot;
use sqlx::{PgConnection, PgPool};

use crate::models::post_version::{PostVersion, PostVersionSummary};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, post_id, author_user_id, title, slug, content, excerpt, \
    custom_fields, sequence, created_at";

const SUMMARY_COLUMNS: &str = "id, post_id, author_user_id, title, slug, sequence, created_at";

/// Provides version history operations.
pub struct PostVersionRepo;

impl PostVersionRepo {
    /// Insert a version with the next sequence number for the post.
    ///
    /// Runs on the caller's connection. The caller is expected to hold the
    /// post row lock so two writers never compute the same sequence; the
    /// unique constraint on `(post_id, sequence)` rejects it if they do.
    pub async fn create(
        conn: &mut PgConnection,
        post_id: DbId,
        author_user_id: DbId,
        snapshot: &VersionSnapshot,
        now: EpochSecs,
    ) -> Result<PostVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO post_versions \
                (post_id, author_user_id, title, slug, content, excerpt, custom_fields, \
                 sequence, created_at) \
             VALUES ( \
                $1, $2, $3, $4, $5, $6, $7, \
                (SELECT COALESCE(MAX(sequence), 0) + 1 FROM post_versions WHERE post_id = $1), \
                $8 \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PostVersion>(&query)
            .bind(post_id)
            .bind(author_user_id)
            .bind(&snapshot.title)
            .bind(&snapshot.slug)
            .bind(&snapshot.content)
            .bind(&snapshot.excerpt)
            .bind(&snapshot.custom_fields)
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// List versions of a post, highest sequence first.
    pub async fn list_by_post(
        pool: &PgPool,
        post_id: DbId,
    ) -> Result<Vec<PostVersionSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM post_versions \
             WHERE post_id = $1 ORDER BY sequence DESC"
        );
        sqlx::query_as::<_, PostVersionSummary>(&query)
            .bind(post_id)
            .fetch_all(pool)
            .await
    }

    /// Find one version of a post.
    pub async fn find(
        pool: &PgPool,
        post_id: DbId,
        version_id: DbId,
    ) -> Result<Option<PostVersion>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM post_versions WHERE id = $1 AND post_id = $2");
        sqlx::query_as::<_, PostVersion>(&query)
            .bind(version_id)
            .bind(post_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn count_by_post(pool: &PgPool, post_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM post_versions WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Delete everything but the newest `max_keep` versions of a post.
    /// Returns the number of versions removed.
    pub async fn cleanup_old(
        pool: &PgPool,
        post_id: DbId,
        max_keep: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM post_versions WHERE id IN ( \
                SELECT id FROM post_versions WHERE post_id = $1 \
                ORDER BY sequence DESC OFFSET $2 \
             )",
        )
        .bind(post_id)
        .bind(max_keep)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
