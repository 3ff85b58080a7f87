//! Repository for the `posts` table.

use folio_core::post::PostStatus;
use folio_core::types::{DbId, EpochSecs};
use folio_core::versioning::VersionSnapshot;
use sqlx::{PgConnection, PgPool};

use crate::models::post::{CreatePost, Post, UpdatePost};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, organization_id, title, slug, content, excerpt, status, \
    custom_fields, created_by, created_at, updated_at";

/// Provides CRUD operations for posts. Writes that take part in versioning
/// run on a caller-owned connection.
pub struct PostRepo;

impl PostRepo {
    pub async fn create(
        pool: &PgPool,
        organization_id: DbId,
        created_by: DbId,
        input: &CreatePost,
        now: EpochSecs,
    ) -> Result<Post, sqlx::Error> {
        let query = format!(
            "INSERT INTO posts \
                (organization_id, title, slug, content, excerpt, status, custom_fields, \
                 created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, '{{}}'::jsonb), $8, $9, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(organization_id)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.content)
            .bind(&input.excerpt)
            .bind(input.status.unwrap_or(PostStatus::Draft).as_str())
            .bind(&input.custom_fields)
            .bind(created_by)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Find a post within an organization.
    pub async fn find_by_id(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<Post>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM posts WHERE id = $1 AND organization_id = $2");
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// Find and row-lock a post for the rest of the caller's transaction.
    ///
    /// Serializes concurrent writers of the same post, which is what keeps
    /// version sequence numbers gap-free and unique.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<Post>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM posts WHERE id = $1 AND organization_id = $2 FOR UPDATE"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(conn)
            .await
    }

    /// List an organization's posts, most recently updated first.
    pub async fn list(
        pool: &PgPool,
        organization_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM posts WHERE organization_id = $1 \
             ORDER BY updated_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(organization_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update. `status` is passed separately so autosaves can
    /// drop it.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdatePost,
        status: Option<PostStatus>,
        now: EpochSecs,
    ) -> Result<Post, sqlx::Error> {
        let query = format!(
            "UPDATE posts SET \
                title = COALESCE($2, title), \
                slug = COALESCE($3, slug), \
                content = COALESCE($4, content), \
                excerpt = COALESCE($5, excerpt), \
                status = COALESCE($6, status), \
                custom_fields = COALESCE($7, custom_fields), \
                updated_at = $8 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.content)
            .bind(&input.excerpt)
            .bind(status.map(|s| s.as_str()))
            .bind(&input.custom_fields)
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// Overwrite the versionable content of a post with a stored snapshot.
    /// Status is left untouched.
    pub async fn apply_snapshot(
        conn: &mut PgConnection,
        id: DbId,
        snapshot: &VersionSnapshot,
        now: EpochSecs,
    ) -> Result<Post, sqlx::Error> {
        let query = format!(
            "UPDATE posts SET \
                title = $2, slug = $3, content = $4, excerpt = $5, \
                custom_fields = $6, updated_at = $7 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(&snapshot.title)
            .bind(&snapshot.slug)
            .bind(&snapshot.content)
            .bind(&snapshot.excerpt)
            .bind(&snapshot.custom_fields)
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// Delete a post and, by cascade, its lock, presence, and versions.
    /// Returns the deleted row.
    pub async fn delete(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<Post>, sqlx::Error> {
        let query = format!(
            "DELETE FROM posts WHERE id = $1 AND organization_id = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }
}
