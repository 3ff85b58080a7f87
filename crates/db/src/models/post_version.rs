//! Post version model.

use folio_core::types::{DbId, EpochSecs};
use folio_core::versioning::VersionSnapshot;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `post_versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostVersion {
    pub id: DbId,
    pub post_id: DbId,
    pub author_user_id: DbId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub custom_fields: serde_json::Value,
    pub sequence: i32,
    pub created_at: EpochSecs,
}

impl PostVersion {
    pub fn snapshot(&self) -> VersionSnapshot {
        VersionSnapshot {
            title: self.title.clone(),
            slug: self.slug.clone(),
            content: self.content.clone(),
            excerpt: self.excerpt.clone(),
            custom_fields: self.custom_fields.clone(),
        }
    }
}

/// Version listing entry without the full content body.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostVersionSummary {
    pub id: DbId,
    pub post_id: DbId,
    pub author_user_id: DbId,
    pub title: String,
    pub slug: String,
    pub sequence: i32,
    pub created_at: EpochSecs,
}
