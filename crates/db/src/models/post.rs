//! Post model and write DTOs.

use folio_core::post::PostStatus;
use folio_core::types::{DbId, EpochSecs};
use folio_core::versioning::VersionSnapshot;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: DbId,
    pub organization_id: DbId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub status: String,
    pub custom_fields: serde_json::Value,
    pub created_by: DbId,
    pub created_at: EpochSecs,
    pub updated_at: EpochSecs,
}

impl Post {
    /// The versionable content of the post as it is now.
    pub fn snapshot(&self) -> VersionSnapshot {
        VersionSnapshot {
            title: self.title.clone(),
            slug: self.slug.clone(),
            content: self.content.clone(),
            excerpt: self.excerpt.clone(),
            custom_fields: self.custom_fields.clone(),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published.as_str()
    }
}

/// DTO for creating a post.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePost {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 500))]
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[validate(length(max = 1000))]
    pub excerpt: Option<String>,
    pub status: Option<PostStatus>,
    pub custom_fields: Option<serde_json::Value>,
}

/// DTO for updating a post. Only non-`None` fields are applied.
///
/// `auto_save` marks a background save from the editor: no version is
/// recorded and `status` is ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePost {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub slug: Option<String>,
    pub content: Option<String>,
    #[validate(length(max = 1000))]
    pub excerpt: Option<String>,
    pub status: Option<PostStatus>,
    pub custom_fields: Option<serde_json::Value>,
    #[serde(default)]
    pub auto_save: bool,
}
