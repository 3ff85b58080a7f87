//! Post status and field validation.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum length of a post title.
pub const MAX_TITLE_LEN: usize = 500;

/// Maximum length of a post slug.
pub const MAX_SLUG_LEN: usize = 500;

/// Maximum length of a post excerpt.
pub const MAX_EXCERPT_LEN: usize = 1000;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// Publication state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            other => Err(format!(
                "Invalid post status '{other}'. Must be one of: draft, published, archived"
            )),
        }
    }
}

/// Status to persist for an update. Autosaves never change publication state.
pub fn effective_status(requested: Option<PostStatus>, auto_save: bool) -> Option<PostStatus> {
    if auto_save {
        None
    } else {
        requested
    }
}

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title must not be empty".to_string());
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(format!("Title must be at most {MAX_TITLE_LEN} characters"));
    }
    Ok(())
}

/// Slugs are lowercase alphanumeric words separated by single hyphens.
pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err(format!("Slug must be 1-{MAX_SLUG_LEN} characters"));
    }
    if !SLUG_RE.is_match(slug) {
        return Err(format!(
            "Invalid slug '{slug}': use lowercase letters, digits and single hyphens"
        ));
    }
    Ok(())
}

pub fn validate_excerpt(excerpt: &str) -> Result<(), String> {
    if excerpt.chars().count() > MAX_EXCERPT_LEN {
        return Err(format!(
            "Excerpt must be at most {MAX_EXCERPT_LEN} characters"
        ));
    }
    Ok(())
}

/// Custom fields are stored as a JSON object keyed by field name.
pub fn validate_custom_fields(value: &serde_json::Value) -> Result<(), String> {
    if value.is_object() {
        Ok(())
    } else {
        Err("custom_fields must be a JSON object".to_string())
    }
}
