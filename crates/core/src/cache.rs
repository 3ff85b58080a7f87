//! Cache invalidation signals for the public read path.
//!
//! Signals are transient. They are handed to a backend after a write commits
//! and are never stored.

use std::fmt;

use serde::Serialize;

use crate::types::EpochSecs;

/// Which cached view a signal targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// A single post rendered by slug.
    Post,
    /// An organization's post listing.
    PostList,
    /// An organization's taxonomy views.
    Taxonomy,
}

impl CacheScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheScope::Post => "post",
            CacheScope::PostList => "post_list",
            CacheScope::Taxonomy => "taxonomy",
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInvalidationSignal {
    pub organization_slug: String,
    /// Post slug for [`CacheScope::Post`]; `None` for org-wide scopes.
    pub resource_slug: Option<String>,
    pub scope: CacheScope,
    pub key: String,
    pub timestamp: EpochSecs,
}

/// `{org_slug}:{scope}:{slug}`, with `*` standing in for org-wide scopes.
pub fn cache_key(org_slug: &str, scope: CacheScope, slug: Option<&str>) -> String {
    format!("{org_slug}:{}:{}", scope.as_str(), slug.unwrap_or("*"))
}

fn signal(
    org_slug: &str,
    scope: CacheScope,
    slug: Option<&str>,
    now: EpochSecs,
) -> CacheInvalidationSignal {
    CacheInvalidationSignal {
        organization_slug: org_slug.to_string(),
        resource_slug: slug.map(str::to_string),
        scope,
        key: cache_key(org_slug, scope, slug),
        timestamp: now,
    }
}

/// Signals emitted when a post changes: the post itself and its listing.
pub fn post_signals(
    org_slug: &str,
    post_slug: &str,
    now: EpochSecs,
) -> Vec<CacheInvalidationSignal> {
    vec![
        signal(org_slug, CacheScope::Post, Some(post_slug), now),
        signal(org_slug, CacheScope::PostList, None, now),
    ]
}

/// Signals emitted when an organization's taxonomy changes.
pub fn taxonomy_signals(org_slug: &str, now: EpochSecs) -> Vec<CacheInvalidationSignal> {
    vec![
        signal(org_slug, CacheScope::Taxonomy, None, now),
        signal(org_slug, CacheScope::PostList, None, now),
    ]
}
