//! Version history rules.
//!
//! A version captures the editable content of a post as it was *before* a
//! write. Sequences are per post, start at 1 and only grow; retention keeps
//! the newest `max_keep` versions by sequence.

use serde::{Deserialize, Serialize};

/// Versions kept per post unless configured otherwise.
pub const DEFAULT_MAX_VERSIONS: i64 = 50;

/// Upper bound for the configurable retention.
pub const MAX_VERSIONS_LIMIT: i64 = 1000;

/// The post content captured by a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub custom_fields: serde_json::Value,
}

/// Whether a write should produce a version. Autosaves do not.
pub fn should_snapshot(auto_save: bool) -> bool {
    !auto_save
}

pub fn validate_max_keep(max_keep: i64) -> Result<(), String> {
    if !(1..=MAX_VERSIONS_LIMIT).contains(&max_keep) {
        return Err(format!(
            "Version retention must be between 1 and {MAX_VERSIONS_LIMIT}, got {max_keep}"
        ));
    }
    Ok(())
}
