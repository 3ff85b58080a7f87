//! Presence model.

use folio_core::types::{DbId, EpochSecs};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `post_presence` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct PresenceEntry {
    pub post_id: DbId,
    pub user_id: DbId,
    pub last_seen_at: EpochSecs,
}
