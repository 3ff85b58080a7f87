//! Edit lock model.

use folio_core::collaboration::LockState;
use folio_core::types::{DbId, EpochSecs};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `post_edit_locks` table. The row may be expired; use
/// [`EditLock::state`] before trusting it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct EditLock {
    pub post_id: DbId,
    pub holder_user_id: DbId,
    pub acquired_at: EpochSecs,
    pub expires_at: EpochSecs,
}

impl EditLock {
    pub fn state(&self, now: EpochSecs) -> LockState {
        LockState::evaluate(self.holder_user_id, self.acquired_at, self.expires_at, now)
    }
}

/// Result of a takeover: the new lock and the live lock it replaced, if any.
#[derive(Debug, Clone, Serialize)]
pub struct LockTakeover {
    pub lock: EditLock,
    pub evicted: Option<EditLock>,
}
