//! Edit-lock and presence rules.
//!
//! Expiry is lazy: a lock row stays in storage after its `expires_at` but is
//! treated as absent by every read and every contended write. The same goes
//! for presence rows, which are filtered by age at read time and never
//! deleted on the heartbeat path.

use serde::Serialize;

use crate::types::{DbId, EpochSecs};

// ---------------------------------------------------------------------------
// Lock duration constants
// ---------------------------------------------------------------------------

/// Default lock lifetime in seconds (30 minutes).
pub const DEFAULT_LOCK_TTL_SECS: i64 = 30 * 60;

/// Shortest configurable lock lifetime (1 minute).
pub const MIN_LOCK_TTL_SECS: i64 = 60;

/// Longest configurable lock lifetime (4 hours).
pub const MAX_LOCK_TTL_SECS: i64 = 4 * 60 * 60;

/// How often the expired-lock sweeper runs (in seconds).
pub const LOCK_GC_INTERVAL_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Presence constants
// ---------------------------------------------------------------------------

/// Presence entries older than this many seconds are not reported.
pub const DEFAULT_PRESENCE_TTL_SECS: i64 = 120;

/// Presence rows older than this are purged by the sweeper.
pub const PRESENCE_RETENTION_SECS: i64 = 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Lock state
// ---------------------------------------------------------------------------

/// Returns `true` while a lock expiring at `expires_at` is still held.
///
/// A lock is absent once `now > expires_at`; at `now == expires_at` it is
/// still live.
pub fn lock_is_live(expires_at: EpochSecs, now: EpochSecs) -> bool {
    now <= expires_at
}

/// Expiry for a lock granted or refreshed at `now`.
pub fn lock_expiry(now: EpochSecs, ttl_secs: i64) -> EpochSecs {
    now.saturating_add(ttl_secs)
}

/// The observable state of a post's edit lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockState {
    Unlocked,
    Locked {
        holder_user_id: DbId,
        acquired_at: EpochSecs,
        expires_at: EpochSecs,
    },
}

impl LockState {
    /// Evaluate a stored lock row at `now`, folding expired rows to
    /// [`LockState::Unlocked`].
    pub fn evaluate(
        holder_user_id: DbId,
        acquired_at: EpochSecs,
        expires_at: EpochSecs,
        now: EpochSecs,
    ) -> Self {
        if lock_is_live(expires_at, now) {
            LockState::Locked {
                holder_user_id,
                acquired_at,
                expires_at,
            }
        } else {
            LockState::Unlocked
        }
    }

    pub fn holder(&self) -> Option<DbId> {
        match self {
            LockState::Unlocked => None,
            LockState::Locked { holder_user_id, .. } => Some(*holder_user_id),
        }
    }

    /// Whether `user_id` may write to the post: nobody holds it, or they do.
    pub fn permits_write_by(&self, user_id: DbId) -> bool {
        self.holder().map_or(true, |holder| holder == user_id)
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Oldest `last_seen_at` that is *not* reported. Entries must be strictly
/// newer than this, so an entry exactly `ttl_secs` old counts as gone.
pub fn presence_cutoff(now: EpochSecs, ttl_secs: i64) -> EpochSecs {
    now.saturating_sub(ttl_secs)
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a lock lifetime in seconds. Returns `Ok(())` or an error message.
pub fn validate_lock_ttl(secs: i64) -> Result<(), String> {
    if secs < MIN_LOCK_TTL_SECS {
        return Err(format!(
            "Lock TTL must be at least {MIN_LOCK_TTL_SECS} seconds, got {secs}"
        ));
    }
    if secs > MAX_LOCK_TTL_SECS {
        return Err(format!(
            "Lock TTL must be at most {MAX_LOCK_TTL_SECS} seconds, got {secs}"
        ));
    }
    Ok(())
}

pub fn validate_presence_ttl(secs: i64) -> Result<(), String> {
    if secs <= 0 {
        return Err(format!("Presence TTL must be positive, got {secs}"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
