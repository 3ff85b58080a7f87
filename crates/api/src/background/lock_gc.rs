//! Periodic cleanup of expired edit locks and long-stale presence rows.
//!
//! Purely storage hygiene: expired locks and old presence rows are already
//! ignored by every read, so a missed sweep changes nothing observable.

use std::sync::Arc;
use std::time::Duration;

use folio_core::clock::Clock;
use folio_core::collaboration::{LOCK_GC_INTERVAL_SECS, PRESENCE_RETENTION_SECS};
use folio_db::repositories::{EditLockRepo, PresenceRepo};
use folio_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(LOCK_GC_INTERVAL_SECS);

/// Run one sweep. Returns `(locks_deleted, presence_deleted)`.
pub async fn sweep(pool: &DbPool, clock: &dyn Clock) -> Result<(u64, u64), sqlx::Error> {
    let now = clock.now();
    let locks = EditLockRepo::cleanup_expired(pool, now).await?;
    let presence = PresenceRepo::purge_older_than(pool, now - PRESENCE_RETENTION_SECS).await?;
    Ok((locks, presence))
}

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(pool: DbPool, clock: Arc<dyn Clock>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        presence_retention_secs = PRESENCE_RETENTION_SECS,
        "Lock GC job started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Lock GC job stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep(&pool, clock.as_ref()).await {
                    Ok((0, 0)) => tracing::debug!("Lock GC: nothing to purge"),
                    Ok((locks, presence)) => {
                        tracing::info!(locks, presence, "Lock GC: purged stale rows");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Lock GC: sweep failed");
                    }
                }
            }
        }
    }
}
