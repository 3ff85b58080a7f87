//! Jobs spawned by `main` next to the HTTP server.
//!
//! - [`lock_gc`] deletes expired edit locks and long-stale presence rows.
//! - [`webhook_worker`] retries webhook deliveries whose backoff has elapsed.
//!
//! Both loop until the shared shutdown token is cancelled.

pub mod lock_gc;
pub mod webhook_worker;
