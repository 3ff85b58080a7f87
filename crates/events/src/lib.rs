//! Side effects that follow a committed post write.
//!
//! - [`CacheCoordinator`] turns a post or taxonomy change into
//!   invalidation signals and hands them to a pluggable
//!   [`CacheInvalidator`] backend.
//! - [`WebhookDispatcher`] fans an event out to subscribed endpoints as
//!   persisted deliveries, signs and sends them, and drives retries.
//!
//! Both are best-effort from the writer's point of view: failures are logged
//! and never undo the write.

pub mod cache;
pub mod delivery;

pub use cache::{
    CacheCoordinator, CacheError, CacheInvalidator, HttpPurgeInvalidator, LogInvalidator,
};
pub use delivery::transport::{
    OutboundRequest, ReqwestTransport, TransportResponse, WebhookTransport,
};
pub use delivery::webhook::{DispatcherConfig, WebhookDispatcher, WebhookError, WebhookEvent};
