//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! `&PgPool` as the first argument. Methods that must join the caller's unit
//! of work take `&mut PgConnection` instead, so a transaction can be passed
//! as `&mut *tx`.

pub mod edit_lock_repo;
pub mod organization_repo;
pub mod post_repo;
pub mod post_version_repo;
pub mod presence_repo;
pub mod webhook_delivery_repo;
pub mod webhook_repo;

pub use edit_lock_repo::{EditLockRepo, LockAttempt};
pub use organization_repo::OrganizationRepo;
pub use post_repo::PostRepo;
pub use post_version_repo::PostVersionRepo;
pub use presence_repo::PresenceRepo;
pub use webhook_delivery_repo::WebhookDeliveryRepo;
pub use webhook_repo::WebhookRepo;
