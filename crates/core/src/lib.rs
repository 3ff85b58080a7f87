//! Domain rules for the collaborative editing subsystem.
//!
//! This crate has zero internal dependencies so the repository layer, the
//! delivery workers, and the HTTP handlers all share the same lock
//! durations, presence windows, retention limits, and webhook rules.

pub mod cache;
pub mod clock;
pub mod collaboration;
pub mod error;
pub mod pagination;
pub mod post;
pub mod types;
pub mod versioning;
pub mod webhooks;
