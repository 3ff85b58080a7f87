//! Outbound webhook delivery.
//!
//! [`transport`] performs a single signed HTTP POST; [`webhook`] owns the
//! persisted delivery lifecycle around it.

pub mod transport;
pub mod webhook;
