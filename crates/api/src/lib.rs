//! Folio collaborative editing API server library.
//!
//! Exposes config, state, error handling, the router builder, and the
//! background jobs so integration tests and the binary entrypoint share
//! them.

pub mod auth;
pub mod background;
pub mod config;
pub mod editing;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
