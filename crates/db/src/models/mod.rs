//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` request DTOs where the entity is written through the API

pub mod edit_lock;
pub mod organization;
pub mod post;
pub mod post_version;
pub mod presence;
pub mod webhook;
