//! Post write orchestration.
//!
//! Every mutating post write follows the same shape:
//!
//! 1. refuse the write if another user holds a live edit lock;
//! 2. in one transaction, lock the post row, snapshot the pre-write state as
//!    a version (unless it is an autosave), and apply the write;
//! 3. after commit, trim old versions, invalidate the read cache, and fan
//!    out webhooks. Step 3 never fails the write.

pub mod effects;
pub mod guard;
pub mod writes;

pub use effects::{lifecycle_events, AfterCommit};
pub use guard::{ensure_editable, load_organization, load_post};
pub use writes::{create_post, delete_post, restore_version, update_post};
