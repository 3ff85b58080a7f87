pub mod locks;
pub mod posts;
pub mod presence;
pub mod versions;
pub mod webhooks;
