//! Process-wide response cache for the global feed.
//!
//! Entries are keyed by request path plus query hash and expire on a fixed
//! TTL. There is no write-through invalidation: creating or editing a post
//! leaves cached pages untouched until they expire or an operator clears
//! the store.

pub mod config;
pub mod keys;
mod lock;
pub mod middleware;
pub mod store;

pub use config::CacheConfig;
pub use keys::ResponseKey;
pub use middleware::{CacheState, response_cache_layer};
pub use store::{CachedResponse, ResponseStore};
