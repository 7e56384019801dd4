//! # Cache Module
//!
//! Process-local result cache for generated roasts.
//!
//! Entries expire after a fixed time-to-live. There is no background
//! sweeper: an expired entry is removed the next time its key is read.
//! The cache is constructed once at startup and shared by reference
//! (`Arc<RoastCache>`) with the request handlers.
//!
//! ## Configuration
//!
//! ```env
//! CACHE_DURATION=300000       # Time-to-live in milliseconds (5 minutes)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use crate::cache::{RoastCache, roast_key};
//! use std::time::Duration;
//!
//! # fn example() {
//! let cache = RoastCache::new(Duration::from_secs(300));
//! cache.set(roast_key("alice", "english"), "You listen to ...".to_string());
//!
//! if let Some(roast) = cache.get(&roast_key("alice", "english")) {
//!     println!("Cached roast: {}", roast);
//! }
//! # }
//! ```

pub mod ttl_cache;

pub use ttl_cache::{TtlCache, DEFAULT_TTL};

/// Cache of generated roasts keyed by [`roast_key`].
pub type RoastCache = TtlCache<String, String>;

/// Builds the cache key for a roast.
///
/// Always scoped by `(username, language)` so a roast generated in one
/// language is never served for another. Both parts are lowercased since
/// Last.fm usernames are case-insensitive.
pub fn roast_key(username: &str, language: &str) -> String {
    format!(
        "{}:{}",
        username.trim().to_lowercase(),
        language.trim().to_lowercase()
    )
}
