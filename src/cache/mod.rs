//! Page cache for the post index.
//!
//! Rendered `GET /` responses are kept in an in-process LRU for a fixed
//! lifetime. Entries are keyed by path, query string and the viewer's session
//! cookie, so a cached page is only ever replayed to the same viewer. New or
//! deleted posts become visible once the entry expires or the cache is cleared.
//!
//! ```toml
//! [cache]
//! enabled = true
//! index_ttl_seconds = 20
//! capacity = 64
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::PageCacheConfig;
pub use keys::PageKey;
pub use middleware::{PageCacheState, page_cache_layer};
pub use store::{CachedResponse, PageStore};
