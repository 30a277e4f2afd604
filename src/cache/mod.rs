//! Local story cache for offline and instant display.
//!
//! The cache mirrors the last successful story fetch. It has no write path of
//! its own: the repository clears it and reinserts the fetched set.

mod storage;
mod traits;

pub use storage::SqliteCacheStore;
pub use traits::{CacheStore, StoryRecord};
