//! Per-user persistent state: pending queues and the song cache

pub mod cache;
pub mod queue;

pub use cache::{CacheStore, JsonCacheStore, SongCache, SongRecord};
pub use queue::{JsonQueueStore, QueueStore};
