//! Audio cache.
//!
//! Content-addressed storage of synthesized audio with TTL classes, backed by
//! either an in-memory moka cache or the filesystem.

pub mod store;

pub use store::{
    CacheBackend, CacheConfig, CacheEntry, CacheError, CacheMetrics, CacheStore, CacheTtls,
    FilesystemCacheBackend, MemoryCacheBackend, Result, TtlClass,
};
