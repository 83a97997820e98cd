//! Audio cache store with pluggable backends.
//!
//! Synthesized audio is stored under its [`CacheKey`](crate::core::synthesis::CacheKey)
//! together with the metadata needed to answer a request without touching the
//! provider again. Backends only deal in opaque bytes; the store wraps every
//! entry in a small envelope (length-prefixed JSON metadata followed by the raw
//! audio) so that the memory and filesystem backends share one format.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use moka::future::{Cache as MokaCache, CacheBuilder as MokaCacheBuilder};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_128;

use crate::core::synthesis::AudioFormat;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O error occurred during filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored bytes do not form a valid entry envelope.
    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Expiry tier of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlClass {
    /// Pregenerated or frequently used phrases.
    Common,
    /// Ad hoc text.
    Dynamic,
}

impl TtlClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtlClass::Common => "common",
            TtlClass::Dynamic => "dynamic",
        }
    }
}

/// TTL durations for each [`TtlClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub common: Duration,
    pub dynamic: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            common: Duration::from_secs(7 * 24 * 60 * 60),
            dynamic: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl CacheTtls {
    pub fn for_class(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Common => self.common,
            TtlClass::Dynamic => self.dynamic,
        }
    }
}

/// A cached synthesis result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub audio: Bytes,
    pub format: AudioFormat,
    pub quality_score: f32,
    pub duration_ms: Option<u32>,
    /// Unix timestamp (milliseconds) of the synthesis that produced this entry.
    pub created_at_ms: u64,
    pub ttl_class: TtlClass,
}

impl CacheEntry {
    pub fn new(
        audio: Bytes,
        format: AudioFormat,
        quality_score: f32,
        duration_ms: Option<u32>,
        ttl_class: TtlClass,
    ) -> Self {
        Self {
            audio,
            format,
            quality_score,
            duration_ms,
            created_at_ms: unix_millis(),
            ttl_class,
        }
    }

    pub fn content_length(&self) -> usize {
        self.audio.len()
    }

    fn encode(&self) -> Result<Bytes> {
        let meta = EntryEnvelopeMeta {
            format: self.format,
            quality_score: self.quality_score,
            duration_ms: self.duration_ms,
            created_at_ms: self.created_at_ms,
            ttl_class: self.ttl_class,
            content_length: self.audio.len(),
        };
        let meta_json = serde_json::to_vec(&meta)?;

        let mut buf = BytesMut::with_capacity(4 + meta_json.len() + self.audio.len());
        buf.put_u32(meta_json.len() as u32);
        buf.put_slice(&meta_json);
        buf.put_slice(&self.audio);
        Ok(buf.freeze())
    }

    fn decode(raw: Bytes) -> Result<Self> {
        if raw.len() < 4 {
            return Err(CacheError::Corrupt("envelope shorter than header".into()));
        }
        let meta_len = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        let audio_start = 4 + meta_len;
        if raw.len() < audio_start {
            return Err(CacheError::Corrupt("metadata exceeds envelope".into()));
        }

        let meta: EntryEnvelopeMeta = serde_json::from_slice(&raw[4..audio_start])?;
        let audio = raw.slice(audio_start..);
        if audio.len() != meta.content_length {
            return Err(CacheError::Corrupt(format!(
                "expected {} audio bytes, found {}",
                meta.content_length,
                audio.len()
            )));
        }

        Ok(Self {
            audio,
            format: meta.format,
            quality_score: meta.quality_score,
            duration_ms: meta.duration_ms,
            created_at_ms: meta.created_at_ms,
            ttl_class: meta.ttl_class,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct EntryEnvelopeMeta {
    format: AudioFormat,
    quality_score: f32,
    duration_ms: Option<u32>,
    created_at_ms: u64,
    ttl_class: TtlClass,
    content_length: usize,
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Trait defining the interface for cache backends.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Stores a value with a TTL.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Retrieves a value by key. Expired values are never returned.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Checks if a live key exists in the cache.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Deletes a value by key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Clears all entries from the cache.
    async fn clear(&self) -> Result<()>;

    /// Approximate number of stored entries, when the backend can tell cheaply.
    fn entry_count(&self) -> Option<u64> {
        None
    }

    /// Returns the backend type as a string identifier.
    fn backend_type(&self) -> &str;
}

/// Metrics tracking for cache operations.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    hits: Arc<RwLock<u64>>,
    misses: Arc<RwLock<u64>>,
    sets: Arc<RwLock<u64>>,
    deletes: Arc<RwLock<u64>>,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
            sets: Arc::new(RwLock::new(0)),
            deletes: Arc::new(RwLock::new(0)),
        }
    }

    pub fn record_hit(&self) {
        *self.hits.write() += 1;
    }

    pub fn record_miss(&self) {
        *self.misses.write() += 1;
    }

    pub fn record_set(&self) {
        *self.sets.write() += 1;
    }

    pub fn record_delete(&self) {
        *self.deletes.write() += 1;
    }

    /// Returns current statistics as a tuple (hits, misses, sets, deletes).
    pub fn get_stats(&self) -> (u64, u64, u64, u64) {
        (
            *self.hits.read(),
            *self.misses.read(),
            *self.sets.read(),
            *self.deletes.read(),
        )
    }
}

struct MemoryEntry {
    data: Bytes,
    expires_at: Instant,
}

/// Memory-based cache backend using Moka.
pub struct MemoryCacheBackend {
    cache: MokaCache<String, Arc<MemoryEntry>>,
}

impl MemoryCacheBackend {
    /// Creates a new memory cache backend.
    ///
    /// # Arguments
    ///
    /// * `max_entries` - Maximum number of entries to store
    /// * `max_size_bytes` - Optional maximum total size in bytes
    pub fn new(max_entries: u64, max_size_bytes: Option<u64>) -> Self {
        let mut builder = MokaCacheBuilder::new(max_entries);

        if let Some(max_size) = max_size_bytes {
            builder = builder
                .weigher(|_key, value: &Arc<MemoryEntry>| {
                    value.data.len().try_into().unwrap_or(u32::MAX)
                })
                .max_capacity(max_size);
        }

        Self {
            cache: builder.build(),
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let entry = Arc::new(MemoryEntry {
            data: value,
            expires_at: Instant::now() + ttl,
        });

        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        match self.cache.get(key).await {
            Some(entry) if Instant::now() >= entry.expires_at => {
                self.cache.invalidate(key).await;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.data.clone())),
            None => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    fn entry_count(&self) -> Option<u64> {
        Some(self.cache.entry_count())
    }

    fn backend_type(&self) -> &str {
        "memory"
    }
}

/// Filesystem-based cache backend.
pub struct FilesystemCacheBackend {
    base_path: PathBuf,
}

impl FilesystemCacheBackend {
    /// Creates a new filesystem cache backend rooted at `base_path`.
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn get_file_path(&self, key: &str) -> PathBuf {
        let hash = format!("{:032x}", xxh3_128(key.as_bytes()));
        let dir = &hash[0..2];
        self.base_path.join(dir).join(hash)
    }

    fn get_meta_path(&self, key: &str) -> PathBuf {
        let mut path = self.get_file_path(key);
        path.set_extension("meta");
        path
    }

    /// Writes through a temp file unique to this call, so concurrent writers
    /// of one key never share a temp file.
    async fn write_atomic(path: &PathBuf, data: &[u8]) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!("{}.{}.tmp", file_name, Uuid::new_v4()));

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_meta(&self, key: &str) -> Result<Option<FileEntryMeta>> {
        match fs::read(self.get_meta_path(key)).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Metadata for filesystem cache entries.
#[derive(Serialize, Deserialize)]
struct FileEntryMeta {
    expires_at: u64,
    created_at: u64,
    size: usize,
}

#[async_trait]
impl CacheBackend for FilesystemCacheBackend {
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let file_path = self.get_file_path(key);
        let meta_path = self.get_meta_path(key);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Data first, metadata last: a reader never sees metadata without data.
        Self::write_atomic(&file_path, &value).await?;

        let now = unix_secs();
        let meta = FileEntryMeta {
            expires_at: now + ttl.as_secs(),
            created_at: now,
            size: value.len(),
        };
        Self::write_atomic(&meta_path, &serde_json::to_vec(&meta)?).await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let file_path = self.get_file_path(key);
        let meta_path = self.get_meta_path(key);

        let Some(meta) = self.read_meta(key).await? else {
            return Ok(None);
        };

        if unix_secs() >= meta.expires_at {
            let _ = fs::remove_file(&file_path).await;
            let _ = fs::remove_file(&meta_path).await;
            return Ok(None);
        }

        match fs::read(&file_path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let _ = fs::remove_file(&meta_path).await;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.read_meta(key).await? {
            Some(meta) if unix_secs() < meta.expires_at => Ok(self.get_file_path(key).exists()),
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _ = fs::remove_file(self.get_file_path(key)).await;
        let _ = fs::remove_file(self.get_meta_path(key)).await;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        warn!("Clearing filesystem cache at {:?}", self.base_path);
        let _ = fs::remove_dir_all(&self.base_path).await;
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "filesystem"
    }
}

/// Cache configuration options.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheConfig {
    /// Memory-based cache configuration.
    Memory {
        /// Maximum number of entries.
        max_entries: u64,
        /// Optional maximum total size in bytes.
        #[serde(default)]
        max_size_bytes: Option<u64>,
    },
    /// Filesystem-based cache configuration.
    Filesystem {
        /// Base path for cache storage.
        path: PathBuf,
    },
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Memory {
            max_entries: 100_000,
            max_size_bytes: Some(500 * 1024 * 1024), // 500MB
        }
    }
}

/// Audio cache store shared by every in-flight synthesis.
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    ttls: CacheTtls,
    metrics: Arc<CacheMetrics>,
}

impl CacheStore {
    /// Creates a new cache store from configuration.
    pub async fn from_config(config: CacheConfig, ttls: CacheTtls) -> Result<Self> {
        if ttls.common.is_zero() || ttls.dynamic.is_zero() {
            return Err(CacheError::InvalidConfig("TTLs must be non-zero".into()));
        }

        let backend: Arc<dyn CacheBackend> = match config {
            CacheConfig::Memory {
                max_entries,
                max_size_bytes,
            } => Arc::new(MemoryCacheBackend::new(max_entries, max_size_bytes)),
            CacheConfig::Filesystem { path } => Arc::new(FilesystemCacheBackend::new(path).await?),
        };

        Ok(Self::with_backend(backend, ttls))
    }

    /// Creates a cache store over an existing backend.
    pub fn with_backend(backend: Arc<dyn CacheBackend>, ttls: CacheTtls) -> Self {
        Self {
            backend,
            ttls,
            metrics: Arc::new(CacheMetrics::new()),
        }
    }

    /// Stores an entry using the TTL of its class.
    pub async fn put(&self, key: impl AsRef<str>, entry: &CacheEntry) -> Result<()> {
        let ttl = self.ttls.for_class(entry.ttl_class);
        let envelope = entry.encode()?;

        debug!(
            "Storing cache entry: {} ({} bytes, ttl class: {})",
            key.as_ref(),
            entry.content_length(),
            entry.ttl_class.as_str()
        );

        self.backend.set(key.as_ref(), envelope, ttl).await?;
        self.metrics.record_set();
        Ok(())
    }

    /// Retrieves a live entry.
    pub async fn get(&self, key: impl AsRef<str>) -> Result<Option<CacheEntry>> {
        let key = key.as_ref();

        let entry = match self.backend.get(key).await? {
            Some(raw) => match CacheEntry::decode(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Dropping unreadable cache entry {}: {}", key, e);
                    self.backend.delete(key).await?;
                    None
                }
            },
            None => None,
        };

        if entry.is_some() {
            debug!("Cache hit: {}", key);
            self.metrics.record_hit();
        } else {
            debug!("Cache miss: {}", key);
            self.metrics.record_miss();
        }

        Ok(entry)
    }

    /// Checks if a live entry exists.
    pub async fn exists(&self, key: impl AsRef<str>) -> Result<bool> {
        self.backend.exists(key.as_ref()).await
    }

    /// Removes an entry.
    pub async fn invalidate(&self, key: impl AsRef<str>) -> Result<()> {
        debug!("Invalidating cache entry: {}", key.as_ref());

        self.backend.delete(key.as_ref()).await?;
        self.metrics.record_delete();
        Ok(())
    }

    /// Clears all entries from the cache.
    pub async fn clear(&self) -> Result<()> {
        warn!("Clearing all cache entries");
        self.backend.clear().await
    }

    pub fn ttls(&self) -> CacheTtls {
        self.ttls
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn entry_count(&self) -> Option<u64> {
        self.backend.entry_count()
    }

    pub fn backend_type(&self) -> &str {
        self.backend.backend_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory_config() -> CacheConfig {
        CacheConfig::Memory {
            max_entries: 100,
            max_size_bytes: None,
        }
    }

    fn entry(audio: &'static [u8], ttl_class: TtlClass) -> CacheEntry {
        CacheEntry::new(
            Bytes::from_static(audio),
            AudioFormat::Pcm,
            0.93,
            Some(120),
            ttl_class,
        )
    }

    #[tokio::test]
    async fn test_memory_cache_basic_operations() {
        let cache = CacheStore::from_config(memory_config(), CacheTtls::default())
            .await
            .unwrap();

        let stored = entry(b"value1", TtlClass::Dynamic);
        cache.put("key1", &stored).await.unwrap();

        let result = cache.get("key1").await.unwrap().unwrap();
        assert_eq!(result, stored);
        assert_eq!(result.content_length(), 6);

        assert!(cache.exists("key1").await.unwrap());
        assert!(!cache.exists("key2").await.unwrap());

        cache.invalidate("key1").await.unwrap();
        assert!(!cache.exists("key1").await.unwrap());
        assert!(cache.get("key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filesystem_cache_basic_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig::Filesystem {
            path: temp_dir.path().to_path_buf(),
        };

        let cache = CacheStore::from_config(config, CacheTtls::default())
            .await
            .unwrap();

        let stored = entry(b"value1", TtlClass::Common);
        cache.put("key1", &stored).await.unwrap();

        let result = cache.get("key1").await.unwrap().unwrap();
        assert_eq!(result.audio, Bytes::from_static(b"value1"));
        assert_eq!(result.ttl_class, TtlClass::Common);
        assert_eq!(result.duration_ms, Some(120));

        assert!(cache.exists("key1").await.unwrap());

        cache.invalidate("key1").await.unwrap();
        assert!(!cache.exists("key1").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_filesystem_concurrent_puts_same_key() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig::Filesystem {
            path: temp_dir.path().to_path_buf(),
        };
        let cache = Arc::new(
            CacheStore::from_config(config, CacheTtls::default())
                .await
                .unwrap(),
        );
        let stored = entry(b"stampede audio", TtlClass::Dynamic);

        for _ in 0..10 {
            let writers: Vec<_> = (0..16)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let stored = stored.clone();
                    tokio::spawn(async move { cache.put("hot", &stored).await })
                })
                .collect();

            for writer in writers {
                writer.await.unwrap().unwrap();
            }

            let result = cache.get("hot").await.unwrap().unwrap();
            assert_eq!(result.audio, stored.audio);
        }

        // no temp files left behind
        let mut leftovers = Vec::new();
        let mut dirs = vec![temp_dir.path().to_path_buf()];
        while let Some(dir) = dirs.pop() {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    dirs.push(path);
                } else if path.extension().is_some_and(|ext| ext == "tmp") {
                    leftovers.push(path);
                }
            }
        }
        assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let ttls = CacheTtls {
            common: Duration::from_secs(60),
            dynamic: Duration::from_millis(100),
        };
        let cache = CacheStore::from_config(memory_config(), ttls).await.unwrap();

        cache
            .put("short", &entry(b"dynamic", TtlClass::Dynamic))
            .await
            .unwrap();
        cache
            .put("long", &entry(b"common", TtlClass::Common))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get("short").await.unwrap().is_none());
        assert!(cache.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_metrics() {
        let cache = CacheStore::from_config(memory_config(), CacheTtls::default())
            .await
            .unwrap();

        cache
            .put("key1", &entry(b"value1", TtlClass::Dynamic))
            .await
            .unwrap();
        let _ = cache.get("key1").await; // Hit
        let _ = cache.get("key2").await; // Miss
        cache.invalidate("key1").await.unwrap();

        let (hits, misses, sets, deletes) = cache.metrics().get_stats();
        assert_eq!(hits, 1);
        assert_eq!(misses, 1);
        assert_eq!(sets, 1);
        assert_eq!(deletes, 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_dropped() {
        let backend = Arc::new(MemoryCacheBackend::new(10, None));
        backend
            .set("bad", Bytes::from_static(b"\x00\x00\x00\xffxx"), Duration::from_secs(60))
            .await
            .unwrap();

        let cache = CacheStore::with_backend(backend.clone(), CacheTtls::default());
        assert!(cache.get("bad").await.unwrap().is_none());
        assert!(backend.get("bad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_copy_audio_slice() {
        let cache = CacheStore::from_config(memory_config(), CacheTtls::default())
            .await
            .unwrap();

        let audio = Bytes::from(vec![7u8; 1024]);
        let stored = CacheEntry::new(audio.clone(), AudioFormat::Mp3, 1.0, None, TtlClass::Common);
        cache.put("key1", &stored).await.unwrap();

        let result = cache.get("key1").await.unwrap().unwrap();
        assert_eq!(result.audio, audio);
        assert_eq!(result.format, AudioFormat::Mp3);
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let cache = CacheStore::from_config(memory_config(), CacheTtls::default())
            .await
            .unwrap();

        cache.put("key1", &entry(b"v1", TtlClass::Dynamic)).await.unwrap();
        cache.put("key2", &entry(b"v2", TtlClass::Common)).await.unwrap();

        cache.clear().await.unwrap();

        assert!(!cache.exists("key1").await.unwrap());
        assert!(!cache.exists("key2").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let ttls = CacheTtls {
            common: Duration::ZERO,
            dynamic: Duration::from_secs(1),
        };
        let result = CacheStore::from_config(memory_config(), ttls).await;
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }
}
